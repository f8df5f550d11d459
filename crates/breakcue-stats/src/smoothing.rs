//! Moving averages over ordered series.
//!
//! Two smoothers are provided:
//!
//! - [`moving_average`]: trailing simple moving average ("valid" convolution
//!   with a flat kernel), producing `len - window + 1` points
//! - [`ewma`]: exponentially weighted moving average seeded at the first
//!   observation, producing one point per input
//!
//! Series shorter than the requested window are returned unchanged, so
//! smoothing acts as the identity below the window threshold.

/// Default smoothing factor for [`ewma`].
pub const DEFAULT_EWMA_ALPHA: f64 = 0.3;

/// Computes the trailing simple moving average of `series`.
///
/// Each output point is the mean of `window` consecutive inputs. The output
/// has `series.len() - window + 1` points. If the series is shorter than
/// `window` (or `window` is zero) the input is returned unchanged.
///
/// # Examples
///
/// ```
/// use breakcue_stats::smoothing::moving_average;
///
/// assert_eq!(moving_average(&[2.0, 4.0, 6.0, 8.0], 3), vec![4.0, 6.0]);
/// assert_eq!(moving_average(&[1.0, 2.0], 5), vec![1.0, 2.0]);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || series.len() < window {
        return series.to_vec();
    }
    let divisor = window as f64;
    series
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / divisor)
        .collect()
}

/// Computes the exponentially weighted moving average of `series`.
///
/// The running value starts at the first observation and is updated as
/// `prev = alpha * x + (1 - alpha) * prev` for every point (including the
/// first, which therefore reproduces itself).
///
/// # Examples
///
/// ```
/// use breakcue_stats::smoothing::ewma;
///
/// let smoothed = ewma(&[10.0, 0.0], 0.5);
/// assert_eq!(smoothed, vec![10.0, 5.0]);
/// ```
#[must_use]
pub fn ewma(series: &[f64], alpha: f64) -> Vec<f64> {
    let Some(&first) = series.first() else {
        return vec![];
    };
    let mut prev = first;
    series
        .iter()
        .map(|&x| {
            prev = alpha * x + (1.0 - alpha) * prev;
            prev
        })
        .collect()
}
