//! Ordinary least squares trend fitting.

/// A straight line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Fits `series` against its index `0, 1, 2, ...` by ordinary least squares.
    ///
    /// Returns a zero line for series with fewer than two points.
    ///
    /// # Examples
    ///
    /// ```
    /// use breakcue_stats::regression::LinearFit;
    ///
    /// assert_eq!(LinearFit::least_squares(&[4.0]), LinearFit::default());
    /// let fit = LinearFit::least_squares(&[3.0, 2.0, 1.0]);
    /// assert!((fit.slope + 1.0).abs() < 1e-12);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn least_squares(series: &[f64]) -> Self {
        if series.len() < 2 {
            return Self::default();
        }
        let n = series.len() as f64;
        let x_mean = (n - 1.0) / 2.0;
        let y_mean = series.iter().sum::<f64>() / n;

        let mut covariance = 0.0;
        let mut x_variance = 0.0;
        for (i, y) in series.iter().enumerate() {
            let dx = i as f64 - x_mean;
            covariance += dx * (y - y_mean);
            x_variance += dx * dx;
        }
        let slope = covariance / x_variance;
        Self {
            slope,
            intercept: y_mean - slope * x_mean,
        }
    }
}
