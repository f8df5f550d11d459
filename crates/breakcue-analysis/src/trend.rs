use breakcue_profile::{ProfileDocument, TrendMetric};
use breakcue_stats::{regression::LinearFit, smoothing};
use serde::{Deserialize, Serialize};

/// Default moving-average window.
pub const DEFAULT_WINDOW: usize = 5;

/// Outcome of [`TrendAnalyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub accuracy_moving_average: Vec<f64>,
    pub foul_moving_average: Vec<f64>,
    pub accuracy_slope: f64,
    pub foul_slope: f64,
    /// Accuracy rises and fouls fall at the same time.
    pub improving: bool,
}

/// Fits moving averages and linear slopes to profile trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendAnalyzer {
    window: usize,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl TrendAnalyzer {
    #[must_use]
    pub const fn new(window: usize) -> Self {
        Self { window }
    }

    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Trailing simple moving average; `series` is returned unchanged when
    /// shorter than `window`.
    #[must_use]
    pub fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
        smoothing::moving_average(series, window)
    }

    /// Least squares `(slope, intercept)` of `series` against its index.
    ///
    /// `(0.0, 0.0)` for fewer than two points.
    #[must_use]
    pub fn slope_intercept(series: &[f64]) -> (f64, f64) {
        let fit = LinearFit::least_squares(series);
        (fit.slope, fit.intercept)
    }

    #[must_use]
    pub fn analyze(&self, profile: &ProfileDocument) -> TrendReport {
        let accuracy = profile.series(TrendMetric::Accuracy);
        let fouls = profile.series(TrendMetric::Fouls);

        let (accuracy_slope, _) = Self::slope_intercept(&accuracy);
        let (foul_slope, _) = Self::slope_intercept(&fouls);

        TrendReport {
            accuracy_moving_average: Self::moving_average(&accuracy, self.window),
            foul_moving_average: Self::moving_average(&fouls, self.window),
            accuracy_slope,
            foul_slope,
            improving: accuracy_slope > 0.0 && foul_slope < 0.0,
        }
    }
}
