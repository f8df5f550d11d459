//! Statistical helpers for the breakcue workspace.
//!
//! This crate collects the small numeric routines used by player profiles
//! and trend analysis:
//!
//! - **Descriptive statistics**: min, max, mean, median, population and sample variance
//! - **Smoothing**: trailing simple moving average and exponentially weighted moving average
//! - **Regression**: ordinary least squares fit of a series against its index
//! - **Anomaly detection**: z-score outliers using the sample standard deviation
//!
//! All routines accept plain `f64` slices and never fail: degenerate inputs
//! (empty, too short, zero variance) yield neutral results.
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`smoothing`]: Moving averages
//! - [`regression`]: Linear trend fitting
//! - [`anomaly`]: Z-score anomaly detection
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use breakcue_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! assert_eq!(stats.sample_variance, 2.5);
//! ```
//!
//! ## Fitting a trend line
//!
//! ```
//! use breakcue_stats::regression::LinearFit;
//!
//! let fit = LinearFit::least_squares(&[1.0, 3.0, 5.0, 7.0]);
//! assert!((fit.slope - 2.0).abs() < 1e-12);
//! assert!((fit.intercept - 1.0).abs() < 1e-12);
//! ```
//!
//! ## Smoothing a series
//!
//! ```
//! use breakcue_stats::smoothing;
//!
//! let sma = smoothing::moving_average(&[1.0, 2.0, 3.0, 4.0], 2);
//! assert_eq!(sma, vec![1.5, 2.5, 3.5]);
//! ```

pub mod anomaly;
pub mod descriptive;
pub mod regression;
pub mod smoothing;
