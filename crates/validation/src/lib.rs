//! Post-normalization validation for the econ-normalize system.
//!
//! This crate handles:
//! - Scale outlier detection (order-of-magnitude clustering)
//! - Cumulative (year-to-date) pattern analysis of sample series
//! - Narrative rendering of time-series verdicts

pub mod narrative;
pub mod outliers;
pub mod time_series;

pub use narrative::format_time_series_narrative;
pub use outliers::{magnitude_of, OutlierPartition, ScaleOutlierDetector};
pub use time_series::{analyze_time_series_pattern, validate_record, MIN_SERIES_POINTS};
