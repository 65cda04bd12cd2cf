//! Record ingestion and grouping for the econ-normalize system.
//!
//! This crate handles:
//! - Indicator key resolution and normalization
//! - Allow/deny filtering
//! - Grouping records by indicator key
//! - Decoding JSON record batches

pub mod batch;
pub mod grouping;
pub mod key;

pub use batch::{parse_records, parse_records_value};
pub use grouping::{Grouping, GroupingStats, IndicatorGroup, RecordGrouper};
pub use key::{normalize_key, resolve_key, DefaultKeyResolver, KeyResolver};
