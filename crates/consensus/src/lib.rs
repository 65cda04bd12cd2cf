//! Normalization-target consensus for the econ-normalize system.
//!
//! This crate handles:
//! - Per-group currency / magnitude / time-scale tallies
//! - Majority, tie-break and exemption selection
//! - Per-record quality warnings against the selected targets
//! - The batch pipeline tying grouping, selection and validation together

pub mod engine;
pub mod selector;
pub mod tally;
pub mod warnings;

pub use engine::{BatchReport, NormalizationEngine, OutlierReport};
pub use selector::ConsensusSelector;
pub use tally::{extract_tokens, DimensionTally, GroupProfile, GroupTally, RecordTokens};
pub use warnings::quality_warnings;
