//! Core types and configuration for the econ-normalize system.
//!
//! This crate provides shared types used across all other crates:
//! - Indicator records and unit tokens
//! - Selection, outlier and time-series result types
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
