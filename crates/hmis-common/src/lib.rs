//! Shared utilities for the HMIS pipeline crates.
//!
//! This crate provides common helpers used across the workspace: Polars
//! `AnyValue` conversions, join/dedup key derivation and timestamp parsing.

pub mod datetime;
pub mod polars;

// Re-export commonly used functions at crate root for convenience
pub use datetime::{MS_PER_DAY, format_timestamp_ms, parse_timestamp, parse_timestamp_ms};
pub use polars::{
    any_to_f64, any_to_i64, any_to_key, any_to_string, any_to_timestamp_ms, format_numeric,
    parse_f64, parse_i64,
};
