//! snapsim-core: Core library for snapsim
//!
//! This crate provides the retention logic behind `snapsim`, a simulator
//! that replays a bucketed snapshot retention policy over a synthetic
//! timeline so a policy can be checked before it touches a real store.
//!
//! # Architecture
//!
//! ```text
//! snapshot names ──► snapshot_dates ──┐
//! "hour:24,day:7" ──► retention_spec ─┼──► retention_filter ◄── simulation (clock loop)
//!                         interval ───┘
//! ```
//!
//! # Modules
//!
//! - `interval`: Fixed table of valid bucket granularities
//! - `retention_spec`: `interval:count` specification parser
//! - `snapshot_dates`: Snapshot name parsing and formatting
//! - `retention_filter`: Bucket classification, selection and overrides
//! - `simulation`: Time-stepping driver around the filter
//! - `config`: Configuration management
//! - `logging`: Structured logging setup
//! - `error`: Error taxonomy with remediation hints
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod interval;
pub mod logging;
pub mod retention_filter;
pub mod retention_spec;
pub mod simulation;
pub mod snapshot_dates;

pub use error::{Error, Result};
pub use interval::Interval;
pub use retention_filter::{FilterMode, FilterOptions, filter};
pub use retention_spec::{RetentionRule, RetentionSpec};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
