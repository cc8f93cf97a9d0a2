//! Capburn Common
//!
//! Shared building blocks for the Capburn workspace:
//! - **Errors:** the `CapburnError` taxonomy used across crates
//! - **Timecode:** lenient `MM:SS.mmm` timestamp parsing and formatting
//! - **Clock:** frame pacing utilities for bounded-rate draw loops
//! - **Config:** application configuration with export defaults
//! - **Logging:** tracing subscriber initialization

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod timecode;
