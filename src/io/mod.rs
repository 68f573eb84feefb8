//! Output setup for Monte Carlo runs
//!
//! This module configures where the tracing report stream goes.

mod output;

pub use output::setup_output;
