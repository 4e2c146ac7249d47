//! Runtime glue: cancellation signals, configuration, and telemetry.

pub mod cancel;
pub mod config;
pub mod telemetry;
