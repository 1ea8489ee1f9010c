//! Customer accounts: administrative command line.

pub mod app;
pub mod cli;
pub mod error;
pub mod telemetry;
