//! Command-line interface for the exporter

pub mod commands;
pub mod error;

pub use error::CliError;
