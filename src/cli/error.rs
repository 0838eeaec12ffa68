//! CLI-specific error types

use std::path::PathBuf;

use thiserror::Error;

use crate::database::{ConfigError, StoreError};
use crate::export::ExportError;

/// CLI-specific error type. Every variant exits with status 1.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("WordPress root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] StoreError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    IoError(String),
}
