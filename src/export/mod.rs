//! Export functionality
//!
//! Turns published records into Hugo Markdown artifacts:
//! - `body`: entity decoding and artifact assembly
//! - `front_matter`: YAML header rendering and string escaping
//! - `images`: image downloads and `<img>` rewriting for page bundles
//! - `settings`: type → layout/directory mapping and output layout
//! - `exporter`: the per-run export loop and its summary

pub mod body;
pub mod exporter;
pub mod front_matter;
pub mod images;
pub mod settings;

use std::path::PathBuf;

use crate::database::StoreError;

pub use exporter::{ContentExporter, ExportOptions, ExportSummary, RecordFailure};
pub use front_matter::{FieldValue, FrontMatter, PageHeader, escape_yaml_string};
#[cfg(feature = "bundle-images")]
pub use images::HttpFetcher;
pub use images::{FetchError, ImageFetcher, ImageLocalizer, LocalImages};
pub use settings::{ExportSettings, OutputLayout, TypeSettings, TypeTarget, sample_settings};

/// Run-level export error. Aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to query records: {0}")]
    RecordQuery(#[source] StoreError),
}

/// Error while exporting a single record. The run continues with the next record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Malformed record row: {0}")]
    Decode(String),

    #[error("Slug '{0}' cannot be used as a file name")]
    InvalidSlug(String),

    #[error("Invalid publish date '{0}': expected YYYY-MM-DD HH:MM:SS")]
    InvalidDate(String),

    #[error("Output path {0} is already taken by another record")]
    PathCollision(PathBuf),

    #[error("Failed to write {0}: {1}")]
    WriteFailed(PathBuf, String),
}
