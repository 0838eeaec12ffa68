//! WordPress → Hugo exporter
//!
//! Reads published posts, pages and WooCommerce products from a WordPress
//! database and writes one Markdown file per record, made of a YAML front
//! matter header and the entity-decoded body:
//! - `database`: wp-config.php parsing, query catalogue, store backends
//! - `models`: the decoded [`Record`]
//! - `content`: taxonomy, media and product metadata resolvers
//! - `export`: front matter rendering, settings, bundle images and the
//!   export loop

#[cfg(feature = "cli")]
pub mod cli;
pub mod content;
pub mod database;
pub mod export;
pub mod models;

// Re-export commonly used types
pub use content::{MediaResolver, ProductMeta, ProductResolver, Taxonomy, TaxonomyResolver};
#[cfg(feature = "duckdb-backend")]
pub use database::DuckDbStore;
#[cfg(feature = "mysql-backend")]
pub use database::MySqlStore;
pub use database::{
    ConfigError, DbHost, Queries, Row, SqlValue, StoreClient, StoreError, StoreResult, WpConfig,
};
pub use export::{
    ContentExporter, ExportError, ExportOptions, ExportSettings, ExportSummary, FetchError,
    ImageFetcher, LocalImages, OutputLayout, RecordError, RecordFailure,
};
pub use models::{ContentType, PublishDate, Record, RecordId};
