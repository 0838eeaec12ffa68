//! Export command handler

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cli::error::CliError;
use crate::database::{StoreClient, WpConfig};
use crate::export::{
    ContentExporter, ExportOptions, ExportSettings, ExportSummary, ImageFetcher, OutputLayout,
};
use crate::models::ContentType;

/// Export root under the WordPress root when `--output` is not given
pub const DEFAULT_OUTPUT_SUBDIR: &str = "wp-content/md";

/// Arguments for the export command
#[derive(Debug, Clone, Default)]
pub struct ExportArgs {
    pub wp_root: PathBuf,
    /// `None` exports every recognized type
    pub content_type: Option<ContentType>,
    pub output: Option<PathBuf>,
    /// Overrides the settings file
    pub layout: Option<OutputLayout>,
    pub settings: Option<PathBuf>,
    /// Keep remote image URLs in bundles instead of downloading
    pub no_images: bool,
    pub dry_run: bool,
    /// Read from a DuckDB snapshot instead of the MySQL server
    pub duckdb: Option<PathBuf>,
    /// Print the summary as JSON
    pub json: bool,
}

impl ExportArgs {
    pub fn new(wp_root: impl Into<PathBuf>) -> Self {
        Self {
            wp_root: wp_root.into(),
            ..Default::default()
        }
    }

    /// Export root: `--output`, or `<wp-root>/wp-content/md`
    pub fn output_root(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.wp_root.join(DEFAULT_OUTPUT_SUBDIR))
    }
}

/// Load the export settings, then apply command-line overrides
pub fn resolve_settings(args: &ExportArgs) -> Result<ExportSettings, CliError> {
    let mut settings = match &args.settings {
        Some(path) => ExportSettings::load(path)?,
        None => ExportSettings::load_from_root(&args.wp_root)?,
    };
    if let Some(layout) = args.layout {
        settings.output_layout = layout;
    }
    if args.no_images {
        settings.download_images = false;
    }
    Ok(settings)
}

/// Handle the export command
pub fn handle_export(args: &ExportArgs) -> Result<ExportSummary, CliError> {
    if !args.wp_root.is_dir() {
        return Err(CliError::RootNotFound(args.wp_root.clone()));
    }

    let config = WpConfig::load(&args.wp_root)?;
    let settings = resolve_settings(args)?;
    let queries = config.queries()?;

    let mut options = ExportOptions::new(args.output_root()).dry_run(args.dry_run);
    options.type_filter = args.content_type.clone();

    let mut store = open_store(args, &config)?;
    info!(
        "Exporting from {} ({} backend, prefix '{}') to {}",
        args.wp_root.display(),
        store.backend_type(),
        queries.prefix(),
        options.output_root.display()
    );

    let fetcher = if settings.localizes_images() && !args.dry_run {
        image_fetcher()
    } else {
        None
    };
    let mut exporter = ContentExporter::new(store.as_mut(), queries, settings, options);
    if let Some(fetcher) = fetcher.as_deref() {
        exporter = exporter.with_image_fetcher(fetcher);
    }
    let summary = exporter.export()?;

    if summary.found_nothing() {
        warn!("No published records matched; nothing was exported");
    }
    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::IoError(format!("Failed to serialize summary: {}", e)))?;
        println!("{}", json);
    } else {
        println!("{}", summary.summary_line());
    }

    Ok(summary)
}

fn open_store(args: &ExportArgs, config: &WpConfig) -> Result<Box<dyn StoreClient>, CliError> {
    if let Some(path) = &args.duckdb {
        return open_duckdb(path);
    }
    open_mysql(config)
}

#[cfg(feature = "duckdb-backend")]
fn open_duckdb(path: &Path) -> Result<Box<dyn StoreClient>, CliError> {
    Ok(Box::new(crate::database::DuckDbStore::open(path)?))
}

#[cfg(not(feature = "duckdb-backend"))]
fn open_duckdb(path: &Path) -> Result<Box<dyn StoreClient>, CliError> {
    Err(CliError::InvalidArgument(format!(
        "Cannot read {}: DuckDB support is not enabled. Build with --features duckdb-backend",
        path.display()
    )))
}

#[cfg(feature = "mysql-backend")]
fn open_mysql(config: &WpConfig) -> Result<Box<dyn StoreClient>, CliError> {
    let store = crate::database::MySqlStore::connect(config)?;
    info!("Connected to MySQL database '{}' at {}", store.database(), config.db_host);
    Ok(Box::new(store))
}

#[cfg(not(feature = "mysql-backend"))]
fn open_mysql(_config: &WpConfig) -> Result<Box<dyn StoreClient>, CliError> {
    Err(CliError::InvalidArgument(
        "MySQL support is not enabled. Build with --features mysql-backend".to_string(),
    ))
}

/// HTTP fetcher for bundle images; `None` leaves images remote
#[cfg(feature = "bundle-images")]
fn image_fetcher() -> Option<Box<dyn ImageFetcher>> {
    match crate::export::HttpFetcher::new() {
        Ok(fetcher) => Some(Box::new(fetcher)),
        Err(e) => {
            warn!("Image downloads disabled: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "bundle-images"))]
fn image_fetcher() -> Option<Box<dyn ImageFetcher>> {
    warn!("Image downloads need the bundle-images feature; bundles keep remote image URLs");
    None
}
