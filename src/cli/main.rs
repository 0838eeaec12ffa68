//! CLI binary entry point for wp-hugo-export

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use tracing::Level;
#[cfg(feature = "cli")]
use wp_hugo_exporter::cli::commands::export::{ExportArgs, handle_export};
#[cfg(feature = "cli")]
use wp_hugo_exporter::export::OutputLayout;
#[cfg(feature = "cli")]
use wp_hugo_exporter::models::ContentType;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "wp-hugo-export")]
#[command(about = "Export published WordPress content into a Hugo content tree")]
#[command(version)]
struct Cli {
    /// WordPress root directory (the one holding wp-config.php)
    #[arg(long)]
    wp_root: PathBuf,
    /// Content type to export
    #[arg(long = "type", value_enum, default_value = "any")]
    content_type: TypeArg,
    /// Export root (default: <wp-root>/wp-content/md)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Output layout, overriding the settings file
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,
    /// Export settings file (default: <wp-root>/wp-hugo-export.toml when present)
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Bundle layout: keep remote image URLs instead of downloading images
    #[arg(long)]
    no_images: bool,
    /// Render everything but write no files
    #[arg(long)]
    dry_run: bool,
    /// Read from a DuckDB snapshot of the WordPress tables instead of MySQL
    #[cfg(feature = "duckdb-backend")]
    #[arg(long)]
    duckdb: Option<PathBuf>,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

#[cfg(feature = "cli")]
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TypeArg {
    Post,
    Page,
    Product,
    Any,
}

#[cfg(feature = "cli")]
impl TypeArg {
    fn content_type(self) -> Option<ContentType> {
        match self {
            TypeArg::Post => Some(ContentType::Post),
            TypeArg::Page => Some(ContentType::Page),
            TypeArg::Product => Some(ContentType::Product),
            TypeArg::Any => None,
        }
    }
}

#[cfg(feature = "cli")]
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LayoutArg {
    Flat,
    Bundle,
}

#[cfg(feature = "cli")]
impl From<LayoutArg> for OutputLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Flat => OutputLayout::Flat,
            LayoutArg::Bundle => OutputLayout::Bundle,
        }
    }
}

/// Initialize logging. `RUST_LOG` applies unless `-v` or `-q` is given.
#[cfg(feature = "cli")]
fn initialize_logging(cli: &Cli) {
    use tracing_subscriber::EnvFilter;

    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.as_str())
    } else if cli.quiet {
        EnvFilter::new(Level::ERROR.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.as_str()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    initialize_logging(&cli);

    let args = ExportArgs {
        wp_root: cli.wp_root,
        content_type: cli.content_type.content_type(),
        output: cli.output,
        layout: cli.layout.map(OutputLayout::from),
        settings: cli.settings,
        no_images: cli.no_images,
        dry_run: cli.dry_run,
        #[cfg(feature = "duckdb-backend")]
        duckdb: cli.duckdb,
        #[cfg(not(feature = "duckdb-backend"))]
        duckdb: None,
        json: cli.json,
    };

    if let Err(e) = handle_export(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
