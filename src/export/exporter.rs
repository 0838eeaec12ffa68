//! Content export loop
//!
//! Queries the published records once, then walks them in query order:
//! type check, date normalization, path assignment, metadata gathering,
//! image localization (bundle layout), rendering and writing. A failing
//! record is logged and recorded in the [`ExportSummary`]; only a failure of
//! the record query itself aborts the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::body::{compose_artifact, process_body};
use super::front_matter::PageHeader;
use super::images::{ImageFetcher, ImageLocalizer, LocalImages, image_sources, rewrite_img_tags};
use super::settings::{ExportSettings, OutputLayout};
use super::{ExportError, RecordError};
use crate::content::{MediaResolver, ProductResolver, Taxonomy, TaxonomyResolver};
use crate::database::schema::PUBLISHED_STATUS;
use crate::database::{Queries, Row, SqlValue, StoreClient};
use crate::models::{ContentType, Record, RecordId};

/// Per-run export options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Directory the content tree is written under
    pub output_root: PathBuf,
    /// Restrict the run to one type; `None` exports every recognized type
    pub type_filter: Option<ContentType>,
    /// Render everything, write nothing
    pub dry_run: bool,
}

impl ExportOptions {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            type_filter: None,
            dry_run: false,
        }
    }

    pub fn with_type(mut self, content_type: ContentType) -> Self {
        self.type_filter = Some(content_type);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// A record that could not be exported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    /// `None` when the row did not even carry an id
    pub record_id: Option<RecordId>,
    pub message: String,
}

/// Result of an export run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Rows returned by the record query
    pub candidates: usize,
    /// Records written (or rendered, in a dry run)
    pub exported: usize,
    /// Records of an unrecognized type
    pub skipped: usize,
    pub failures: Vec<RecordFailure>,
    /// Paths written, in export order
    pub written: Vec<PathBuf>,
    /// Images saved into page bundles
    pub images: usize,
    pub dry_run: bool,
    /// Duration of the run in milliseconds
    pub duration_ms: u64,
}

impl ExportSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// The record query matched nothing
    pub fn found_nothing(&self) -> bool {
        self.candidates == 0
    }

    /// Check if every candidate was exported or skipped
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "Export complete{}: {} found, {} exported, {} skipped, {} failed",
            if self.dry_run { " (dry run)" } else { "" },
            self.candidates,
            self.exported,
            self.skipped,
            self.failed()
        );
        if self.images > 0 {
            line.push_str(&format!(", {} image(s) saved", self.images));
        }
        line
    }
}

/// Exports published records from a store into a Hugo content tree
pub struct ContentExporter<'s> {
    store: &'s mut dyn StoreClient,
    queries: Queries,
    settings: ExportSettings,
    options: ExportOptions,
    fetcher: Option<&'s dyn ImageFetcher>,
    /// Base URL for site-relative images, resolved once per run
    site_url: Option<String>,
}

impl<'s> ContentExporter<'s> {
    pub fn new(
        store: &'s mut dyn StoreClient,
        queries: Queries,
        settings: ExportSettings,
        options: ExportOptions,
    ) -> Self {
        Self {
            store,
            queries,
            settings,
            options,
            fetcher: None,
            site_url: None,
        }
    }

    /// Fetcher for page bundle images. Without one, bundles reference
    /// images by their remote URL.
    pub fn with_image_fetcher(mut self, fetcher: &'s dyn ImageFetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    fn localizes_images(&self) -> bool {
        self.settings.localizes_images() && self.fetcher.is_some() && !self.options.dry_run
    }

    /// Content types the record query selects
    pub fn selected_types(&self) -> Vec<ContentType> {
        match &self.options.type_filter {
            Some(content_type) => vec![content_type.clone()],
            None => ContentType::RECOGNIZED.to_vec(),
        }
    }

    /// Run the export
    pub fn export(&mut self) -> Result<ExportSummary, ExportError> {
        let start = Instant::now();

        let types = self.selected_types();
        let sql = self.queries.published_records(types.len());
        let mut params = vec![SqlValue::from(PUBLISHED_STATUS)];
        params.extend(types.iter().map(|t| SqlValue::from(t.as_str())));

        debug!(
            "Querying published records of type(s) {} from {}",
            types
                .iter()
                .map(ContentType::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            self.store.backend_type()
        );
        let rows = self
            .store
            .query(&sql, &params)
            .map_err(ExportError::RecordQuery)?;
        info!("Found {} published record(s)", rows.len());

        let mut summary = self.export_rows(&rows);
        summary.duration_ms = start.elapsed().as_millis() as u64;
        Ok(summary)
    }

    /// Export already-fetched record rows, in order
    pub fn export_rows(&mut self, rows: &[Row]) -> ExportSummary {
        let mut summary = ExportSummary::new(self.options.dry_run);
        summary.candidates = rows.len();
        let mut claimed: HashMap<PathBuf, RecordId> = HashMap::new();

        if self.localizes_images() && !rows.is_empty() {
            self.site_url = match &self.settings.site_url {
                Some(url) => Some(url.clone()),
                None => MediaResolver::new(&self.queries).site_url(&mut *self.store),
            };
            match &self.site_url {
                Some(url) => debug!("Resolving site-relative images against {}", url),
                None => warn!("Site URL unknown; site-relative images keep their remote URL"),
            }
        }

        for row in rows {
            let record = match Record::from_row(row) {
                Ok(record) => record,
                Err(e) => {
                    error!("Skipping undecodable row: {}", e);
                    summary.failures.push(RecordFailure {
                        record_id: row.int("ID").map(RecordId),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match self.export_record(&record, &mut claimed) {
                Ok(Some((path, images))) => {
                    summary.exported += 1;
                    summary.images += images;
                    summary.written.push(path);
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    error!("Failed to export record {} ({}): {}", record.id, record.slug, e);
                    summary.failures.push(RecordFailure {
                        record_id: Some(record.id),
                        message: e.to_string(),
                    });
                }
            }
        }

        summary
    }

    /// Export one record, returning its path and the number of images saved
    /// into its bundle. `Ok(None)` means skipped.
    fn export_record(
        &mut self,
        record: &Record,
        claimed: &mut HashMap<PathBuf, RecordId>,
    ) -> Result<Option<(PathBuf, usize)>, RecordError> {
        let Some(target) = self.settings.target(&record.content_type) else {
            warn!(
                "Unknown content type '{}' for record {}, skipped",
                record.content_type, record.id
            );
            return Ok(None);
        };
        let layout = target.layout.to_string();
        let type_dir = self
            .options
            .output_root
            .join(&self.settings.content_dir)
            .join(target.dir);

        validate_slug(&record.slug)?;
        let date = record.publish_date.normalize()?;
        let path = claim_path(
            &type_dir,
            self.settings.output_layout,
            record,
            &date,
            claimed,
        )?;

        let mut header = self.gather_header(record, layout, date);
        let mut body = process_body(&record.raw_body);
        let mut images = 0;
        if let (true, Some(fetcher), Some(bundle_dir)) =
            (self.localizes_images(), self.fetcher, path.parent())
        {
            let local = self.localize_images(fetcher, &header, &body, bundle_dir);
            header.use_local_images(&local);
            body = rewrite_img_tags(&body, &local, &record.title);
            images = local.len();
        }

        let artifact = compose_artifact(&header.to_front_matter().render(), &body);

        if self.options.dry_run {
            info!("Would export {} ({}) to {}", record.slug, record.content_type, path.display());
        } else {
            write_artifact(&path, &artifact)?;
            info!("Exported {} ({}) to {}", record.slug, record.content_type, path.display());
        }

        Ok(Some((path, images)))
    }

    /// Download the header's and the body's images into the bundle directory
    fn localize_images(
        &self,
        fetcher: &dyn ImageFetcher,
        header: &PageHeader,
        body: &str,
        bundle_dir: &Path,
    ) -> LocalImages {
        let mut sources = header.image_sources();
        for source in image_sources(body) {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        ImageLocalizer::new(fetcher, self.site_url.as_deref()).localize(&sources, bundle_dir)
    }

    fn gather_header(&mut self, record: &Record, layout: String, date: NaiveDateTime) -> PageHeader {
        let store = &mut *self.store;
        let taxonomy = TaxonomyResolver::new(&self.queries);
        let media = MediaResolver::new(&self.queries);

        let categories = taxonomy.terms_for(store, record.id, Taxonomy::Category);
        let tags = taxonomy.terms_for(store, record.id, Taxonomy::Tag);
        let featured_image = media.featured_image_url(store, record.id);

        let product = record.content_type.is_product().then(|| {
            ProductResolver::new(&self.queries).gather(store, record.id, &featured_image)
        });

        PageHeader {
            layout,
            title: record.title.clone(),
            slug: record.slug.clone(),
            permalink: record.permalink(),
            date,
            categories,
            featured_image,
            tags,
            product,
            resources: Vec::new(),
        }
    }
}

/// Slugs become a path component as-is
fn validate_slug(slug: &str) -> Result<(), RecordError> {
    if slug.is_empty() || slug == "." || slug == ".." || slug.contains(['/', '\\']) {
        return Err(RecordError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// Assign the record its output path. A path already taken in this run gets
/// the record id appended.
fn claim_path(
    type_dir: &Path,
    layout: OutputLayout,
    record: &Record,
    date: &NaiveDateTime,
    claimed: &mut HashMap<PathBuf, RecordId>,
) -> Result<PathBuf, RecordError> {
    let day = date.format("%Y-%m-%d");
    let candidates = match layout {
        OutputLayout::Flat => [
            type_dir.join(format!("{}-{}.md", day, record.slug)),
            type_dir.join(format!("{}-{}-{}.md", day, record.slug, record.id)),
        ],
        OutputLayout::Bundle => [
            type_dir.join(&record.slug).join("index.md"),
            type_dir
                .join(format!("{}-{}", record.slug, record.id))
                .join("index.md"),
        ],
    };
    let [primary, fallback] = candidates;

    if let Some(owner) = claimed.get(&primary) {
        warn!(
            "Record {} would overwrite {} written for record {}, using {}",
            record.id,
            primary.display(),
            owner,
            fallback.display()
        );
        if claimed.contains_key(&fallback) {
            return Err(RecordError::PathCollision(fallback));
        }
        claimed.insert(fallback.clone(), record.id);
        return Ok(fallback);
    }

    claimed.insert(primary.clone(), record.id);
    Ok(primary)
}

fn write_artifact(path: &Path, artifact: &str) -> Result<(), RecordError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| RecordError::WriteFailed(parent.to_path_buf(), e.to_string()))?;
    }
    std::fs::write(path, artifact)
        .map_err(|e| RecordError::WriteFailed(path.to_path_buf(), e.to_string()))
}
