//! Per-record metadata resolvers
//!
//! Each resolver issues sub-queries over the shared store connection. A
//! failed or empty sub-query resolves to an empty default and is logged;
//! it never aborts the export of the record.

pub mod media;
pub mod product;
pub mod taxonomy;

pub use media::MediaResolver;
pub use product::{ProductMeta, ProductResolver};
pub use taxonomy::{Taxonomy, TaxonomyResolver};

use crate::database::{Queries, SqlValue, StoreClient, StoreResult};
use crate::models::RecordId;

/// Meta key pointing at the featured image attachment
pub const THUMBNAIL_META_KEY: &str = "_thumbnail_id";

/// Meta key holding the comma-separated product gallery attachment ids
pub const GALLERY_META_KEY: &str = "_product_image_gallery";

pub const SKU_META_KEY: &str = "_sku";

pub const BUY_LINK_META_KEY: &str = "_buy_link";

pub const SHORT_DESCRIPTION_META_KEY: &str = "_short_description";

/// Site option holding the front-end URL
pub const HOME_OPTION: &str = "home";

/// Read one meta value. NULL and missing rows are both `None`.
pub(crate) fn read_meta(
    store: &mut dyn StoreClient,
    queries: &Queries,
    record_id: RecordId,
    key: &str,
) -> StoreResult<Option<String>> {
    let row = store.query_first(
        queries.meta_value(),
        &[SqlValue::from(record_id), SqlValue::from(key)],
    )?;
    Ok(row.and_then(|r| r.text("meta_value")))
}
