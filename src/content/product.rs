//! WooCommerce product metadata

use tracing::warn;

use super::{
    BUY_LINK_META_KEY, MediaResolver, SHORT_DESCRIPTION_META_KEY, SKU_META_KEY, Taxonomy,
    TaxonomyResolver, read_meta,
};
use crate::database::{Queries, StoreClient};
use crate::models::RecordId;

/// Product-only header fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductMeta {
    pub sku: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub buy_link: Option<String>,
    /// Featured image first, then the gallery in source order
    pub images: Vec<String>,
    pub short_description: Option<String>,
}

/// Gathers [`ProductMeta`] for product records
pub struct ProductResolver<'q> {
    queries: &'q Queries,
    taxonomy: TaxonomyResolver<'q>,
    media: MediaResolver<'q>,
}

impl<'q> ProductResolver<'q> {
    pub fn new(queries: &'q Queries) -> Self {
        Self {
            queries,
            taxonomy: TaxonomyResolver::new(queries),
            media: MediaResolver::new(queries),
        }
    }

    /// Gather product metadata. `featured_image` is the already-resolved
    /// featured image URL (empty if none).
    pub fn gather(
        &self,
        store: &mut dyn StoreClient,
        record_id: RecordId,
        featured_image: &str,
    ) -> ProductMeta {
        let sku = self.meta(store, record_id, SKU_META_KEY).unwrap_or_default();
        let categories = self
            .taxonomy
            .terms_for(store, record_id, Taxonomy::ProductCategory);
        let tags = self
            .taxonomy
            .terms_for(store, record_id, Taxonomy::ProductTag);
        let buy_link = self.meta(store, record_id, BUY_LINK_META_KEY);

        let mut images = Vec::new();
        if !featured_image.is_empty() {
            images.push(featured_image.to_string());
        }
        images.extend(self.media.gallery_urls(store, record_id));

        let short_description = self.meta(store, record_id, SHORT_DESCRIPTION_META_KEY);

        ProductMeta {
            sku,
            categories,
            tags,
            buy_link,
            images,
            short_description,
        }
    }

    /// Non-empty meta value; failures are logged and read as absent
    fn meta(&self, store: &mut dyn StoreClient, record_id: RecordId, key: &str) -> Option<String> {
        match read_meta(store, self.queries, record_id, key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!("Failed to read {} of record {}: {}", key, record_id, e);
                None
            }
        }
    }
}
