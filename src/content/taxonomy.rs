//! Taxonomy term lookup

use std::fmt;

use tracing::warn;

use crate::database::{Queries, SqlValue, StoreClient};
use crate::models::RecordId;

/// The taxonomies the exporter reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Taxonomy {
    Category,
    Tag,
    ProductCategory,
    ProductTag,
}

impl Taxonomy {
    /// Name stored in `term_taxonomy.taxonomy`
    pub fn as_str(&self) -> &'static str {
        match self {
            Taxonomy::Category => "category",
            Taxonomy::Tag => "post_tag",
            Taxonomy::ProductCategory => "product_cat",
            Taxonomy::ProductTag => "product_tag",
        }
    }
}

impl fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the term names assigned to a record
pub struct TaxonomyResolver<'q> {
    queries: &'q Queries,
}

impl<'q> TaxonomyResolver<'q> {
    pub fn new(queries: &'q Queries) -> Self {
        Self { queries }
    }

    /// Term names of `taxonomy` assigned to the record, in store order
    ///
    /// Empty when nothing is assigned or the query fails.
    pub fn terms_for(
        &self,
        store: &mut dyn StoreClient,
        record_id: RecordId,
        taxonomy: Taxonomy,
    ) -> Vec<String> {
        let params = [SqlValue::from(record_id), SqlValue::from(taxonomy.as_str())];
        match store.query(self.queries.term_names(), &params) {
            Ok(rows) => rows.iter().filter_map(|row| row.text("name")).collect(),
            Err(e) => {
                warn!(
                    "Failed to read {} terms for record {}: {}",
                    taxonomy, record_id, e
                );
                Vec::new()
            }
        }
    }
}
