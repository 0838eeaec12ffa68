//! Featured image and product gallery lookup

use tracing::{debug, warn};

use super::{GALLERY_META_KEY, HOME_OPTION, THUMBNAIL_META_KEY, read_meta};
use crate::database::{Queries, SqlValue, StoreClient, StoreResult};
use crate::models::RecordId;

/// Resolves attachment references to URLs
pub struct MediaResolver<'q> {
    queries: &'q Queries,
}

impl<'q> MediaResolver<'q> {
    pub fn new(queries: &'q Queries) -> Self {
        Self { queries }
    }

    /// URL of the record's featured image, or an empty string
    pub fn featured_image_url(&self, store: &mut dyn StoreClient, record_id: RecordId) -> String {
        let thumbnail = match read_meta(store, self.queries, record_id, THUMBNAIL_META_KEY) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read featured image of record {}: {}", record_id, e);
                return String::new();
            }
        };

        let Some(attachment_id) = thumbnail.as_deref().and_then(parse_id) else {
            return String::new();
        };

        match self.attachment_url(store, attachment_id) {
            Ok(url) => url.unwrap_or_default(),
            Err(e) => {
                warn!(
                    "Failed to resolve featured image {} of record {}: {}",
                    attachment_id, record_id, e
                );
                String::new()
            }
        }
    }

    /// URLs of the product gallery, in gallery order
    ///
    /// Ids that don't resolve are dropped.
    pub fn gallery_urls(&self, store: &mut dyn StoreClient, record_id: RecordId) -> Vec<String> {
        let gallery = match read_meta(store, self.queries, record_id, GALLERY_META_KEY) {
            Ok(Some(value)) => value,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read gallery of record {}: {}", record_id, e);
                return Vec::new();
            }
        };

        parse_id_list(&gallery)
            .into_iter()
            .filter_map(|attachment_id| match self.attachment_url(store, attachment_id) {
                Ok(Some(url)) => Some(url),
                Ok(None) => {
                    debug!(
                        "Gallery image {} of record {} not found",
                        attachment_id, record_id
                    );
                    None
                }
                Err(e) => {
                    warn!(
                        "Failed to resolve gallery image {} of record {}: {}",
                        attachment_id, record_id, e
                    );
                    None
                }
            })
            .collect()
    }

    /// The site's `home` URL, used as the base of site-relative image
    /// sources. `None` when the option is missing or unreadable.
    pub fn site_url(&self, store: &mut dyn StoreClient) -> Option<String> {
        match store.query_first(self.queries.option_value(), &[SqlValue::from(HOME_OPTION)]) {
            Ok(row) => row
                .and_then(|r| r.text("option_value"))
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            Err(e) => {
                warn!("Failed to read the site URL: {}", e);
                None
            }
        }
    }

    fn attachment_url(
        &self,
        store: &mut dyn StoreClient,
        attachment_id: RecordId,
    ) -> StoreResult<Option<String>> {
        let row = store.query_first(
            self.queries.attachment_url(),
            &[SqlValue::from(attachment_id)],
        )?;
        Ok(row
            .and_then(|r| r.text("guid"))
            .filter(|url| !url.is_empty()))
    }
}

fn parse_id(raw: &str) -> Option<RecordId> {
    raw.trim().parse().ok().map(RecordId)
}

/// Parse a comma-separated id list, skipping blank and non-numeric entries
pub fn parse_id_list(raw: &str) -> Vec<RecordId> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let id = parse_id(entry);
            if id.is_none() {
                debug!("Skipping malformed attachment id '{}'", entry);
            }
            id
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::fixtures;
    use crate::database::fake::ScriptedStore;

    #[test]
    fn test_featured_image_resolved() {
        let queries = Queries::default();
        let mut store = ScriptedStore::new();
        fixtures::meta(&mut store, &queries, 1, THUMBNAIL_META_KEY, "40");
        fixtures::attachment(&mut store, &queries, 40, "https://example.com/a.jpg");

        let media = MediaResolver::new(&queries);
        assert_eq!(
            media.featured_image_url(&mut store, RecordId(1)),
            "https://example.com/a.jpg"
        );
    }

    #[test]
    fn test_site_url_from_home_option() {
        let queries = Queries::default();
        let media = MediaResolver::new(&queries);

        let mut store = ScriptedStore::new();
        assert_eq!(media.site_url(&mut store), None);

        fixtures::option(&mut store, &queries, HOME_OPTION, " https://blog.example.com ");
        assert_eq!(
            media.site_url(&mut store).as_deref(),
            Some("https://blog.example.com")
        );

        let mut failing = ScriptedStore::new();
        failing.fail_on(queries.option_value(), vec![SqlValue::from(HOME_OPTION)]);
        assert_eq!(media.site_url(&mut failing), None);
    }

    #[test]
    fn test_featured_image_misses_are_empty() {
        let queries = Queries::default();
        let mut store = ScriptedStore::new();
        // Thumbnail points at a missing attachment
        fixtures::meta(&mut store, &queries, 2, THUMBNAIL_META_KEY, "41");
        // Thumbnail meta is blank
        fixtures::meta(&mut store, &queries, 3, THUMBNAIL_META_KEY, "");
        // Lookup fails
        store.fail_on(
            queries.meta_value(),
            vec![SqlValue::Int(4), SqlValue::from(THUMBNAIL_META_KEY)],
        );

        let media = MediaResolver::new(&queries);
        for id in [1, 2, 3, 4] {
            assert_eq!(media.featured_image_url(&mut store, RecordId(id)), "");
        }
    }

    #[test]
    fn test_gallery_order_and_skips() {
        let queries = Queries::default();
        let mut store = ScriptedStore::new();
        fixtures::meta(&mut store, &queries, 7, GALLERY_META_KEY, "12, ,11,99,x,10");
        fixtures::attachment(&mut store, &queries, 12, "https://example.com/12.jpg");
        fixtures::attachment(&mut store, &queries, 11, "https://example.com/11.jpg");
        fixtures::attachment(&mut store, &queries, 10, "https://example.com/10.jpg");
        store.fail_on(queries.attachment_url(), vec![SqlValue::Int(99)]);

        let media = MediaResolver::new(&queries);
        assert_eq!(
            media.gallery_urls(&mut store, RecordId(7)),
            vec![
                "https://example.com/12.jpg",
                "https://example.com/11.jpg",
                "https://example.com/10.jpg",
            ]
        );
    }

    #[test]
    fn test_gallery_missing_meta() {
        let queries = Queries::default();
        let mut store = ScriptedStore::new();
        let media = MediaResolver::new(&queries);
        assert!(media.gallery_urls(&mut store, RecordId(8)).is_empty());
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(
            parse_id_list("3,4, 5 ,,abc,"),
            vec![RecordId(3), RecordId(4), RecordId(5)]
        );
        assert!(parse_id_list("").is_empty());
    }
}
