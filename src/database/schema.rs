//! Query catalogue for the WordPress schema
//!
//! All queries are parameterized with `?` placeholders, which both MySQL and
//! DuckDB accept. The only value spliced into the query text is the table
//! prefix, and it is validated against `^[A-Za-z0-9_]+$` first.

use once_cell::sync::Lazy;
use regex::Regex;

use super::config::ConfigError;

/// Table prefix WordPress uses when `$table_prefix` is not set
pub const DEFAULT_TABLE_PREFIX: &str = "wp_";

/// `post_status` of records eligible for export
pub const PUBLISHED_STATUS: &str = "publish";

static PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("prefix pattern is valid"));

/// Prefixed, parameterized SQL for every query the exporter issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queries {
    prefix: String,
    term_names: String,
    meta_value: String,
    attachment_url: String,
    option_value: String,
}

impl Queries {
    pub fn new(prefix: &str) -> Result<Self, ConfigError> {
        Self::validate_prefix(prefix)?;

        let term_names = format!(
            "SELECT t.name FROM {p}terms t \
             JOIN {p}term_taxonomy tt ON t.term_id = tt.term_id \
             JOIN {p}term_relationships tr ON tt.term_taxonomy_id = tr.term_taxonomy_id \
             WHERE tr.object_id = ? AND tt.taxonomy = ? \
             ORDER BY tr.term_order, t.term_id",
            p = prefix
        );
        let meta_value = format!(
            "SELECT meta_value FROM {p}postmeta WHERE post_id = ? AND meta_key = ? \
             ORDER BY meta_id LIMIT 1",
            p = prefix
        );
        let attachment_url = format!("SELECT guid FROM {p}posts WHERE ID = ?", p = prefix);
        let option_value = format!(
            "SELECT option_value FROM {p}options WHERE option_name = ? LIMIT 1",
            p = prefix
        );

        Ok(Self {
            prefix: prefix.to_string(),
            term_names,
            meta_value,
            attachment_url,
            option_value,
        })
    }

    /// Check a table prefix before it is used in query text
    pub fn validate_prefix(prefix: &str) -> Result<(), ConfigError> {
        if PREFIX_RE.is_match(prefix) {
            Ok(())
        } else {
            Err(ConfigError::InvalidPrefix(prefix.to_string()))
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefixed table name, e.g. `posts` → `wp_posts`
    pub fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Published records of `type_count` content types
    ///
    /// Parameters: the published status, then one `post_type` per type.
    /// Newest first, ties broken by id so repeated runs see the same order.
    pub fn published_records(&self, type_count: usize) -> String {
        let placeholders = vec!["?"; type_count.max(1)].join(", ");
        format!(
            "SELECT ID, post_type, post_title, post_name, post_date, post_status, post_content \
             FROM {p}posts WHERE post_status = ? AND post_type IN ({placeholders}) \
             ORDER BY post_date DESC, ID DESC",
            p = self.prefix
        )
    }

    /// Term names of one taxonomy for one record. Parameters: record id, taxonomy.
    pub fn term_names(&self) -> &str {
        &self.term_names
    }

    /// A single meta value. Parameters: record id, meta key.
    pub fn meta_value(&self) -> &str {
        &self.meta_value
    }

    /// The URL (`guid`) of an attachment record. Parameter: attachment id.
    pub fn attachment_url(&self) -> &str {
        &self.attachment_url
    }

    /// A site option such as `home`. Parameter: option name.
    pub fn option_value(&self) -> &str {
        &self.option_value
    }
}

impl Default for Queries {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_PREFIX).expect("default prefix is valid")
    }
}
