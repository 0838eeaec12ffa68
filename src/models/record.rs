//! Content record model
//!
//! A [`Record`] is decoded once from a `posts` row at the store boundary, so
//! the rest of the exporter never looks fields up by column name.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::database::{Row, SqlValue};
use crate::export::RecordError;

/// Textual date format WordPress uses for `post_date`
pub const WP_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Primary key of a record in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RecordId> for SqlValue {
    fn from(id: RecordId) -> Self {
        SqlValue::Int(id.0)
    }
}

/// Content type of a record (`post_type`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentType {
    Post,
    Page,
    /// WooCommerce product
    Product,
    /// Any type the exporter does not handle (attachments, events, ...)
    Other(String),
}

impl ContentType {
    /// Every type the exporter can write
    pub const RECOGNIZED: [ContentType; 3] =
        [ContentType::Post, ContentType::Page, ContentType::Product];

    pub fn parse(raw: &str) -> Self {
        match raw {
            "post" => ContentType::Post,
            "page" => ContentType::Page,
            "product" => ContentType::Product,
            other => ContentType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContentType::Post => "post",
            ContentType::Page => "page",
            ContentType::Product => "product",
            ContentType::Other(name) => name,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ContentType::Other(_))
    }

    pub fn is_product(&self) -> bool {
        matches!(self, ContentType::Product)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `post_date` as delivered by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishDate {
    DateTime(NaiveDateTime),
    Text(String),
}

impl PublishDate {
    /// Structured date, or text in exactly `YYYY-MM-DD HH:MM:SS`
    pub fn normalize(&self) -> Result<NaiveDateTime, RecordError> {
        match self {
            PublishDate::DateTime(dt) => Ok(*dt),
            PublishDate::Text(text) => NaiveDateTime::parse_from_str(text, WP_DATE_FORMAT)
                .map_err(|_| RecordError::InvalidDate(text.clone())),
        }
    }
}

/// One exportable content item
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub content_type: ContentType,
    pub title: String,
    /// Used verbatim in the permalink and filename; must already be URL-safe
    pub slug: String,
    pub publish_date: PublishDate,
    pub status: String,
    pub raw_body: String,
}

impl Record {
    /// Decode a row of the published-records query
    pub fn from_row(row: &Row) -> Result<Self, RecordError> {
        let id = row
            .int("ID")
            .map(RecordId)
            .ok_or_else(|| RecordError::Decode("row has no integer ID".to_string()))?;
        let content_type = row
            .text("post_type")
            .map(|t| ContentType::parse(&t))
            .ok_or_else(|| RecordError::Decode(format!("record {} has no post_type", id)))?;

        let publish_date = match row.get("post_date") {
            Some(SqlValue::DateTime(dt)) => PublishDate::DateTime(*dt),
            Some(other) => PublishDate::Text(other.as_text().unwrap_or_default()),
            None => PublishDate::Text(String::new()),
        };

        Ok(Self {
            id,
            content_type,
            title: row.text("post_title").unwrap_or_default(),
            slug: row.text("post_name").unwrap_or_default(),
            publish_date,
            status: row.text("post_status").unwrap_or_default(),
            raw_body: row.text("post_content").unwrap_or_default(),
        })
    }

    /// `/{slug}/`
    pub fn permalink(&self) -> String {
        format!("/{}/", self.slug)
    }
}
