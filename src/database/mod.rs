//! Content store access
//!
//! The exporter only ever reads from the store. Every backend implements
//! [`StoreClient`], a blocking, parameterized query interface that hands rows
//! back as column → value maps:
//! - MySQL / MariaDB: the live WordPress database (`mysql-backend`)
//! - DuckDB: a local snapshot of the WordPress tables (`duckdb-backend`)
//!
//! One connection is opened per run and reused for every sub-query, so the
//! trait takes `&mut self` and no locking is involved.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;

#[cfg(feature = "duckdb-backend")]
pub mod duckdb;

#[cfg(feature = "mysql-backend")]
pub mod mysql;

pub mod config;
pub mod schema;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDbStore;

#[cfg(feature = "mysql-backend")]
pub use self::mysql::MySqlStore;

pub use config::{ConfigError, DbHost, WpConfig};
pub use schema::Queries;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store is unreachable or rejected the credentials
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query preparation or execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A single column value as returned by a backend
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// A structured date/time value (`DATETIME`, `TIMESTAMP`)
    DateTime(NaiveDateTime),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Integer view of the value; numeric text is accepted since WordPress
    /// stores ids in `meta_value` as strings.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            SqlValue::UInt(u) => i64::try_from(*u).ok(),
            SqlValue::Text(s) => s.trim().parse().ok(),
            SqlValue::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text view of the value. `Null` has none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Int(i) => Some(i.to_string()),
            SqlValue::UInt(u) => Some(u.to_string()),
            SqlValue::Float(f) => Some(f.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            SqlValue::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("NULL"),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::DateTime(value)
    }
}

/// One result row, keyed by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<String, SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values.get(column)
    }

    /// Text value of a column; missing columns and NULLs are `None`
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(SqlValue::as_text)
    }

    pub fn int(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(SqlValue::as_i64)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Read-only query interface implemented by every store backend
pub trait StoreClient {
    /// Execute a parameterized query (`?` placeholders) and return all rows
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> StoreResult<Vec<Row>>;

    /// Execute a query and keep only the first row
    fn query_first(&mut self, sql: &str, params: &[SqlValue]) -> StoreResult<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Backend type name ("mysql", "duckdb", ...)
    fn backend_type(&self) -> &'static str;
}

impl<S: StoreClient + ?Sized> StoreClient for Box<S> {
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> StoreResult<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_sql_value_as_i64() {
        assert_eq!(SqlValue::Int(7).as_i64(), Some(7));
        assert_eq!(SqlValue::UInt(7).as_i64(), Some(7));
        assert_eq!(SqlValue::Text(" 42 ".to_string()).as_i64(), Some(42));
        assert_eq!(SqlValue::Bytes(b"13".to_vec()).as_i64(), Some(13));
        assert_eq!(SqlValue::Text("abc".to_string()).as_i64(), None);
        assert_eq!(SqlValue::UInt(u64::MAX).as_i64(), None);
        assert_eq!(SqlValue::Null.as_i64(), None);
    }

    #[test]
    fn test_sql_value_as_text() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(
            SqlValue::DateTime(dt).as_text().as_deref(),
            Some("2024-01-02 10:00:00")
        );
        assert_eq!(SqlValue::Null.as_text(), None);
        assert_eq!(SqlValue::Int(5).to_string(), "5");
        assert_eq!(SqlValue::Null.to_string(), "NULL");
    }

    #[test]
    fn test_row_accessors() {
        let row = Row::new()
            .with("ID", 12)
            .with("post_title", "Hello")
            .with("post_excerpt", SqlValue::Null);

        assert_eq!(row.int("ID"), Some(12));
        assert_eq!(row.text("post_title").as_deref(), Some("Hello"));
        assert_eq!(row.text("post_excerpt"), None);
        assert_eq!(row.text("missing"), None);
        assert_eq!(row.len(), 3);
        assert_eq!(
            row.columns().collect::<Vec<_>>(),
            vec!["ID", "post_excerpt", "post_title"]
        );
    }

    #[test]
    fn test_scripted_store_matches_params() {
        let mut store = fake::ScriptedStore::new();
        store.on(
            "SELECT 1",
            vec![SqlValue::Int(1)],
            vec![Row::new().with("x", 1)],
        );
        store.fail_on("SELECT 2", vec![]);

        assert_eq!(store.query("SELECT 1", &[SqlValue::Int(1)]).unwrap().len(), 1);
        assert!(store.query("SELECT 1", &[SqlValue::Int(2)]).unwrap().is_empty());
        assert!(matches!(
            store.query("SELECT 2", &[]),
            Err(StoreError::QueryFailed(_))
        ));
        assert_eq!(store.calls.len(), 3);
    }

    #[test]
    fn test_query_first() {
        let mut store = fake::ScriptedStore::new();
        store.on(
            "SELECT guid",
            vec![],
            vec![Row::new().with("guid", "a"), Row::new().with("guid", "b")],
        );
        let first = store.query_first("SELECT guid", &[]).unwrap().unwrap();
        assert_eq!(first.text("guid").as_deref(), Some("a"));
        assert!(store.query_first("SELECT nothing", &[]).unwrap().is_none());
    }
}
