//! DuckDB store backend
//!
//! Reads WordPress tables from a local DuckDB database, e.g. a snapshot
//! imported from a MySQL dump. Supports both file-based and in-memory mode.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use duckdb::types::{TimeUnit, Value, ValueRef};
use tracing::debug;

use super::{Row, SqlValue, StoreClient, StoreError, StoreResult};

/// DuckDB store backend
pub struct DuckDbStore {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    connection: duckdb::Connection,
}

impl DuckDbStore {
    /// Open a file-based DuckDB database
    pub fn open(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(StoreError::ConnectionFailed(format!(
                "DuckDB file not found: {}",
                path.display()
            )));
        }

        let connection = duckdb::Connection::open(&path).map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to open DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: Some(path),
            connection,
        })
    }

    /// Create an in-memory DuckDB store
    pub fn in_memory() -> StoreResult<Self> {
        let connection = duckdb::Connection::open_in_memory().map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to create in-memory DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: None,
            connection,
        })
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Execute multiple SQL statements, e.g. to load a schema and fixtures
    pub fn execute_batch(&self, sql: &str) -> StoreResult<()> {
        self.connection
            .execute_batch(sql)
            .map_err(|e| StoreError::QueryFailed(format!("Batch execute failed: {}", e)))
    }

    fn to_duckdb_value(value: &SqlValue) -> Value {
        match value {
            SqlValue::Null => Value::Null,
            SqlValue::Int(i) => Value::BigInt(*i),
            SqlValue::UInt(u) => Value::UBigInt(*u),
            SqlValue::Float(f) => Value::Double(*f),
            SqlValue::Text(s) => Value::Text(s.clone()),
            SqlValue::Bytes(b) => Value::Blob(b.clone()),
            SqlValue::DateTime(dt) => {
                Value::Timestamp(TimeUnit::Microsecond, dt.and_utc().timestamp_micros())
            }
        }
    }

    fn from_value_ref(value: ValueRef<'_>) -> SqlValue {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Boolean(b) => SqlValue::Int(i64::from(b)),
            ValueRef::TinyInt(i) => SqlValue::Int(i64::from(i)),
            ValueRef::SmallInt(i) => SqlValue::Int(i64::from(i)),
            ValueRef::Int(i) => SqlValue::Int(i64::from(i)),
            ValueRef::BigInt(i) => SqlValue::Int(i),
            ValueRef::HugeInt(i) => match i64::try_from(i) {
                Ok(i) => SqlValue::Int(i),
                Err(_) => SqlValue::Text(i.to_string()),
            },
            ValueRef::UTinyInt(i) => SqlValue::UInt(u64::from(i)),
            ValueRef::USmallInt(i) => SqlValue::UInt(u64::from(i)),
            ValueRef::UInt(i) => SqlValue::UInt(u64::from(i)),
            ValueRef::UBigInt(i) => SqlValue::UInt(i),
            ValueRef::Float(f) => SqlValue::Float(f64::from(f)),
            ValueRef::Double(f) => SqlValue::Float(f),
            ValueRef::Decimal(d) => SqlValue::Text(d.to_string()),
            ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => SqlValue::Bytes(bytes.to_vec()),
            ValueRef::Timestamp(unit, raw) => match Self::timestamp_to_datetime(unit, raw) {
                Some(dt) => SqlValue::DateTime(dt),
                None => SqlValue::Null,
            },
            ValueRef::Date32(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(i64::from(days))))
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(SqlValue::DateTime)
                .unwrap_or(SqlValue::Null),
            other => SqlValue::Text(format!("{:?}", other)),
        }
    }

    fn timestamp_to_datetime(unit: TimeUnit, raw: i64) -> Option<NaiveDateTime> {
        let micros = match unit {
            TimeUnit::Second => raw.checked_mul(1_000_000)?,
            TimeUnit::Millisecond => raw.checked_mul(1_000)?,
            TimeUnit::Microsecond => raw,
            TimeUnit::Nanosecond => raw / 1_000,
        };
        DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
    }
}

impl StoreClient for DuckDbStore {
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> StoreResult<Vec<Row>> {
        debug!("duckdb query: {} ({} params)", sql, params.len());

        let mut stmt = self
            .connection
            .prepare(sql)
            .map_err(|e| StoreError::QueryFailed(format!("Prepare failed: {}", e)))?;

        let values: Vec<Value> = params.iter().map(Self::to_duckdb_value).collect();

        // Columns are only known once the statement has been executed
        let mut result_rows = stmt
            .query(duckdb::params_from_iter(values))
            .map_err(|e| StoreError::QueryFailed(format!("Query failed: {}", e)))?;

        let column_count = result_rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                result_rows
                    .as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .collect();

        let mut rows = Vec::new();
        while let Some(row) = result_rows
            .next()
            .map_err(|e| StoreError::QueryFailed(format!("Row fetch error: {}", e)))?
        {
            let converted: Row = columns
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = row
                        .get_ref(i)
                        .map(Self::from_value_ref)
                        .unwrap_or(SqlValue::Null);
                    (name.clone(), value)
                })
                .collect();
            rows.push(converted);
        }

        Ok(rows)
    }

    fn backend_type(&self) -> &'static str {
        "duckdb"
    }
}
