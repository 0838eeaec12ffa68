//! MySQL / MariaDB store backend
//!
//! Connects to the live WordPress database with the credentials from
//! `wp-config.php`. Queries run as prepared statements, so dates come back as
//! structured values rather than text.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, Params, Value};
use tracing::debug;

use super::config::{DbHost, WpConfig};
use super::{Row, SqlValue, StoreClient, StoreError, StoreResult};

/// Single blocking connection to a MySQL-compatible server
pub struct MySqlStore {
    connection: Conn,
    database: String,
}

impl MySqlStore {
    /// Open a connection using the `wp-config.php` credentials
    ///
    /// Fails with [`StoreError::ConnectionFailed`] when the server is
    /// unreachable or rejects the credentials. There is no retry.
    pub fn connect(config: &WpConfig) -> StoreResult<Self> {
        let mut builder = OptsBuilder::new()
            .user(Some(config.db_user.as_str()))
            .pass(Some(config.db_password.as_str()))
            .db_name(Some(config.db_name.as_str()))
            .init(vec!["SET NAMES utf8mb4"]);

        builder = match &config.db_host {
            DbHost::Tcp { host, port } => builder
                .ip_or_hostname(Some(host.as_str()))
                .tcp_port(*port),
            DbHost::Socket(path) => builder.socket(Some(path.to_string_lossy().into_owned())),
        };

        let connection = Conn::new(builder).map_err(|e| {
            StoreError::ConnectionFailed(format!(
                "{}@{}: {}",
                config.db_name, config.db_host, e
            ))
        })?;

        Ok(Self {
            connection,
            database: config.db_name.clone(),
        })
    }

    /// Name of the connected database
    pub fn database(&self) -> &str {
        &self.database
    }

    fn to_mysql_value(value: &SqlValue) -> Value {
        match value {
            SqlValue::Null => Value::NULL,
            SqlValue::Int(i) => Value::Int(*i),
            SqlValue::UInt(u) => Value::UInt(*u),
            SqlValue::Float(f) => Value::Double(*f),
            SqlValue::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
            SqlValue::Bytes(b) => Value::Bytes(b.clone()),
            SqlValue::DateTime(dt) => Value::Date(
                dt.year() as u16,
                dt.month() as u8,
                dt.day() as u8,
                dt.hour() as u8,
                dt.minute() as u8,
                dt.second() as u8,
                dt.nanosecond() / 1_000,
            ),
        }
    }

    fn from_mysql_value(value: Value) -> SqlValue {
        match value {
            Value::NULL => SqlValue::Null,
            Value::Int(i) => SqlValue::Int(i),
            Value::UInt(u) => SqlValue::UInt(u),
            Value::Float(f) => SqlValue::Float(f64::from(f)),
            Value::Double(f) => SqlValue::Float(f),
            Value::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(text) => SqlValue::Text(text),
                Err(e) => SqlValue::Bytes(e.into_bytes()),
            },
            Value::Date(year, month, day, hour, minute, second, micros) => {
                match Self::to_datetime(year, month, day, hour, minute, second, micros) {
                    Some(dt) => SqlValue::DateTime(dt),
                    // Zero dates ("0000-00-00 00:00:00") have no chrono representation
                    None => SqlValue::Text(format!(
                        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                        year, month, day, hour, minute, second
                    )),
                }
            }
            Value::Time(negative, days, hours, minutes, seconds, _) => SqlValue::Text(format!(
                "{}{}:{:02}:{:02}",
                if negative { "-" } else { "" },
                u32::from(hours) + days * 24,
                minutes,
                seconds
            )),
        }
    }

    fn to_datetime(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        micros: u32,
    ) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))?.and_hms_micro_opt(
            u32::from(hour),
            u32::from(minute),
            u32::from(second),
            micros,
        )
    }

    fn convert_row(row: mysql::Row) -> Row {
        let columns = row.columns();
        columns
            .iter()
            .map(|column| column.name_str().into_owned())
            .zip(row.unwrap().into_iter().map(Self::from_mysql_value))
            .collect()
    }
}

impl StoreClient for MySqlStore {
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> StoreResult<Vec<Row>> {
        debug!("mysql query: {} ({} params)", sql, params.len());

        let params = if params.is_empty() {
            Params::Empty
        } else {
            Params::Positional(params.iter().map(Self::to_mysql_value).collect())
        };

        let rows: Vec<mysql::Row> = self
            .connection
            .exec(sql, params)
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(rows.into_iter().map(Self::convert_row).collect())
    }

    fn backend_type(&self) -> &'static str {
        "mysql"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversion_round_trip() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let value = MySqlStore::to_mysql_value(&SqlValue::DateTime(dt));
        assert_eq!(MySqlStore::from_mysql_value(value), SqlValue::DateTime(dt));

        let value = MySqlStore::to_mysql_value(&SqlValue::Text("héllo".to_string()));
        assert_eq!(
            MySqlStore::from_mysql_value(value),
            SqlValue::Text("héllo".to_string())
        );
    }

    #[test]
    fn test_zero_date_becomes_text() {
        let value = Value::Date(0, 0, 0, 0, 0, 0, 0);
        assert_eq!(
            MySqlStore::from_mysql_value(value),
            SqlValue::Text("0000-00-00 00:00:00".to_string())
        );
    }

    #[test]
    fn test_invalid_utf8_kept_as_bytes() {
        let value = Value::Bytes(vec![0xff, 0xfe]);
        assert_eq!(
            MySqlStore::from_mysql_value(value),
            SqlValue::Bytes(vec![0xff, 0xfe])
        );
    }

    #[test]
    fn test_connect_refused() {
        let config = WpConfig::parse(
            "define('DB_NAME', 'wp');\ndefine('DB_USER', 'wp');\ndefine('DB_PASSWORD', 'wp');\ndefine('DB_HOST', '127.0.0.1:1');\n",
        )
        .unwrap();
        assert!(matches!(
            MySqlStore::connect(&config),
            Err(StoreError::ConnectionFailed(_))
        ));
    }
}
