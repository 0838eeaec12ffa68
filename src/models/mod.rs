//! Typed content records decoded from store rows

pub mod record;

pub use record::{ContentType, PublishDate, Record, RecordId, WP_DATE_FORMAT};
