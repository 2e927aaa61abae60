/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Display format used by the record listing endpoints.
pub const LISTING_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a timestamp the way listings present it (`YYYY-MM-DD HH:MM:SS`).
pub fn format_listing_timestamp(ts: &Timestamp) -> String {
    ts.format(LISTING_TIMESTAMP_FORMAT).to_string()
}
