// Time helpers shared by the engine's data sources and chart renderer.
use chrono::{DateTime, Utc};

/// Converts milliseconds since the Unix epoch into a UTC instant.
/// Returns `None` when the value is outside chrono's representable range.
pub fn millis_to_datetime(ts_millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts_millis)
}
