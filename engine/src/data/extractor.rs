// Turns a raw price history payload into numeric series.
//
// Payload shape: { "prices": [[timestamp_ms, price], [timestamp_ms, price], ...] }
// Rows that are not arrays of at least two cells, or whose cells do not coerce,
// are skipped. Nothing here fails on bad input.
use serde_json::Value;
use shared::models::PricePoint;

pub const PRICES_KEY: &str = "prices";

/// Prices in payload order. A row whose price cell does not coerce is dropped,
/// independently of its timestamp cell.
pub fn extract_values(payload: &Value) -> Vec<f64> {
    extract_values_from(payload, PRICES_KEY)
}

/// Timestamps in payload order, with the same per-field skip policy as
/// [`extract_values`]. The two outputs can differ in length.
pub fn extract_timestamps(payload: &Value) -> Vec<i64> {
    extract_timestamps_from(payload, PRICES_KEY)
}

/// Validates each row as a whole: a row is kept only when both its timestamp
/// and its price coerce, so timestamps and prices stay index-aligned.
pub fn extract_series(payload: &Value) -> Vec<PricePoint> {
    extract_series_from(payload, PRICES_KEY)
}

pub fn extract_values_from(payload: &Value, key: &str) -> Vec<f64> {
    rows(payload, key).filter_map(|row| coerce_f64(&row[1])).collect()
}

pub fn extract_timestamps_from(payload: &Value, key: &str) -> Vec<i64> {
    rows(payload, key).filter_map(|row| coerce_i64(&row[0])).collect()
}

pub fn extract_series_from(payload: &Value, key: &str) -> Vec<PricePoint> {
    let mut points = Vec::new();
    let mut dropped = 0usize;
    for row in rows(payload, key) {
        match (coerce_i64(&row[0]), coerce_f64(&row[1])) {
            (Some(timestamp_ms), Some(price)) => points.push(PricePoint { timestamp_ms, price }),
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::warn!(dropped, kept = points.len(), "Dropped malformed price rows");
    }
    points
}

/// Splits aligned points back into separate timestamp and price vectors.
pub fn unzip_points(points: &[PricePoint]) -> (Vec<i64>, Vec<f64>) {
    points.iter().map(|p| (p.timestamp_ms, p.price)).unzip()
}

// Yields every row that is an array with at least two cells.
fn rows<'a>(payload: &'a Value, key: &str) -> impl Iterator<Item = &'a Vec<Value>> + 'a {
    payload
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .filter(|row| row.len() >= 2)
}

/// Numeric coercion of one cell. Strings are trimmed and parsed, so "nan" and
/// "inf" coerce here and are removed later by the finite-value cleaning step.
pub fn coerce_f64(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Integer coercion of one cell. Finite floats truncate toward zero.
pub fn coerce_i64(cell: &Value) -> Option<i64> {
    match cell {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}
