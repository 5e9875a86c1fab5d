use anyhow::Context;
use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde_json::{json, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::extractor::coerce_i64;
use super::market_data::PriceHistorySource;
use crate::error::EngineError;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Offline price history read from a `timestamp_ms,price` CSV file.
///
/// The file holds a single asset, so the requested asset id and quote currency
/// are only logged. Cells that are not numbers are passed through as strings
/// and left for the extractor to drop.
pub struct CsvPriceSource {
    path: PathBuf,
}

impl CsvPriceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvPriceSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Header: timestamp,price (optional)
    // Example Row: 1704067200000,42283.58
    pub fn load_rows(file_path: &Path) -> Result<Vec<Vec<String>>, EngineError> {
        let file = File::open(file_path)
            .with_context(|| format!("Failed to open CSV file '{}'", file_path.display()))?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(BufReader::new(file));

        let mut rows = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let record = result?;
            if idx == 0 && Self::is_header(&record) {
                continue;
            }
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.is_empty() {
            return Err(EngineError::CsvDataFormatError(format!(
                "no price rows in '{}'",
                file_path.display()
            )));
        }
        Ok(rows)
    }

    fn is_header(record: &StringRecord) -> bool {
        record
            .get(0)
            .map(|first| first.eq_ignore_ascii_case("timestamp") || first.eq_ignore_ascii_case("timestamp_ms"))
            .unwrap_or(false)
    }

    /// Builds a provider-shaped payload from CSV rows, keeping the rows that
    /// fall within `lookback_days` of the newest parseable timestamp.
    pub fn rows_to_payload(rows: &[Vec<String>], lookback_days: u32) -> Value {
        // Timestamps follow the extractor's rule, so "1700000000000.0" counts too.
        let rows: Vec<Vec<Value>> = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell_to_value(cell)).collect())
            .collect();
        let timestamp = |row: &[Value]| row.first().and_then(coerce_i64);

        let newest = rows.iter().filter_map(|row| timestamp(row.as_slice())).max();
        let cutoff = newest.map(|n| n.saturating_sub(i64::from(lookback_days) * MILLIS_PER_DAY));

        let prices: Vec<Value> = rows
            .into_iter()
            .filter(|row| match (cutoff, timestamp(row.as_slice())) {
                (Some(cutoff), Some(ts)) => ts >= cutoff,
                _ => true,
            })
            .map(Value::Array)
            .collect();
        json!({ "prices": prices })
    }
}

fn cell_to_value(cell: &str) -> Value {
    if let Ok(i) = cell.parse::<i64>() {
        return json!(i);
    }
    match cell.parse::<f64>() {
        Ok(f) if f.is_finite() => json!(f),
        _ => Value::String(cell.to_string()),
    }
}

#[async_trait]
impl PriceHistorySource for CsvPriceSource {
    async fn fetch(
        &self,
        asset_id: &str,
        quote_currency: &str,
        lookback_days: u32,
    ) -> Result<Value, EngineError> {
        tracing::debug!(
            asset = %asset_id,
            quote = %quote_currency,
            path = %self.path.display(),
            lookback_days,
            "Loading price history from CSV"
        );
        let rows = Self::load_rows(&self.path)?;
        Ok(Self::rows_to_payload(&rows, lookback_days))
    }
}
