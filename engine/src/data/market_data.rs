// Price history sources and an in-memory store of provider payloads
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::error::EngineError;

/// A provider of raw price history payloads shaped as
/// `{ "prices": [[timestamp_ms, price], ...] }`.
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    async fn fetch(
        &self,
        asset_id: &str,
        quote_currency: &str,
        lookback_days: u32,
    ) -> Result<Value, EngineError>;
}

/// Holds payloads per asset and quote currency and serves them as a source.
/// Payloads are returned as stored; the lookback window is not applied.
pub struct MarketDataStore {
    data: HashMap<String, HashMap<String, Value>>,
}

impl MarketDataStore {
    pub fn new() -> Self {
        MarketDataStore {
            data: HashMap::new(),
        }
    }

    pub fn add_payload(&mut self, asset_id: &str, quote_currency: &str, payload: Value) {
        self.data
            .entry(asset_id.to_string())
            .or_default()
            .insert(quote_currency.to_lowercase(), payload);
    }

    /// Stores `(timestamp_ms, price)` pairs as a provider-shaped payload.
    pub fn add_prices(&mut self, asset_id: &str, quote_currency: &str, prices: &[(i64, f64)]) {
        let rows: Vec<Value> = prices.iter().map(|(ts, p)| json!([ts, p])).collect();
        self.add_payload(asset_id, quote_currency, json!({ "prices": rows }));
    }

    pub fn get_payload(&self, asset_id: &str, quote_currency: &str) -> Option<&Value> {
        self.data
            .get(asset_id)
            .and_then(|by_quote| by_quote.get(&quote_currency.to_lowercase()))
    }
}

impl Default for MarketDataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceHistorySource for MarketDataStore {
    async fn fetch(
        &self,
        asset_id: &str,
        quote_currency: &str,
        lookback_days: u32,
    ) -> Result<Value, EngineError> {
        tracing::debug!(asset = %asset_id, quote = %quote_currency, lookback_days, "Serving payload from memory");
        self.get_payload(asset_id, quote_currency).cloned().ok_or_else(|| {
            EngineError::PayloadError(format!(
                "Price history not found for asset '{}' in '{}'",
                asset_id, quote_currency
            ))
        })
    }
}
