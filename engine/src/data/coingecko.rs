// CoinGecko `market_chart` client

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::market_data::PriceHistorySource;
use crate::config::ReportSettings;
use crate::error::EngineError;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// HTTP price history source backed by the public CoinGecko API.
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    base_url: String,
    client: reqwest::Client,
}

impl CoinGeckoClient {
    /// Create a client against the public API with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, EngineError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Create a client with a custom base URL
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::ConfigError(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_settings(settings: &ReportSettings) -> Result<Self, EngineError> {
        Self::with_base_url(&settings.api_base_url, settings.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PriceHistorySource for CoinGeckoClient {
    /// Fetch `market_chart` history for `asset_id` quoted in `quote_currency`.
    ///
    /// The body also carries `market_caps` and `total_volumes`; it is returned
    /// untouched.
    async fn fetch(
        &self,
        asset_id: &str,
        quote_currency: &str,
        lookback_days: u32,
    ) -> Result<Value, EngineError> {
        let url = format!("{}/coins/{}/market_chart", self.base_url, asset_id);
        tracing::debug!(%url, quote = %quote_currency, lookback_days, "Requesting price history");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", quote_currency.to_string()),
                ("days", lookback_days.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                let err = EngineError::from(e);
                tracing::error!(asset = %asset_id, error = %err, "Price history request failed");
                err
            })?;

        let response = response.error_for_status().map_err(|e| {
            let err = EngineError::from(e);
            tracing::error!(asset = %asset_id, error = %err, "Price history source rejected the request");
            err
        })?;

        let payload: Value = response.json().await.map_err(EngineError::from)?;
        if !payload.is_object() {
            return Err(EngineError::PayloadError(
                "expected a JSON object with a 'prices' array".to_string(),
            ));
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer, timeout: Duration) -> CoinGeckoClient {
        CoinGeckoClient::with_base_url(&server.base_url(), timeout).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_market_chart() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/coins/bitcoin/market_chart")
                    .query_param("vs_currency", "usd")
                    .query_param("days", "7");
                then.status(200).json_body(json!({
                    "prices": [[1000, 100.0], [2000, 101.5]],
                    "market_caps": [],
                    "total_volumes": []
                }));
            })
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let payload = client.fetch("bitcoin", "usd", 7).await.unwrap();
        mock.assert_async().await;
        assert_eq!(payload["prices"][1][1], 101.5);
    }

    #[tokio::test]
    async fn test_not_found_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/coins/not-a-coin/market_chart");
                then.status(404).json_body(json!({ "error": "coin not found" }));
            })
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.fetch("not-a-coin", "usd", 7).await.unwrap_err();
        assert!(matches!(err, EngineError::DataSourceStatus { status: 404 }));
        assert!(err.is_data_source_failure());
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/coins/bitcoin/market_chart");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!({ "prices": [] }));
            })
            .await;

        let client = client_for(&server, Duration::from_millis(50));
        let err = client.fetch("bitcoin", "usd", 7).await.unwrap_err();
        assert!(matches!(err, EngineError::DataSourceTimeout(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_payload_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/coins/bitcoin/market_chart");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.fetch("bitcoin", "usd", 7).await.unwrap_err();
        assert!(matches!(err, EngineError::PayloadError(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = CoinGeckoClient::with_base_url("http://localhost:1/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:1/api");
    }
}
