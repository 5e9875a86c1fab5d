// Report orchestration: fetch, extract, analyse, render, assemble.
use serde_json::Value;
use shared::models::{Report, ReportOutcome, ReportSections};
use std::path::Path;

use crate::analysis::{detect_outliers_iqr, summarize_returns, Forecaster, NaiveLastValue};
use crate::chart::ChartRenderer;
use crate::config::ReportSettings;
use crate::data::extractor::{extract_series, unzip_points};
use crate::data::market_data::PriceHistorySource;
use crate::error::EngineError;

/// Reports need at least this many extracted prices before any stage runs.
pub const MIN_PRICES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub coin_id: String,
    pub vs_currency: String,
    pub lookback_days: u32,
    pub horizon: usize,
}

impl ReportRequest {
    pub fn new(coin_id: impl Into<String>, lookback_days: u32, horizon: usize) -> Self {
        Self {
            coin_id: coin_id.into(),
            vs_currency: "usd".to_string(),
            lookback_days,
            horizon,
        }
    }

    pub fn with_vs_currency(mut self, vs_currency: impl Into<String>) -> Self {
        self.vs_currency = vs_currency.into();
        self
    }
}

pub struct ReportBuilder {
    settings: ReportSettings,
    renderer: ChartRenderer,
    forecaster: Box<dyn Forecaster>,
}

impl ReportBuilder {
    pub fn new(settings: ReportSettings) -> Self {
        let renderer = ChartRenderer::new(settings.chart.clone());
        Self {
            settings,
            renderer,
            forecaster: Box::new(NaiveLastValue::new()),
        }
    }

    pub fn with_forecaster(mut self, forecaster: Box<dyn Forecaster>) -> Self {
        self.forecaster = forecaster;
        self
    }

    /// Fetches the payload and runs the analysis. Source failures become an
    /// unavailable report carrying the error text; nothing is propagated.
    pub async fn build_report(&self, request: &ReportRequest, source: &dyn PriceHistorySource) -> Report {
        tracing::info!(
            coin = %request.coin_id,
            vs_currency = %request.vs_currency,
            days = request.lookback_days,
            horizon = request.horizon,
            "Building report"
        );
        match source
            .fetch(&request.coin_id, &request.vs_currency, request.lookback_days)
            .await
        {
            Ok(payload) => self.analyze_payload(request, &payload),
            Err(e) => {
                tracing::error!(
                    coin = %request.coin_id,
                    error = %e,
                    remote = e.is_data_source_failure(),
                    "Price history unavailable"
                );
                unavailable(request, 0, fetch_failure_reason(&e))
            }
        }
    }

    /// The synchronous part of the pipeline, for payloads already in hand.
    pub fn analyze_payload(&self, request: &ReportRequest, payload: &Value) -> Report {
        let points = extract_series(payload);
        let (timestamps, prices) = unzip_points(&points);
        tracing::debug!(coin = %request.coin_id, count = prices.len(), "Extracted prices");

        if prices.len() < MIN_PRICES {
            tracing::warn!(coin = %request.coin_id, count = prices.len(), "Not enough prices for a report");
            return unavailable(
                request,
                prices.len(),
                format!("too few prices to build the report (minimum: {})", MIN_PRICES),
            );
        }

        let stats = summarize_returns(&prices);
        let outliers = detect_outliers_iqr(&prices);
        let forecast = self.forecaster.forecast(&prices, request.horizon);
        let chart = self.renderer.plot_prices_png(
            Some(&timestamps),
            &prices,
            &chart_title(&request.coin_id, request.lookback_days),
            &self.settings.output_dir,
        );

        let chart_url = chart
            .filename()
            .and_then(|name| chart_url(&self.settings.chart_base_url, &self.settings.output_dir, name));
        if chart.filename().is_some() && chart_url.is_none() {
            tracing::warn!(
                dir = %self.settings.output_dir.display(),
                "Chart directory is outside the served root, no chart_url"
            );
        }

        tracing::info!(
            coin = %request.coin_id,
            n_prices = prices.len(),
            returns = stats.count(),
            outliers = outliers.outlier_indices().len(),
            chart = chart.filename().unwrap_or("-"),
            "Report ready"
        );

        Report {
            coin: request.coin_id.clone(),
            vs_currency: request.vs_currency.clone(),
            days: request.lookback_days,
            horizon: request.horizon,
            n_prices: prices.len(),
            outcome: ReportOutcome::Complete(Box::new(ReportSections {
                chart_filename: chart.filename().map(str::to_string),
                chart_path: chart.file_path().cloned(),
                chart_reason: chart.reason().map(str::to_string),
                chart_url,
                stats,
                outliers,
                forecast,
                note: usage_note(&self.settings.chart_base_url),
            })),
        }
    }
}

/// Builds a report with default settings.
pub async fn build_report(
    coin_id: &str,
    lookback_days: u32,
    horizon: usize,
    data_source: &dyn PriceHistorySource,
) -> Report {
    let request = ReportRequest::new(coin_id, lookback_days, horizon);
    ReportBuilder::new(ReportSettings::default())
        .build_report(&request, data_source)
        .await
}

fn unavailable(request: &ReportRequest, n_prices: usize, reason: String) -> Report {
    Report {
        coin: request.coin_id.clone(),
        vs_currency: request.vs_currency.clone(),
        days: request.lookback_days,
        horizon: request.horizon,
        n_prices,
        outcome: ReportOutcome::Unavailable { reason },
    }
}

// Remote failures (timeout, HTTP status, transport) read differently from a
// source that answered with something unusable.
fn fetch_failure_reason(err: &EngineError) -> String {
    if err.is_data_source_failure() {
        format!("price history source unavailable: {}", err)
    } else {
        format!("could not read price history: {}", err)
    }
}

/// "bitcoin", 7 -> "Bitcoin - last 7 days"
pub fn chart_title(coin_id: &str, lookback_days: u32) -> String {
    let mut chars = coin_id.chars();
    let name = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{} - last {} days", name, lookback_days)
}

/// Joins the static server address, the output directory and the file name.
///
/// The server is assumed to serve the current directory, so an absolute
/// `out_dir` is made relative to it. Directories outside it have no URL.
pub fn chart_url(base_url: &str, out_dir: &Path, filename: &str) -> Option<String> {
    let relative = if out_dir.is_absolute() {
        let cwd = std::env::current_dir().ok()?;
        out_dir.strip_prefix(&cwd).ok()?.to_path_buf()
    } else {
        out_dir.to_path_buf()
    };
    Some(join_url(base_url, &relative, filename))
}

fn join_url(base_url: &str, dir: &Path, filename: &str) -> String {
    let dir = dir.to_string_lossy().replace('\\', "/");
    let dir = dir.trim_start_matches("./").trim_matches('/');
    let base = base_url.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        format!("{}/{}", base, filename)
    } else {
        format!("{}/{}/{}", base, dir, filename)
    }
}

fn usage_note(base_url: &str) -> String {
    format!(
        "To view the chart in a browser, serve the project root with a static file server \
         listening on {} and open chart_url.",
        base_url.trim_end_matches('/')
    )
}
