// Command-line entry point for the price report pipeline
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use engine::analysis::{detect_outliers_iqr, forecast_naive_last, summarize_returns};
use engine::chart::ChartRenderer;
use engine::config::ReportSettings;
use engine::data::extractor::{extract_series, extract_timestamps, extract_values, unzip_points};
use engine::data::{CoinGeckoClient, CsvPriceSource, PriceHistorySource};
use engine::report::{chart_title, ReportBuilder, ReportRequest, MIN_PRICES};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "price-report",
    version,
    about = "Descriptive report of an asset's price history: returns, outliers, a naive forecast and a PNG chart. Not investment advice."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the full report and print it as JSON
    Report(RunArgs),
    /// Run each pipeline stage in turn and print its output
    Inspect(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Asset id as known to the price source (e.g. "bitcoin", "ethereum")
    #[arg(default_value = "bitcoin")]
    coin: String,

    /// Days of history to request
    #[arg(long)]
    days: Option<u32>,

    /// Steps to project forward
    #[arg(long)]
    horizon: Option<usize>,

    /// Quote currency (e.g. "usd", "brl")
    #[arg(long)]
    vs_currency: Option<String>,

    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read `timestamp_ms,price` rows from a CSV file instead of the network
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Directory for chart files
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

impl RunArgs {
    fn settings(&self) -> Result<ReportSettings> {
        let mut settings = ReportSettings::load_or_default(self.config.as_deref())?;
        if let Some(dir) = &self.out_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(vs) = &self.vs_currency {
            settings.vs_currency = vs.clone();
        }
        Ok(settings)
    }

    fn request(&self, settings: &ReportSettings) -> ReportRequest {
        ReportRequest::new(
            self.coin.clone(),
            self.days.unwrap_or(settings.default_lookback_days),
            self.horizon.unwrap_or(settings.default_horizon),
        )
        .with_vs_currency(settings.vs_currency.clone())
    }

    fn source(&self, settings: &ReportSettings) -> Result<Box<dyn PriceHistorySource>> {
        let source: Box<dyn PriceHistorySource> = match &self.csv {
            Some(path) => Box::new(CsvPriceSource::new(path)),
            None => Box::new(
                CoinGeckoClient::from_settings(settings).context("cannot set up the CoinGecko client")?,
            ),
        };
        Ok(source)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Report(args) => run_report(args).await,
        Commands::Inspect(args) => run_inspect(args).await,
    }
}

async fn run_report(args: RunArgs) -> Result<()> {
    let settings = args.settings()?;
    let request = args.request(&settings);
    let source = args.source(&settings)?;

    let builder = ReportBuilder::new(settings);
    let report = builder.build_report(&request, source.as_ref()).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_inspect(args: RunArgs) -> Result<()> {
    let settings = args.settings()?;
    let request = args.request(&settings);
    let source = args.source(&settings)?;

    info!(coin = %request.coin_id, days = request.lookback_days, "Fetching price history");
    let payload = match source
        .fetch(&request.coin_id, &request.vs_currency, request.lookback_days)
        .await
    {
        Ok(payload) => payload,
        Err(e) => {
            println!("Price history unavailable: {}", e);
            return Ok(());
        }
    };

    let values = extract_values(&payload);
    let timestamps = extract_timestamps(&payload);
    let (aligned_ts, prices) = unzip_points(&extract_series(&payload));
    println!("Prices returned: {}", values.len());
    if values.len() != timestamps.len() || values.len() != prices.len() {
        println!(
            "Malformed rows: {} prices, {} timestamps, {} complete rows",
            values.len(),
            timestamps.len(),
            prices.len()
        );
    }
    if prices.len() < MIN_PRICES {
        println!("Too few prices to analyse (minimum: {}).", MIN_PRICES);
        return Ok(());
    }

    print_stage("Return statistics", &summarize_returns(&prices))?;
    print_stage("Outliers (IQR)", &detect_outliers_iqr(&prices))?;
    print_stage("Forecast (baseline)", &forecast_naive_last(&prices, request.horizon))?;

    let renderer = ChartRenderer::new(settings.chart.clone());
    let chart = renderer.plot_prices_png(
        Some(&aligned_ts),
        &prices,
        &chart_title(&request.coin_id, request.lookback_days),
        &settings.output_dir,
    );
    print_stage("Chart", &chart)?;
    match chart.file_path() {
        Some(path) => println!("Chart written to {}", path.display()),
        None => println!("No chart: {}", chart.reason().unwrap_or("unknown reason")),
    }
    Ok(())
}

fn print_stage<T: Serialize>(title: &str, value: &T) -> Result<()> {
    println!("\n{}:\n{}", title, serde_json::to_string_pretty(value)?);
    Ok(())
}
