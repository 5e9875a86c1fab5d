// Price history acquisition and payload extraction
pub mod coingecko;
pub mod csv_source;
pub mod extractor;
pub mod market_data;

pub use coingecko::CoinGeckoClient;
pub use csv_source::CsvPriceSource;
pub use market_data::{MarketDataStore, PriceHistorySource};
