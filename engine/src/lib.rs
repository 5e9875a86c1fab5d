// Engine library root
// Price history analysis: extraction, return statistics, outliers, a baseline
// forecast, chart rendering and the report that ties them together.

pub mod analysis;
pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod report;

pub use error::EngineError;
pub use report::{build_report, ReportBuilder, ReportRequest};
