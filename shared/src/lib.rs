pub mod models;
pub mod utils;

pub use models::{
    ChartArtifact, FenceReport, Forecast, OutlierReport, PricePoint, Report, ReportOutcome,
    ReportSections, ReturnStats,
};
