// Statistical stages of the report pipeline
pub mod clean;
pub mod forecast;
pub mod outliers;
pub mod returns;

pub use clean::to_finite_array;
pub use forecast::{forecast_naive_last, NaiveLastValue};
pub use outliers::detect_outliers_iqr;
pub use returns::summarize_returns;

use serde_json::Value;
use shared::models::Forecast;

// Common trait for forecast models
pub trait Forecaster: Send + Sync {
    fn name(&self) -> &str;
    fn parameters(&self) -> Value; // Parameters used for this model instance
    fn forecast(&self, series: &[f64], horizon: usize) -> Forecast; // Degenerate input yields Forecast::Empty
}
