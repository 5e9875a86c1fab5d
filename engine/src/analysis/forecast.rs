// Naive last-value forecast: a reference baseline, not a statistical model.
// It carries no error bars and ignores trend and seasonality.
use super::clean::to_finite_array;
use super::Forecaster;
use serde_json::Value;
use shared::models::Forecast;

pub const MODEL_NAME: &str = "naive_last_value";

pub struct NaiveLastValue {
    name: String,
}

impl NaiveLastValue {
    pub fn new() -> Self {
        Self {
            name: MODEL_NAME.to_string(),
        }
    }
}

impl Default for NaiveLastValue {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for NaiveLastValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({})
    }

    fn forecast(&self, series: &[f64], horizon: usize) -> Forecast {
        let x = to_finite_array(series);
        let Some(&last) = x.last() else {
            tracing::warn!("Cannot forecast an empty series");
            return Forecast::empty("empty series: no finite values to forecast from");
        };
        let horizon = horizon.max(1);
        Forecast::Projection {
            model: self.name.clone(),
            horizon,
            last_value: last,
            forecast: vec![last; horizon],
        }
    }
}

/// Repeats the last finite value of `series` for `horizon` steps (at least one).
pub fn forecast_naive_last(series: &[f64], horizon: usize) -> Forecast {
    NaiveLastValue::new().forecast(series, horizon)
}
