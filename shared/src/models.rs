use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One validated `[timestamp, price]` row of a price history payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp_ms: i64,
    pub price: f64,
}

/// Simple-return statistics, or the reason they could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReturnStats {
    Summary {
        count: usize,
        mean_return: f64,
        volatility: f64,
        min_return: f64,
        max_return: f64,
    },
    Insufficient {
        count: usize,
        reason: String,
    },
}

impl ReturnStats {
    pub fn insufficient(reason: impl Into<String>) -> Self {
        ReturnStats::Insufficient {
            count: 0,
            reason: reason.into(),
        }
    }

    /// Number of returns the statistics were computed from (0 when degenerate).
    pub fn count(&self) -> usize {
        match self {
            ReturnStats::Summary { count, .. } | ReturnStats::Insufficient { count, .. } => *count,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ReturnStats::Summary { .. } => None,
            ReturnStats::Insufficient { reason, .. } => Some(reason),
        }
    }
}

/// Quartiles and fences of an IQR outlier pass.
///
/// `reason` is only set when the interquartile range collapsed to zero and
/// flagging was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FenceReport {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub outlier_indices: Vec<usize>,
    pub outlier_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutlierReport {
    Fenced(FenceReport),
    Insufficient {
        outlier_indices: Vec<usize>,
        reason: String,
    },
}

impl OutlierReport {
    pub fn insufficient(reason: impl Into<String>) -> Self {
        OutlierReport::Insufficient {
            outlier_indices: Vec::new(),
            reason: reason.into(),
        }
    }

    pub fn outlier_indices(&self) -> &[usize] {
        match self {
            OutlierReport::Fenced(fences) => &fences.outlier_indices,
            OutlierReport::Insufficient { outlier_indices, .. } => outlier_indices,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            OutlierReport::Fenced(fences) => fences.reason.as_deref(),
            OutlierReport::Insufficient { reason, .. } => Some(reason),
        }
    }
}

/// Forward projection of a price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Forecast {
    Projection {
        model: String,
        horizon: usize,
        last_value: f64,
        forecast: Vec<f64>,
    },
    Empty {
        forecast: Vec<f64>,
        reason: String,
    },
}

impl Forecast {
    pub fn empty(reason: impl Into<String>) -> Self {
        Forecast::Empty {
            forecast: Vec::new(),
            reason: reason.into(),
        }
    }

    pub fn values(&self) -> &[f64] {
        match self {
            Forecast::Projection { forecast, .. } | Forecast::Empty { forecast, .. } => forecast,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Forecast::Projection { .. } => None,
            Forecast::Empty { reason, .. } => Some(reason),
        }
    }
}

/// Reference to a rendered chart file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartArtifact {
    Rendered {
        filename: String,
        file_path: PathBuf,
    },
    Skipped {
        filename: Option<String>,
        file_path: Option<PathBuf>,
        reason: String,
    },
}

impl ChartArtifact {
    pub fn skipped(reason: impl Into<String>) -> Self {
        ChartArtifact::Skipped {
            filename: None,
            file_path: None,
            reason: reason.into(),
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            ChartArtifact::Rendered { filename, .. } => Some(filename),
            ChartArtifact::Skipped { .. } => None,
        }
    }

    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            ChartArtifact::Rendered { file_path, .. } => Some(file_path),
            ChartArtifact::Skipped { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ChartArtifact::Rendered { .. } => None,
            ChartArtifact::Skipped { reason, .. } => Some(reason),
        }
    }
}

/// Aggregate result of one report run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub coin: String,
    pub vs_currency: String,
    pub days: u32,
    pub horizon: usize,
    pub n_prices: usize,
    #[serde(flatten)]
    pub outcome: ReportOutcome,
}

impl Report {
    pub fn reason(&self) -> Option<&str> {
        match &self.outcome {
            ReportOutcome::Complete(_) => None,
            ReportOutcome::Unavailable { reason } => Some(reason),
        }
    }

    pub fn sections(&self) -> Option<&ReportSections> {
        match &self.outcome {
            ReportOutcome::Complete(sections) => Some(sections),
            ReportOutcome::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportOutcome {
    Complete(Box<ReportSections>),
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSections {
    pub stats: ReturnStats,
    pub outliers: OutlierReport,
    pub forecast: Forecast,
    pub chart_filename: Option<String>,
    pub chart_path: Option<PathBuf>,
    pub chart_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_reason: Option<String>,
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_return_stats_degenerate_shape() {
        let stats = ReturnStats::insufficient("too few points");
        assert_eq!(stats.count(), 0);
        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            json!({ "count": 0, "reason": "too few points" })
        );
    }

    #[test]
    fn test_return_stats_summary_parses_before_degenerate() {
        let value = json!({
            "count": 2, "mean_return": 0.01, "volatility": 0.02,
            "min_return": -0.01, "max_return": 0.03
        });
        let stats: ReturnStats = serde_json::from_value(value).unwrap();
        assert!(matches!(stats, ReturnStats::Summary { count: 2, .. }));
        assert!(stats.reason().is_none());
    }

    #[test]
    fn test_fence_report_omits_absent_reason() {
        let report = OutlierReport::Fenced(FenceReport {
            q1: 1.0,
            q3: 2.0,
            iqr: 1.0,
            lower_fence: -0.5,
            upper_fence: 3.5,
            outlier_indices: vec![4],
            outlier_count: 1,
            reason: None,
        });
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("reason").is_none());
        assert_eq!(value["outlier_indices"], json!([4]));
    }

    #[test]
    fn test_insufficient_outliers_round_trip_as_insufficient() {
        let report = OutlierReport::insufficient("too few points for outlier detection");
        let value = serde_json::to_value(&report).unwrap();
        let parsed: OutlierReport = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, report);
        assert!(parsed.outlier_indices().is_empty());
    }

    #[test]
    fn test_skipped_chart_serializes_nulls() {
        let chart = ChartArtifact::skipped("too few points to plot");
        assert_eq!(
            serde_json::to_value(&chart).unwrap(),
            json!({ "filename": null, "file_path": null, "reason": "too few points to plot" })
        );
    }

    #[test]
    fn test_unavailable_report_flattens_reason() {
        let report = Report {
            coin: "bitcoin".to_string(),
            vs_currency: "usd".to_string(),
            days: 7,
            horizon: 3,
            n_prices: 1,
            outcome: ReportOutcome::Unavailable { reason: "not enough prices".to_string() },
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["reason"], "not enough prices");
        assert_eq!(value["n_prices"], 1);
        assert!(value.get("stats").is_none());
        assert_eq!(report.reason(), Some("not enough prices"));
    }
}
