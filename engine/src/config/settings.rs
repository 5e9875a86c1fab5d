// Report settings, loaded from a JSON file or taken from defaults
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::EngineError;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
    /// Address of the static file server that exposes `output_dir`.
    pub chart_base_url: String,
    pub api_base_url: String,
    pub vs_currency: String,
    pub request_timeout_secs: u64,
    pub default_lookback_days: u32,
    pub default_horizon: usize,
    pub chart: ChartSettings,
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            output_dir: PathBuf::from("artifacts"),
            chart_base_url: "http://127.0.0.1:9000".to_string(),
            api_base_url: "https://api.coingecko.com/api/v3".to_string(),
            vs_currency: "usd".to_string(),
            request_timeout_secs: 30,
            default_lookback_days: 7,
            default_horizon: 3,
            chart: ChartSettings::default(),
        }
    }
}

impl ReportSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!("cannot read '{}': {}", path.display(), e))
        })?;
        let settings: ReportSettings = serde_json::from_str(&raw).map_err(|e| {
            EngineError::ConfigError(format!("invalid JSON in '{}': {}", path.display(), e))
        })?;
        settings.validate()?;
        tracing::debug!(path = %path.display(), "Loaded report settings");
        Ok(settings)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self, EngineError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.request_timeout_secs == 0 {
            return Err(EngineError::ConfigError("request_timeout_secs must be greater than 0".to_string()));
        }
        self.chart.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Output backend of the chart renderer. Chosen per renderer instance.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChartBackend {
    /// Off-screen raster written straight to a PNG file.
    #[default]
    HeadlessPng,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ChartSettings {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    pub backend: ChartBackend,
    pub line_color: [u8; 3],
    pub background: [u8; 3],
}

impl Default for ChartSettings {
    fn default() -> Self {
        // 10x4 inches at 150 dpi
        ChartSettings {
            width: 1500,
            height: 600,
            dpi: 150,
            backend: ChartBackend::HeadlessPng,
            line_color: [31, 119, 180],
            background: [255, 255, 255],
        }
    }
}

impl ChartSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::ConfigError(format!(
                "chart canvas must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.dpi == 0 {
            return Err(EngineError::ConfigError("chart dpi must be greater than 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let settings = ReportSettings::default();
        assert_eq!(settings.output_dir, PathBuf::from("artifacts"));
        assert_eq!(settings.chart_base_url, "http://127.0.0.1:9000");
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.chart.width, 1500);
        assert_eq!(settings.chart.backend, ChartBackend::HeadlessPng);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = create_config_file(r#"{ "output_dir": "out", "chart": { "dpi": 72 } }"#);
        let settings = ReportSettings::load(file.path()).unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("out"));
        assert_eq!(settings.chart.dpi, 72);
        assert_eq!(settings.chart.height, 600);
        assert_eq!(settings.vs_currency, "usd");
    }

    #[test]
    fn test_backend_name_in_file() {
        let file = create_config_file(r#"{ "chart": { "backend": "headless_png" } }"#);
        let settings = ReportSettings::load(file.path()).unwrap();
        assert_eq!(settings.chart.backend, ChartBackend::HeadlessPng);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let file = create_config_file("{ not json");
        let err = ReportSettings::load(file.path()).unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ReportSettings::load("definitely_missing_settings.json").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }

    #[test]
    fn test_zero_canvas_rejected() {
        let file = create_config_file(r#"{ "chart": { "width": 0 } }"#);
        assert!(ReportSettings::load(file.path()).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let settings = ReportSettings { request_timeout_secs: 0, ..Default::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_or_default_without_path() {
        assert_eq!(ReportSettings::load_or_default(None).unwrap(), ReportSettings::default());
    }
}
