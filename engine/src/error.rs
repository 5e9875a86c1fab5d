use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("CSV data format error: {0}")]
    CsvDataFormatError(String),

    #[error("Price history source timed out: {0}")]
    DataSourceTimeout(String),

    #[error("Price history source answered with HTTP status {status}")]
    DataSourceStatus { status: u16 },

    #[error("Network failure while reaching the price history source: {0}")]
    DataSourceNetwork(String),

    #[error("Price history payload error: {0}")]
    PayloadError(String),

    #[error("Chart rendering error: {0}")]
    ChartError(String),

    // Errors given context through anyhow, such as a CSV file that cannot be opened.
    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

impl EngineError {
    /// True for the failures a remote price history source can signal:
    /// timeouts, non-success statuses and transport errors.
    pub fn is_data_source_failure(&self) -> bool {
        matches!(
            self,
            EngineError::DataSourceTimeout(_)
                | EngineError::DataSourceStatus { .. }
                | EngineError::DataSourceNetwork(_)
        )
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EngineError::DataSourceTimeout(err.to_string())
        } else if let Some(status) = err.status() {
            EngineError::DataSourceStatus { status: status.as_u16() }
        } else if err.is_decode() {
            EngineError::PayloadError(err.to_string())
        } else {
            EngineError::DataSourceNetwork(err.to_string())
        }
    }
}

impl From<png::EncodingError> for EngineError {
    fn from(err: png::EncodingError) -> Self {
        match err {
            png::EncodingError::IoError(source) => EngineError::IoError { source },
            other => EngineError::ChartError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_failure_classification() {
        assert!(EngineError::DataSourceTimeout("slow".into()).is_data_source_failure());
        assert!(EngineError::DataSourceStatus { status: 404 }.is_data_source_failure());
        assert!(EngineError::DataSourceNetwork("dns".into()).is_data_source_failure());
        assert!(!EngineError::PayloadError("bad json".into()).is_data_source_failure());
        assert!(!EngineError::ConfigError("bad".into()).is_data_source_failure());
    }

    #[test]
    fn test_status_error_message() {
        let err = EngineError::DataSourceStatus { status: 404 };
        assert_eq!(err.to_string(), "Price history source answered with HTTP status 404");
    }

    #[test]
    fn test_anyhow_context_is_displayed() {
        let err: EngineError = anyhow::anyhow!("Failed to open CSV file 'x.csv'").into();
        assert_eq!(err.to_string(), "Failed to open CSV file 'x.csv'");
        assert!(!err.is_data_source_failure());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EngineError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
