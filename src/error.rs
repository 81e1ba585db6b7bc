use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrendsError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Source {source_name} is missing required column '{column}'")]
    MissingColumn { source_name: String, column: String },

    #[error("Invalid month key '{0}'")]
    InvalidMonth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for TrendsError {
    fn from(err: polars::error::PolarsError) -> Self {
        TrendsError::Polars(err.to_string())
    }
}

impl TrendsError {
    /// HTTP status used when strict status mapping is enabled.
    pub fn status(&self) -> (u16, &'static str) {
        match self {
            TrendsError::DataUnavailable(_) => (503, "Service Unavailable"),
            _ => (500, "Internal Server Error"),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrendsError>;
