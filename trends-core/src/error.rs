use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Crossref API error: {0}")]
    Crossref(#[from] CrossrefApiError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Error, Debug, Clone)]
pub enum CrossrefApiError {
    #[error("Journal not found: {issn}")]
    JournalNotFound { issn: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Unexpected status {status_code} for {endpoint}")]
    UnexpectedStatus { status_code: u16, endpoint: String },

    #[error("Request timeout for {endpoint}")]
    RequestTimeout { endpoint: String },

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Invalid request URL: {details}")]
    InvalidUrl { details: String },
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt state file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
