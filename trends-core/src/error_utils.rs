use crate::error::*;
use tracing::{error, warn};

/// Classification shared by every error the run can hit.
pub trait ErrorExt {
    /// True when the failure only affects a single source and the run can go on.
    fn is_source_local(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> &'static str;
}

impl ErrorExt for CoreError {
    fn is_source_local(&self) -> bool {
        match self {
            CoreError::Crossref(e) => e.is_source_local(),
            CoreError::State(e) => e.is_source_local(),
            CoreError::Config(e) => e.is_source_local(),
            CoreError::Network(_) => true,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Crossref(e) => e.user_friendly_message(),
            CoreError::State(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Could not reach Crossref. Check the network connection.".to_string()
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            CoreError::Crossref(e) => e.error_code(),
            CoreError::State(e) => e.error_code(),
            CoreError::Config(e) => e.error_code(),
            CoreError::Network(_) => "NETWORK",
        }
    }
}

impl ErrorExt for CrossrefApiError {
    fn is_source_local(&self) -> bool {
        // A bad base URL breaks every source, not just one.
        !matches!(self, CrossrefApiError::InvalidUrl { .. })
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CrossrefApiError::JournalNotFound { issn } => {
                format!("No journal with ISSN {} is known to Crossref.", issn)
            }
            CrossrefApiError::RateLimitExceeded { retry_after } => format!(
                "Crossref is rate limiting requests. Wait {} seconds before the next run.",
                retry_after
            ),
            CrossrefApiError::ServerError { .. } => {
                "Crossref returned a server error. The source will be tried again next run."
                    .to_string()
            }
            CrossrefApiError::UnexpectedStatus { status_code, .. } => {
                format!("Crossref answered with HTTP {}.", status_code)
            }
            CrossrefApiError::RequestTimeout { .. } => "Request to Crossref timed out.".to_string(),
            CrossrefApiError::InvalidResponse { .. } => {
                "Crossref sent a listing that could not be read.".to_string()
            }
            CrossrefApiError::InvalidUrl { details } => {
                format!("The Crossref base URL is not usable: {}", details)
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            CrossrefApiError::JournalNotFound { .. } => "CROSSREF_JOURNAL_NOT_FOUND",
            CrossrefApiError::RateLimitExceeded { .. } => "CROSSREF_RATE_LIMIT",
            CrossrefApiError::ServerError { .. } => "CROSSREF_SERVER_ERROR",
            CrossrefApiError::UnexpectedStatus { .. } => "CROSSREF_UNEXPECTED_STATUS",
            CrossrefApiError::RequestTimeout { .. } => "CROSSREF_TIMEOUT",
            CrossrefApiError::InvalidResponse { .. } => "CROSSREF_INVALID_RESPONSE",
            CrossrefApiError::InvalidUrl { .. } => "CROSSREF_INVALID_URL",
        }
    }
}

impl ErrorExt for StateError {
    fn is_source_local(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StateError::ReadFailed { path, .. } => {
                format!("Could not read state file {}.", path.display())
            }
            StateError::Corrupt { path, .. } => format!(
                "State file {} is not valid JSON. Fix or remove it before the next run.",
                path.display()
            ),
            StateError::WriteFailed { path, .. } => {
                format!("Could not write state file {}.", path.display())
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            StateError::ReadFailed { .. } => "STATE_READ_FAILED",
            StateError::Corrupt { .. } => "STATE_CORRUPT",
            StateError::WriteFailed { .. } => "STATE_WRITE_FAILED",
        }
    }
}

impl ErrorExt for ConfigError {
    fn is_source_local(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file not found: {}", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, value } => {
                format!("Invalid value '{}' for configuration field '{}'.", value, field)
            }
            ConfigError::ValidationFailed { reason } => {
                format!("Configuration is invalid: {}", reason)
            }
            ConfigError::Parse(_) => "Configuration file could not be parsed.".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED",
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
        }
    }
}

/// Logs a failure with its code; errors end the run, warnings skip a source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error(&self, error: &CoreError) {
        error!(
            code = error.error_code(),
            "{} ({})",
            error,
            error.user_friendly_message()
        );
    }

    pub fn report_warning(&self, error: &CoreError) {
        warn!(code = error.error_code(), "{}", error);
    }
}
