use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.crossref.org";
/// Crossref rejects `rows` above this.
pub const MAX_ROWS_PER_PAGE: u32 = 1000;
/// Optional override file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "paper-trends.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatePaths {
    pub cumulative_path: PathBuf,
    pub seen_path: PathBuf,
    pub dashboard_path: PathBuf,
}

impl Default for StatePaths {
    fn default() -> Self {
        Self {
            cumulative_path: PathBuf::from("word_state.json"),
            seen_path: PathBuf::from("seen_dois.json"),
            dashboard_path: PathBuf::from("dashboard_data.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    /// Journal ISSNs to poll.
    pub sources: Vec<String>,
    /// Sent in the User-Agent so Crossref routes us to the polite pool.
    pub contact_email: String,
    pub request_timeout_secs: u64,
    pub rows_per_page: u32,
    pub max_pages_per_source: u32,
    pub min_request_interval_ms: u64,
    pub lookback_days: u32,
    pub min_token_len: usize,
    pub extra_stopwords: Vec<String>,
    pub dashboard_top_n: usize,
    pub state: StatePaths,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            // Nature, Science
            sources: vec!["1476-4687".to_string(), "1095-9203".to_string()],
            contact_email: "paper-trends@example.org".to_string(),
            request_timeout_secs: 10,
            rows_per_page: MAX_ROWS_PER_PAGE,
            max_pages_per_source: 10,
            min_request_interval_ms: 100,
            lookback_days: 1,
            min_token_len: 3,
            extra_stopwords: Vec::new(),
            dashboard_top_n: 300,
            state: StatePaths::default(),
        }
    }
}

impl AppConfig {
    /// Parses a TOML document; omitted fields keep their compiled-in defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::InvalidValue {
                field: "config file".to_string(),
                value: format!("{}: {}", path.display(), e),
            },
        })?;
        Self::from_toml_str(&contents)
    }

    /// Compiled-in defaults unless an override file exists at `path`.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::from_file(path) {
            Err(ConfigError::FileNotFound { .. }) => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn user_agent(&self) -> String {
        format!(
            "PaperTrends/{} (mailto:{})",
            env!("CARGO_PKG_VERSION"),
            self.contact_email
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::MissingField {
                field: "sources".to_string(),
            });
        }
        if let Some(blank) = self.sources.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "sources".to_string(),
                value: blank.clone(),
            });
        }
        if !self.contact_email.contains('@') {
            return Err(ConfigError::InvalidValue {
                field: "contact_email".to_string(),
                value: self.contact_email.clone(),
            });
        }
        if let Err(e) = url::Url::parse(&self.api_base_url) {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url".to_string(),
                value: format!("{} ({})", self.api_base_url, e),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "request_timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.rows_per_page == 0 || self.rows_per_page > MAX_ROWS_PER_PAGE {
            return Err(ConfigError::ValidationFailed {
                reason: format!("rows_per_page must be between 1 and {}", MAX_ROWS_PER_PAGE),
            });
        }
        if self.max_pages_per_source == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "max_pages_per_source must be greater than zero".to_string(),
            });
        }
        if self.lookback_days == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "lookback_days must be greater than zero".to_string(),
            });
        }
        if self.min_token_len == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "min_token_len must be greater than zero".to_string(),
            });
        }
        if self.dashboard_top_n == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "dashboard_top_n must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dashboard_top_n, 300);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.user_agent().contains("mailto:paper-trends@example.org"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            sources = ["0028-0836"]
            dashboard_top_n = 50

            [state]
            seen_path = "data/seen.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.sources, vec!["0028-0836"]);
        assert_eq!(config.dashboard_top_n, 50);
        assert_eq!(config.state.seen_path, PathBuf::from("data/seen.json"));
        assert_eq!(config.state.cumulative_path, PathBuf::from("word_state.json"));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_validation_failures() {
        let config = AppConfig {
            sources: Vec::new(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField { .. })
        ));

        let config = AppConfig {
            contact_email: "nobody".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let config = AppConfig {
            rows_per_page: MAX_ROWS_PER_PAGE + 1,
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed { .. })
        ));

        let config = AppConfig {
            api_base_url: "not a url".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_without_file() {
        let config = AppConfig::load_or_default(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(config, AppConfig::default());

        let missing = AppConfig::from_file(Path::new("does/not/exist.toml"));
        assert!(matches!(missing, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_malformed_toml() {
        let result = AppConfig::from_toml_str("sources = 12");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
