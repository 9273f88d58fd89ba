use crate::metrics::{ApiMetrics, MetricsCollector, RequestMetrics};
use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use trends_core::{AppConfig, CoreError, CrossrefApiError, FetchWindow, Paper};
use url::Url;

const WORKS_SELECT: &str = "title,DOI";
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct CrossrefResponse<T> {
    pub status: String,
    pub message: T,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorksMessage {
    #[serde(default, deserialize_with = "lenient_works")]
    pub items: Vec<CrossrefWork>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub total_results: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrossrefWork {
    #[serde(default)]
    pub title: Option<Vec<String>>,
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,
}

/// A work that does not match the expected shape decodes as an empty work,
/// which the fetcher then counts as incomplete. The rest of the page is kept.
fn lenient_works<'de, D>(deserializer: D) -> Result<Vec<CrossrefWork>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).unwrap_or_else(|e| {
                debug!("Malformed work in listing: {}", e);
                CrossrefWork::default()
            })
        })
        .collect())
}

impl CrossrefWork {
    pub fn new(title: &str, doi: &str) -> Self {
        Self {
            title: Some(vec![title.to_string()]),
            doi: Some(doi.to_string()),
        }
    }

    /// `None` when the work has no usable title or DOI. The DOI is only
    /// trimmed; it is compared byte for byte against the seen set.
    pub fn into_paper(self) -> Option<Paper> {
        let title = self
            .title?
            .into_iter()
            .next()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())?;
        let doi = self
            .doi
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())?;

        Some(Paper::new(title, doi))
    }
}

/// One page of works for a journal.
#[async_trait]
pub trait WorksSource: Send + Sync {
    async fn fetch_works_page(
        &self,
        issn: &str,
        window: &FetchWindow,
        cursor: &str,
        rows: u32,
    ) -> Result<WorksMessage, CoreError>;
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub rate_limit: RateLimitConfig,
}

impl ClientSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            user_agent: config.user_agent(),
            timeout: config.request_timeout(),
            rate_limit: RateLimitConfig {
                min_interval: config.min_request_interval(),
            },
        }
    }
}

#[derive(Debug)]
pub struct CrossrefApiClient {
    http_client: Client,
    base_url: Url,
    rate_limiter: RateLimiter,
    metrics: MetricsCollector,
    user_agent: String,
}

impl CrossrefApiClient {
    pub fn new(settings: ClientSettings) -> Result<Self, CoreError> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            CoreError::Crossref(CrossrefApiError::InvalidUrl {
                details: format!("{}: {}", settings.base_url, e),
            })
        })?;

        let http_client = Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            rate_limiter: RateLimiter::new(settings.rate_limit),
            metrics: MetricsCollector::new(),
            user_agent: settings.user_agent,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn works_url(&self, issn: &str) -> Result<Url, CoreError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                CoreError::Crossref(CrossrefApiError::InvalidUrl {
                    details: format!("{} cannot be a base URL", self.base_url),
                })
            })?;
            segments.pop_if_empty().extend(["journals", issn, "works"]);
        }
        Ok(url)
    }

    /// Paces, sends and decodes one listing request. The request is recorded
    /// in the metrics once its final outcome is known, so a body that fails to
    /// decode counts as a failed request.
    pub async fn get_journal_works(
        &self,
        issn: &str,
        window: &FetchWindow,
        cursor: &str,
        rows: u32,
    ) -> Result<WorksMessage, CoreError> {
        let url = self.works_url(issn)?;
        let endpoint = url.path().to_string();
        let params = [
            ("filter", window.filter_param()),
            ("select", WORKS_SELECT.to_string()),
            ("rows", rows.to_string()),
            ("cursor", cursor.to_string()),
        ];

        let waited = self.rate_limiter.wait().await;
        if !waited.is_zero() {
            debug!("Paced request to {} by {:?}", endpoint, waited);
        }

        info!("Making Crossref API request: GET {}", endpoint);
        let start_time = Instant::now();
        let (outcome, status_code) = self.send_works_request(issn, url, &params).await;

        self.metrics
            .record_request(RequestMetrics {
                source: issn.to_string(),
                status_code,
                response_time: start_time.elapsed(),
                success: outcome.is_ok(),
                rate_limited: status_code == Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            })
            .await;

        let message = outcome?;
        debug!(
            "Retrieved {} works for ISSN {} (total {:?})",
            message.items.len(),
            issn,
            message.total_results
        );
        Ok(message)
    }

    async fn send_works_request(
        &self,
        issn: &str,
        url: Url,
        params: &[(&str, String)],
    ) -> (Result<WorksMessage, CoreError>, Option<u16>) {
        let endpoint = url.path().to_string();
        let response = match self.http_client.get(url).query(params).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for GET {}: {}", endpoint, e);
                let err = if e.is_timeout() {
                    CoreError::Crossref(CrossrefApiError::RequestTimeout { endpoint })
                } else {
                    CoreError::Network(e)
                };
                return (Err(err), None);
            }
        };

        let status = response.status();
        let status_code = Some(status.as_u16());
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if let Some(e) = status_error(status, retry_after.as_deref(), issn, &endpoint) {
            error!("Request failed with status: {} for {}", status, endpoint);
            return (Err(e), status_code);
        }

        let body: CrossrefResponse<WorksMessage> = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to parse works for ISSN {}: {}", issn, e);
                let err = if e.is_timeout() {
                    CoreError::Crossref(CrossrefApiError::RequestTimeout { endpoint })
                } else {
                    CoreError::Crossref(CrossrefApiError::InvalidResponse {
                        details: format!("Failed to parse works for ISSN {}", issn),
                    })
                };
                return (Err(err), status_code);
            }
        };

        if body.status != "ok" {
            warn!("Crossref reported status '{}' for ISSN {}", body.status, issn);
            return (
                Err(CoreError::Crossref(CrossrefApiError::InvalidResponse {
                    details: format!("status '{}' for ISSN {}", body.status, issn),
                })),
                status_code,
            );
        }

        (Ok(body.message), status_code)
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.get_metrics().await
    }

    pub async fn total_pacing_wait(&self) -> Duration {
        self.rate_limiter.total_wait().await
    }
}

#[async_trait]
impl WorksSource for CrossrefApiClient {
    async fn fetch_works_page(
        &self,
        issn: &str,
        window: &FetchWindow,
        cursor: &str,
        rows: u32,
    ) -> Result<WorksMessage, CoreError> {
        self.get_journal_works(issn, window, cursor, rows).await
    }
}

/// Maps a non-success status to the error the source fails with.
pub fn status_error(
    status: StatusCode,
    retry_after: Option<&str>,
    issn: &str,
    endpoint: &str,
) -> Option<CoreError> {
    if status.is_success() {
        return None;
    }

    let error = match status {
        StatusCode::NOT_FOUND => CrossrefApiError::JournalNotFound {
            issn: issn.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = retry_after
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            warn!("Rate limited, retry after {} seconds", retry_after);
            CrossrefApiError::RateLimitExceeded { retry_after }
        }
        s if s.is_server_error() => CrossrefApiError::ServerError {
            status_code: s.as_u16(),
        },
        s => CrossrefApiError::UnexpectedStatus {
            status_code: s.as_u16(),
            endpoint: endpoint.to_string(),
        },
    };

    Some(CoreError::Crossref(error))
}
