use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Outcome of one listing request, recorded once the body has been decoded.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    pub source: String,
    pub status_code: Option<u16>,
    pub response_time: Duration,
    pub success: bool,
    pub rate_limited: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SourceRequestMetrics {
    pub requests: u64,
    pub failures: u64,
    pub slowest: Duration,
    pub last_status_code: Option<u16>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rate_limited_requests: u64,
    pub total_response_time: Duration,
    pub by_source: BTreeMap<String, SourceRequestMetrics>,
}

impl ApiMetrics {
    pub fn average_response_time(&self) -> Duration {
        match u32::try_from(self.total_requests) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_response_time / n,
        }
    }
}

/// Request counters shared by every page the client fetches during a run.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<ApiMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_request(&self, request: RequestMetrics) {
        let mut metrics = self.metrics.write().await;

        metrics.total_requests += 1;
        metrics.total_response_time += request.response_time;
        if request.success {
            metrics.successful_requests += 1;
        } else {
            metrics.failed_requests += 1;
        }
        if request.rate_limited {
            metrics.rate_limited_requests += 1;
        }

        let source = metrics.by_source.entry(request.source).or_default();
        source.requests += 1;
        if !request.success {
            source.failures += 1;
        }
        source.slowest = source.slowest.max(request.response_time);
        source.last_status_code = request.status_code;
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.read().await.clone()
    }
}
