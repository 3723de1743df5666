use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub retries: u64,
    pub bytes_received: u64,
    pub avg_response_time_ms: f64,
    pub rate_limiter_wait_time_ms: f64,
    pub last_error: Option<String>,
    pub last_error_time: Option<DateTime<Utc>>,
}

/// Shared handle the content store records into; clones see the same counters.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<Mutex<FetchMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FetchMetrics> {
        self.metrics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_request_start(&self) -> RequestTracker {
        RequestTracker {
            start_time: Instant::now(),
            collector: self.clone(),
        }
    }

    pub fn record_rate_limit_wait(&self, duration: Duration) {
        self.lock().rate_limiter_wait_time_ms += duration.as_secs_f64() * 1000.0;
    }

    pub fn record_retry(&self) {
        self.lock().retries += 1;
    }

    pub fn record_error(&self, error: String) {
        let mut metrics = self.lock();
        metrics.last_error = Some(error);
        metrics.last_error_time = Some(Utc::now());
    }

    pub fn snapshot(&self) -> FetchMetrics {
        self.lock().clone()
    }
}

pub struct RequestTracker {
    start_time: Instant,
    collector: MetricsCollector,
}

impl RequestTracker {
    /// `bytes` is `None` for a failed request.
    pub fn finish(self, bytes: Option<usize>) {
        let duration = self.start_time.elapsed();
        let mut metrics = self.collector.lock();

        metrics.total_requests += 1;
        match bytes {
            Some(n) => {
                metrics.successful_requests += 1;
                metrics.bytes_received += n as u64;
            }
            None => metrics.failed_requests += 1,
        }

        // exponential moving average, seeded by the first sample
        let sample = duration.as_secs_f64() * 1000.0;
        metrics.avg_response_time_ms = if metrics.total_requests == 1 {
            sample
        } else {
            let alpha = 0.1;
            metrics.avg_response_time_ms * (1.0 - alpha) + sample * alpha
        };
    }
}
