//! Prometheus metrics: request durations and metadata cache counters.

use crate::cache::CacheStats;
use axum::http::StatusCode;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::time::Duration;

pub const REQUEST_DURATION: &str = "http_request_duration_seconds";
const REQUEST_BUCKETS: &[f64] = &[0.001, 0.01, 0.1, 1.0, 2.0, 5.0];

/// Recorder owned by one server instance. It is never installed as the
/// global recorder, so several servers (and tests) can coexist.
pub struct Metrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl Metrics {
    pub fn new() -> Self {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), REQUEST_BUCKETS)
            .unwrap_or_else(|e| {
                tracing::warn!("Invalid request duration buckets: {}", e);
                PrometheusBuilder::new()
            });
        let recorder = builder.build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            metrics::describe_histogram!(
                REQUEST_DURATION,
                metrics::Unit::Seconds,
                "duration histogram of http responses"
            );
            metrics::describe_counter!("metadata_cache_hits", "Metadata cache hits");
            metrics::describe_counter!("metadata_cache_misses", "Metadata cache misses");
            metrics::describe_gauge!("metadata_cache_keys", "Metadata cache keys");
        });

        Self { recorder, handle }
    }

    /// Record one media request.
    pub fn record_request(&self, status: StatusCode, app: &str, kind: &str, elapsed: Duration) {
        metrics::with_local_recorder(&self.recorder, || {
            metrics::histogram!(
                REQUEST_DURATION,
                "status_code" => status.as_u16().to_string(),
                "app" => app.to_string(),
                "type" => kind.to_string()
            )
            .record(elapsed.as_secs_f64());
        });
    }

    /// Prometheus text exposition, with the cache counters refreshed first.
    pub fn render(&self, cache: &CacheStats) -> String {
        metrics::with_local_recorder(&self.recorder, || {
            metrics::counter!("metadata_cache_hits").absolute(cache.hits);
            metrics::counter!("metadata_cache_misses").absolute(cache.misses);
            metrics::gauge!("metadata_cache_keys").set(cache.entries as f64);
        });
        self.handle.render()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_cache_counters() {
        let metrics = Metrics::new();
        let text = metrics.render(&CacheStats {
            entries: 3,
            hits: 7,
            misses: 2,
        });
        assert!(text.contains("metadata_cache_hits 7"));
        assert!(text.contains("metadata_cache_misses 2"));
        assert!(text.contains("metadata_cache_keys 3"));
    }

    #[test]
    fn test_request_histogram_buckets() {
        let metrics = Metrics::new();
        metrics.record_request(StatusCode::OK, "hls", "segment", Duration::from_millis(50));
        metrics.record_request(StatusCode::NOT_FOUND, "hls", "segment", Duration::from_millis(3));

        let text = metrics.render(&CacheStats {
            entries: 0,
            hits: 0,
            misses: 0,
        });
        assert!(text.contains("http_request_duration_seconds_bucket{"));
        assert!(text.contains("status_code=\"200\""));
        assert!(text.contains("status_code=\"404\""));
        assert!(text.contains("type=\"segment\""));
        assert!(text.contains("le=\"0.1\""));
        assert!(text.contains("http_request_duration_seconds_count{"));
    }

    #[test]
    fn test_instances_are_independent() {
        let first = Metrics::new();
        let second = Metrics::new();
        first.record_request(StatusCode::OK, "hls", "playlist", Duration::from_millis(1));

        let empty = CacheStats {
            entries: 0,
            hits: 0,
            misses: 0,
        };
        assert!(first.render(&empty).contains("type=\"playlist\""));
        assert!(!second.render(&empty).contains("type=\"playlist\""));
    }
}
