use std::time::Duration;

use mcs_core::MetricsBackend;
use mcs_model::{ExecutionKind, ExecutionStatus};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

/// Stop runs finish in about a second; start runs wait at least 30s.
const DURATION_BUCKETS: &[f64] = &[1.0, 10.0, 30.0, 45.0, 60.0, 90.0, 120.0, 180.0, 300.0, 600.0];

#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    control_calls: IntCounterVec,
    workflow_runs: IntCounterVec,
    workflow_duration: HistogramVec,
}

impl PrometheusMetrics {
    /// Create a backend with a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Register the collectors into an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let control_calls = IntCounterVec::new(
            Opts::new(
                "mcs_control_calls_total",
                "Control function calls by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;
        let workflow_runs = IntCounterVec::new(
            Opts::new(
                "mcs_workflow_runs_total",
                "Finished workflow runs by kind and final status",
            ),
            &["kind", "status"],
        )?;
        let workflow_duration = HistogramVec::new(
            HistogramOpts::new(
                "mcs_workflow_duration_seconds",
                "Wall time of finished workflow runs",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["kind"],
        )?;

        registry.register(Box::new(control_calls.clone()))?;
        registry.register(Box::new(workflow_runs.clone()))?;
        registry.register(Box::new(workflow_duration.clone()))?;

        Ok(Self {
            registry,
            control_calls,
            workflow_runs,
            workflow_duration,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render every family in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Content type to send with [`encode`](Self::encode) output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_control(&self, operation: &'static str, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        self.control_calls
            .with_label_values(&[operation, outcome])
            .inc();
    }

    fn record_execution(&self, kind: ExecutionKind, status: ExecutionStatus, duration: Duration) {
        self.workflow_runs
            .with_label_values(&[kind.as_str(), status.as_str()])
            .inc();
        self.workflow_duration
            .with_label_values(&[kind.as_str()])
            .observe(duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_calls_are_counted_by_outcome() {
        let m = PrometheusMetrics::new().unwrap();
        m.record_control("start", true);
        m.record_control("start", true);
        m.record_control("get_ip", false);

        assert_eq!(m.control_calls.with_label_values(&["start", "ok"]).get(), 2);
        assert_eq!(m.control_calls.with_label_values(&["get_ip", "error"]).get(), 1);
        assert_eq!(m.control_calls.with_label_values(&["stop", "ok"]).get(), 0);
    }

    #[test]
    fn executions_feed_counter_and_histogram() {
        let m = PrometheusMetrics::new().unwrap();
        m.record_execution(
            ExecutionKind::Start,
            ExecutionStatus::Succeeded,
            Duration::from_secs(42),
        );
        m.record_execution(
            ExecutionKind::Start,
            ExecutionStatus::TimedOut,
            Duration::from_secs(300),
        );

        assert_eq!(
            m.workflow_runs
                .with_label_values(&["start", "succeeded"])
                .get(),
            1
        );
        let h = m.workflow_duration.with_label_values(&["start"]);
        assert_eq!(h.get_sample_count(), 2);
        assert!((h.get_sample_sum() - 342.0).abs() < f64::EPSILON);
    }

    #[test]
    fn encode_renders_text_format() {
        let m = PrometheusMetrics::new().unwrap();
        m.record_control("stop", true);
        let text = m.encode().unwrap();
        assert!(text.contains("mcs_control_calls_total{operation=\"stop\",outcome=\"ok\"} 1"));
        assert!(m.content_type().starts_with("text/plain"));
    }

    #[test]
    fn shared_registry_rejects_second_backend() {
        let registry = Registry::new();
        PrometheusMetrics::with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::with_registry(registry).is_err());
    }
}
