use std::{sync::Arc, time::Duration};

use mcs_model::{ExecutionKind, ExecutionStatus};

/// Sink for control-plane measurements.
pub trait MetricsBackend: Send + Sync + 'static {
    /// One control function call (`start`, `stop`, `get_ip`, `update_dns`) and whether it succeeded.
    fn record_control(&self, operation: &'static str, ok: bool);

    /// A finished workflow run.
    fn record_execution(&self, kind: ExecutionKind, status: ExecutionStatus, duration: Duration);
}

pub type MetricsHandle = Arc<dyn MetricsBackend>;

/// Backend that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsBackend for NoopMetrics {
    fn record_control(&self, _operation: &'static str, _ok: bool) {}

    fn record_execution(&self, _kind: ExecutionKind, _status: ExecutionStatus, _duration: Duration) {}
}

impl NoopMetrics {
    pub fn handle() -> MetricsHandle {
        Arc::new(NoopMetrics)
    }
}
