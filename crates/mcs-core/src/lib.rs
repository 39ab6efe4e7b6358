//! Control plane core: the four control functions, the start/stop workflows that sequence
//! them, and the seams behind which a cloud backend plugs in.

pub mod error;
pub use error::CoreError;

mod cloud;
pub use cloud::{ClusterApi, CloudError, CloudErrorKind, DnsApi};

mod metrics;
pub use metrics::{MetricsBackend, MetricsHandle, NoopMetrics};

mod control;
pub use control::{ControlAck, Controller, StatusReport};

mod state;
pub use state::ExecutionState;

mod workflow;
pub use workflow::{Launch, WorkflowRunner};

#[cfg(any(test, feature = "testing"))]
pub mod fake;
