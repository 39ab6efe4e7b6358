//! Prometheus metrics backend for the server control plane.
//!
//! [`PrometheusMetrics`] implements [`mcs_core::MetricsBackend`] over its own [`Registry`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use mcs_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let handle: mcs_core::MetricsHandle = Arc::new(metrics.clone());
//! # let _ = handle;
//!
//! let text = metrics.encode()?;
//! assert!(text.is_empty() || text.contains("# HELP"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `mcs_control_calls_total{operation, outcome}` - Counter
//! - `mcs_workflow_runs_total{kind, status}` - Counter
//! - `mcs_workflow_duration_seconds{kind}` - Histogram

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
