//! Domain model of the on-demand game server control plane.
//!
//! Everything here is plain data: the static deployment configuration, the sizing tiers,
//! and the few transient values the control functions exchange at runtime.

mod error;
pub use error::ModelError;

pub mod backup;

pub mod config;
pub use config::{
    BackupConfig, ConfigError, ConfigIssue, ControlConfig, DnsTarget, Ipv4Cidr, LogConfig,
    ServerConfig, WorkflowConfig,
};

mod sizing;
pub use sizing::{ServerSize, TaskSizing, fargate_supports};

mod domain;
pub use domain::*;
