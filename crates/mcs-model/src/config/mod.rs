//! Static deployment configuration.
//!
//! The record is supplied once at deployment time and never mutated by a running component.

mod cidr;
pub use cidr::Ipv4Cidr;

mod error;
pub use error::{ConfigError, ConfigIssue};

mod validate;

use std::{collections::BTreeMap, fs, io, net::SocketAddr, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{ServerSize, TaskSizing};

pub const DEFAULT_STACK_NAME: &str = "MinecraftServer";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_IMAGE: &str = "itzg/minecraft-server";
pub const DEFAULT_GAME_PORT: u16 = 25565;
pub const DEFAULT_CONTAINER_NAME: &str = "MinecraftContainer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub stack_name: String,
    pub stack_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    pub server_size: ServerSize,
    pub image: String,
    pub game_port: u16,
    /// Environment passed verbatim to the server container.
    pub variables: BTreeMap<String, String>,
    /// Ranges allowed to reach the game port.
    pub allowed_cidrs: Vec<String>,
    pub log_retention_days: u32,
    /// Desired count the service is created with.
    pub start_on_deploy: bool,

    pub enable_route53: bool,
    pub hosted_zone_id: String,
    pub domain_name: String,
    pub dns_ttl: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_email: Option<String>,
    pub budget_amount: f64,

    pub backup: BackupConfig,
    pub workflow: WorkflowConfig,
    pub control: ControlConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackupConfig {
    /// Days after which backup objects expire.
    pub retention_days: u32,
    /// Days after which noncurrent object versions expire.
    pub noncurrent_retention_days: u32,
}

/// Timing of the start workflow: wait, then poll for an address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    pub initial_wait_secs: u64,
    pub poll_interval_secs: u64,
    /// Multiplier applied to the poll interval after every attempt.
    pub backoff_rate: f64,
    pub max_attempts: u32,
    /// Upper bound for the whole run.
    pub timeout_secs: u64,
}

/// Where runtime commands find the deployed service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    pub container: String,
    pub listen: SocketAddr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            stack_prefix: String::new(),
            region: None,
            account: None,
            server_size: ServerSize::default(),
            image: DEFAULT_IMAGE.to_string(),
            game_port: DEFAULT_GAME_PORT,
            variables: BTreeMap::new(),
            allowed_cidrs: vec![Ipv4Cidr::ANY.to_string()],
            log_retention_days: 7,
            start_on_deploy: false,
            enable_route53: false,
            hosted_zone_id: String::new(),
            domain_name: String::new(),
            dns_ttl: 60,
            budget_email: None,
            budget_amount: 10.0,
            backup: BackupConfig::default(),
            workflow: WorkflowConfig::default(),
            control: ControlConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            retention_days: 7,
            noncurrent_retention_days: 1,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            initial_wait_secs: 30,
            poll_interval_secs: 6,
            backoff_rate: 1.0,
            max_attempts: 20,
            timeout_secs: 600,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            cluster: None,
            service: None,
            bucket: None,
            container: DEFAULT_CONTAINER_NAME.to_string(),
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl WorkflowConfig {
    pub fn initial_wait(&self) -> Duration {
        Duration::from_secs(self.initial_wait_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before poll `attempt` (zero-based) is retried, rounded to whole seconds
    /// and capped at the overall timeout.
    pub fn poll_delay(&self, attempt: u32) -> Duration {
        let cap = self.timeout_secs as f64;
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.poll_interval_secs as f64 * self.backoff_rate.powi(exp);
        let secs = if secs.is_finite() {
            secs.round().clamp(0.0, cap)
        } else {
            cap
        };
        Duration::from_secs(secs as u64)
    }
}

impl ServerConfig {
    /// Load the config from a TOML file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_toml(&raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Fill unset deployment coordinates from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Fill unset deployment coordinates from `lookup`.
    ///
    /// Values already present in the file win; `MCS_DEPLOY_*` wins over `MCS_DEFAULT_*`.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| lookup(k).filter(|v| !v.trim().is_empty()))
        };

        if self.region.is_none() {
            self.region = first(&["MCS_DEPLOY_REGION", "MCS_DEFAULT_REGION"]);
        }
        if self.account.is_none() {
            self.account = first(&["MCS_DEPLOY_ACCOUNT", "MCS_DEFAULT_ACCOUNT"]);
        }
        if self.stack_prefix.is_empty()
            && let Some(prefix) = first(&["MCS_STACK_PREFIX"])
        {
            self.stack_prefix = prefix;
        }
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    pub fn full_stack_name(&self) -> String {
        format!("{}{}", self.stack_prefix, self.stack_name)
    }

    pub fn sizing(&self) -> TaskSizing {
        self.server_size.sizing()
    }

    /// Parsed ingress ranges, duplicates removed, configured order kept.
    pub fn ingress_cidrs(&self) -> Result<Vec<Ipv4Cidr>, ConfigError> {
        let mut out: Vec<Ipv4Cidr> = Vec::with_capacity(self.allowed_cidrs.len());
        let mut issues = Vec::new();
        for raw in &self.allowed_cidrs {
            match raw.parse::<Ipv4Cidr>() {
                Ok(cidr) if !out.contains(&cidr) => out.push(cidr),
                Ok(_) => {}
                Err(e) => issues.push(ConfigIssue::InvalidCidr(e.to_string())),
            }
        }
        if issues.is_empty() {
            Ok(out)
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }

    /// `(cluster, service)` the runtime commands act on.
    pub fn control_target(&self) -> Result<(&str, &str), ConfigError> {
        let cluster = self.control.cluster.as_deref().filter(|s| !s.is_empty());
        let service = self.control.service.as_deref().filter(|s| !s.is_empty());
        match (cluster, service) {
            (Some(c), Some(s)) => Ok((c, s)),
            (None, _) => Err(ConfigError::Invalid(vec![ConfigIssue::MissingControlTarget(
                "cluster",
            )])),
            (_, None) => Err(ConfigError::Invalid(vec![ConfigIssue::MissingControlTarget(
                "service",
            )])),
        }
    }

    /// DNS settings when Route 53 integration is enabled.
    pub fn dns_target(&self) -> Option<DnsTarget> {
        self.enable_route53.then(|| DnsTarget {
            hosted_zone_id: self.hosted_zone_id.clone(),
            domain_name: self.domain_name.clone(),
            ttl: self.dns_ttl,
        })
    }
}

/// Record the DNS reconciliation keeps pointed at the task address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsTarget {
    pub hosted_zone_id: String,
    pub domain_name: String,
    pub ttl: u32,
}
