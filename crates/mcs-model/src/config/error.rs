use std::path::PathBuf;

use thiserror::Error;

/// A single problem found while validating a [`ServerConfig`](super::ServerConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigIssue {
    #[error("enable_route53 is set but hosted_zone_id is empty")]
    MissingHostedZone,
    #[error("enable_route53 is set but domain_name is empty")]
    MissingDomainName,
    #[error("allowed_cidrs must list at least one range")]
    NoAllowedCidrs,
    #[error("{0}")]
    InvalidCidr(String),
    #[error("budget_amount must be positive, got {0}")]
    BudgetAmount(String),
    #[error("budget_email '{0}' is not an e-mail address")]
    BudgetEmail(String),
    #[error("backup.retention_days must be at least 1")]
    BackupRetention,
    #[error("game_port must not be 0")]
    GamePort,
    #[error("workflow.{field} {reason}")]
    Workflow {
        field: &'static str,
        reason: &'static str,
    },
    #[error("variable name '{0}' is not a valid environment variable name")]
    VariableName(String),
    #[error("variable '{0}' is reserved and set by the stack")]
    ReservedVariable(String),
    #[error("control.{0} is required for runtime commands")]
    MissingControlTarget(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {}", join(.0))]
    Invalid(Vec<ConfigIssue>),
}

impl ConfigError {
    /// Issues carried by an [`ConfigError::Invalid`], empty otherwise.
    pub fn issues(&self) -> &[ConfigIssue] {
        match self {
            ConfigError::Invalid(issues) => issues,
            _ => &[],
        }
    }
}

fn join(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
