use super::{ConfigError, ConfigIssue, ServerConfig};
use crate::domain::RESERVED_VARIABLES;

/// Upper bound on address polls; the deployed machine carries one delay per attempt.
const MAX_POLL_ATTEMPTS: u32 = 1000;

impl ServerConfig {
    /// Deployment-time validation.
    ///
    /// Collects every issue instead of stopping at the first one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();

        if self.enable_route53 {
            if self.hosted_zone_id.trim().is_empty() {
                issues.push(ConfigIssue::MissingHostedZone);
            }
            if self.domain_name.trim().is_empty() {
                issues.push(ConfigIssue::MissingDomainName);
            }
        }

        if self.allowed_cidrs.is_empty() {
            issues.push(ConfigIssue::NoAllowedCidrs);
        } else if let Err(e) = self.ingress_cidrs() {
            issues.extend(e.issues().iter().cloned());
        }

        if !(self.budget_amount.is_finite() && self.budget_amount > 0.0) {
            issues.push(ConfigIssue::BudgetAmount(self.budget_amount.to_string()));
        }
        if let Some(email) = &self.budget_email
            && !looks_like_email(email)
        {
            issues.push(ConfigIssue::BudgetEmail(email.clone()));
        }

        if self.backup.retention_days == 0 {
            issues.push(ConfigIssue::BackupRetention);
        }
        if self.game_port == 0 {
            issues.push(ConfigIssue::GamePort);
        }

        let wf = &self.workflow;
        if wf.max_attempts == 0 {
            issues.push(ConfigIssue::Workflow {
                field: "max_attempts",
                reason: "must be at least 1",
            });
        } else if wf.max_attempts > MAX_POLL_ATTEMPTS {
            issues.push(ConfigIssue::Workflow {
                field: "max_attempts",
                reason: "must be at most 1000",
            });
        }
        if wf.poll_interval_secs == 0 {
            issues.push(ConfigIssue::Workflow {
                field: "poll_interval_secs",
                reason: "must be at least 1",
            });
        }
        if !(wf.backoff_rate.is_finite() && wf.backoff_rate >= 1.0) {
            issues.push(ConfigIssue::Workflow {
                field: "backoff_rate",
                reason: "must be >= 1.0",
            });
        }
        if wf.timeout_secs <= wf.initial_wait_secs {
            issues.push(ConfigIssue::Workflow {
                field: "timeout_secs",
                reason: "must exceed initial_wait_secs",
            });
        }

        for key in self.variables.keys() {
            if !is_env_name(key) {
                issues.push(ConfigIssue::VariableName(key.clone()));
            } else if RESERVED_VARIABLES.contains(&key.as_str()) {
                issues.push(ConfigIssue::ReservedVariable(key.clone()));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }
}

fn looks_like_email(s: &str) -> bool {
    match s.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

fn is_env_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}
