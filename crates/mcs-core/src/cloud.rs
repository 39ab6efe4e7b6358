use std::fmt;

use async_trait::async_trait;
use mcs_model::{DesiredCount, DnsChange, DnsTarget, TaskAddress, TaskArn};
use thiserror::Error;

/// Container service holding the single server replica.
///
/// Implementations surface provider errors verbatim; retrying is not their job.
#[async_trait]
pub trait ClusterApi: Send + Sync + 'static {
    async fn set_desired_count(&self, count: DesiredCount) -> Result<(), CloudError>;

    async fn desired_count(&self) -> Result<DesiredCount, CloudError>;

    /// Tasks of the service whose desired status is running.
    async fn running_tasks(&self) -> Result<Vec<TaskArn>, CloudError>;

    /// Public address of `task`, or `None` while its network attachment is not ready.
    async fn task_address(&self, task: &TaskArn) -> Result<Option<TaskAddress>, CloudError>;
}

/// Managed DNS zone the server record lives in.
#[async_trait]
pub trait DnsApi: Send + Sync + 'static {
    /// Create or replace the record for `target` with `address` (A or AAAA by address family).
    async fn upsert_record(
        &self,
        target: &DnsTarget,
        address: TaskAddress,
    ) -> Result<DnsChange, CloudError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudErrorKind {
    AccessDenied,
    NotFound,
    Throttled,
    Validation,
    Unavailable,
    Other,
}

impl fmt::Display for CloudErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CloudErrorKind::AccessDenied => "access denied",
            CloudErrorKind::NotFound => "not found",
            CloudErrorKind::Throttled => "throttled",
            CloudErrorKind::Validation => "validation failed",
            CloudErrorKind::Unavailable => "unavailable",
            CloudErrorKind::Other => "error",
        })
    }
}

/// Error reported by a cloud API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{service}:{operation} {kind}: {message}")]
pub struct CloudError {
    pub service: &'static str,
    pub operation: &'static str,
    pub kind: CloudErrorKind,
    pub message: String,
}

impl CloudError {
    pub fn new(
        service: &'static str,
        operation: &'static str,
        kind: CloudErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            service,
            operation,
            kind,
            message: message.into(),
        }
    }

    /// Build an error whose kind is inferred from the provider's error code in `message`.
    pub fn classify(service: &'static str, operation: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = classify_message(&message);
        Self::new(service, operation, kind, message)
    }
}

fn classify_message(message: &str) -> CloudErrorKind {
    const RULES: &[(&str, CloudErrorKind)] = &[
        ("AccessDenied", CloudErrorKind::AccessDenied),
        ("UnauthorizedOperation", CloudErrorKind::AccessDenied),
        ("NotAuthorized", CloudErrorKind::AccessDenied),
        ("ExpiredToken", CloudErrorKind::AccessDenied),
        ("NotFound", CloudErrorKind::NotFound),
        ("NoSuchHostedZone", CloudErrorKind::NotFound),
        ("Throttl", CloudErrorKind::Throttled),
        ("TooManyRequests", CloudErrorKind::Throttled),
        ("PriorRequestNotComplete", CloudErrorKind::Throttled),
        ("ValidationException", CloudErrorKind::Validation),
        ("InvalidParameter", CloudErrorKind::Validation),
        ("InvalidInput", CloudErrorKind::Validation),
        ("InvalidChangeBatch", CloudErrorKind::Validation),
        ("ServiceUnavailable", CloudErrorKind::Unavailable),
        ("ServerException", CloudErrorKind::Unavailable),
    ];
    RULES
        .iter()
        .find(|(needle, _)| message.contains(needle))
        .map(|(_, kind)| *kind)
        .unwrap_or(CloudErrorKind::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_maps_provider_codes() {
        let cases = [
            ("An error occurred (AccessDeniedException) when calling", CloudErrorKind::AccessDenied),
            ("An error occurred (ServiceNotFoundException)", CloudErrorKind::NotFound),
            ("An error occurred (ClusterNotFoundException)", CloudErrorKind::NotFound),
            ("(ThrottlingException) Rate exceeded", CloudErrorKind::Throttled),
            ("(InvalidChangeBatch) bad value", CloudErrorKind::Validation),
            ("something odd", CloudErrorKind::Other),
        ];
        for (msg, kind) in cases {
            assert_eq!(CloudError::classify("ecs", "UpdateService", msg).kind, kind, "{msg}");
        }
    }

    #[test]
    fn display_names_the_call() {
        let e = CloudError::new("ecs", "UpdateService", CloudErrorKind::NotFound, "no service");
        assert_eq!(e.to_string(), "ecs:UpdateService not found: no service");
    }
}
