use std::time::Duration;

use mcs_core::{CloudError, CloudErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AwsError {
    #[error("failed to run aws cli: {0}")]
    Spawn(String),

    #[error("aws {service} {operation} timed out after {timeout:?}")]
    TimedOut {
        service: &'static str,
        operation: &'static str,
        timeout: Duration,
    },

    #[error("aws {service} {operation} exited with {code:?}: {stderr}")]
    Failed {
        service: &'static str,
        operation: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error("aws {service} {operation}: {what} not found")]
    NotFound {
        service: &'static str,
        operation: &'static str,
        what: String,
    },

    #[error("aws {service} {operation}: unreadable response: {reason}")]
    Decode {
        service: &'static str,
        operation: &'static str,
        reason: String,
    },
}

impl AwsError {
    pub(crate) fn decode(
        service: &'static str,
        operation: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        AwsError::Decode {
            service,
            operation,
            reason: reason.into(),
        }
    }
}

impl From<AwsError> for CloudError {
    fn from(e: AwsError) -> Self {
        let message = e.to_string();
        match e {
            AwsError::Spawn(_) => {
                CloudError::new("aws", "exec", CloudErrorKind::Unavailable, message)
            }
            AwsError::TimedOut {
                service, operation, ..
            } => CloudError::new(service, operation, CloudErrorKind::Unavailable, message),
            AwsError::Failed {
                service,
                operation,
                stderr,
                ..
            } => CloudError::classify(service, operation, stderr),
            AwsError::NotFound {
                service, operation, ..
            } => CloudError::new(service, operation, CloudErrorKind::NotFound, message),
            AwsError::Decode {
                service, operation, ..
            } => CloudError::new(service, operation, CloudErrorKind::Other, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_call_is_classified_from_stderr() {
        let e = AwsError::Failed {
            service: "ecs",
            operation: "update-service",
            code: Some(254),
            stderr: "An error occurred (AccessDeniedException) when calling the UpdateService operation".into(),
        };
        let cloud = CloudError::from(e);
        assert_eq!(cloud.kind, CloudErrorKind::AccessDenied);
        assert_eq!(cloud.service, "ecs");
        assert!(cloud.message.contains("UpdateService"));
    }

    #[test]
    fn spawn_failure_is_unavailable() {
        let cloud = CloudError::from(AwsError::Spawn("No such file or directory".into()));
        assert_eq!(cloud.kind, CloudErrorKind::Unavailable);
    }
}
