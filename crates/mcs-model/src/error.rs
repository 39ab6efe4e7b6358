use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("desired count must be 0 or 1, got {0}")]
    InvalidDesiredCount(i64),
    #[error("unknown server size: {0} (expected: small|medium|large)")]
    UnknownServerSize(String),
    #[error("invalid CIDR '{value}': {reason}")]
    InvalidCidr { value: String, reason: &'static str },
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid execution kind: {0} (expected: start|stop)")]
    InvalidExecutionKind(String),
    #[error("invalid execution status: {0}")]
    InvalidExecutionStatus(String),
    #[error("timestamp formatting failed: {0}")]
    Timestamp(String),
}
