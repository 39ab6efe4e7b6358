use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::{DnsOutcome, ExecutionId, ExecutionKind, ExecutionStatus, TaskAddress};

/// Detailed information about one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInfo {
    pub id: ExecutionId,
    pub kind: ExecutionKind,
    pub status: ExecutionStatus,
    /// Address polls performed so far.
    pub attempts: u32,
    #[serde(with = "time_serde")]
    pub created_at: SystemTime,
    #[serde(with = "time_serde")]
    pub updated_at: SystemTime,
    /// Resolved task address (start runs only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<TaskAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsOutcome>,
    /// Last error message (if status is Failed/TimedOut).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionInfo {
    pub fn new(id: ExecutionId, kind: ExecutionKind) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            kind,
            status: ExecutionStatus::Pending,
            attempts: 0,
            created_at: now,
            updated_at: now,
            address: None,
            dns: None,
            error: None,
        }
    }
}

mod time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let since_epoch = time
            .duration_since(UNIX_EPOCH)
            .map_err(serde::ser::Error::custom)?;
        since_epoch.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }
}
