use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Current state of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionStatus {
    /// Recorded, not yet picked up.
    Pending,
    /// Steps are executing.
    Running,
    /// All steps completed.
    Succeeded,
    /// A step returned an error or the run was canceled.
    Failed,
    /// The address did not show up within the configured bound.
    TimedOut,
}

impl ExecutionStatus {
    /// Returns `true` if the run won't transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded | ExecutionStatus::Failed | ExecutionStatus::TimedOut
        )
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Succeeded => "succeeded",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::TimedOut => "timedOut",
        }
    }
}

impl FromStr for ExecutionStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ExecutionStatus::Pending),
            "running" => Ok(ExecutionStatus::Running),
            "succeeded" => Ok(ExecutionStatus::Succeeded),
            "failed" => Ok(ExecutionStatus::Failed),
            "timedout" | "timed_out" | "timeout" => Ok(ExecutionStatus::TimedOut),
            _ => Err(ModelError::InvalidExecutionStatus(format!(
                "'{s}' (valid: pending, running, succeeded, failed, timedOut)"
            ))),
        }
    }
}
