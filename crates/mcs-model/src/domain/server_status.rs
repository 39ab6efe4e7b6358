use serde::{Deserialize, Serialize};

use crate::DesiredCount;

/// Coarse server state derived from the desired count and the tasks actually running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl ServerStatus {
    pub fn derive(desired: DesiredCount, running_tasks: usize) -> Self {
        match (desired.is_running(), running_tasks) {
            (false, 0) => ServerStatus::Stopped,
            (false, _) => ServerStatus::Stopping,
            (true, 0) => ServerStatus::Starting,
            (true, _) => ServerStatus::Running,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Stopped => "stopped",
            ServerStatus::Starting => "starting",
            ServerStatus::Running => "running",
            ServerStatus::Stopping => "stopping",
        }
    }
}
