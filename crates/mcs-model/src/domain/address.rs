use std::{fmt, net::IpAddr, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Public address of the running replica. Changes on every start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskAddress(IpAddr);

impl TaskAddress {
    pub fn new(ip: IpAddr) -> Self {
        Self(ip)
    }

    pub fn ip(&self) -> IpAddr {
        self.0
    }

    pub fn is_ipv4(&self) -> bool {
        self.0.is_ipv4()
    }
}

impl FromStr for TaskAddress {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<IpAddr>()
            .map(Self)
            .map_err(|_| ModelError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for TaskAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// ARN of a task started by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskArn(String);

impl TaskArn {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing task id, e.g. `0f3c…` from `arn:aws:ecs:…:task/cluster/0f3c…`.
    pub fn short_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl From<String> for TaskArn {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskArn {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for TaskArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of asking for the task address.
///
/// "No address yet" and "not running" are ordinary answers, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AddressLookup {
    /// No task is running and none is desired.
    NotRunning,
    /// A task exists (or is desired) but has no public address yet.
    Pending {
        #[serde(skip_serializing_if = "Option::is_none")]
        task: Option<TaskArn>,
    },
    /// The task is reachable at `address`.
    Ready { task: TaskArn, address: TaskAddress },
}

impl AddressLookup {
    pub fn address(&self) -> Option<TaskAddress> {
        match self {
            AddressLookup::Ready { address, .. } => Some(*address),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, AddressLookup::Ready { .. })
    }
}
