use serde::{Deserialize, Serialize};

use crate::TaskAddress;

/// Accepted change to the server's DNS record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsChange {
    /// Change id returned by the DNS service.
    pub change_id: String,
    /// Record name that was upserted.
    pub record: String,
    pub address: TaskAddress,
}

/// Result of the DNS reconciliation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "dns", rename_all = "camelCase")]
pub enum DnsOutcome {
    /// DNS integration is switched off; nothing was sent.
    Disabled,
    Updated(DnsChange),
}
