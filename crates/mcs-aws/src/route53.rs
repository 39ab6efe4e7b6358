use async_trait::async_trait;
use mcs_core::{CloudError, DnsApi};
use mcs_model::{DnsChange, DnsTarget, TaskAddress};
use serde_json::{Value, json};
use tracing::debug;

use crate::{AwsCall, AwsCli, AwsError};

/// Route 53 hosted zones, reached through the CLI.
pub struct Route53Zone<C = AwsCli> {
    cli: C,
}

impl<C: AwsCall> Route53Zone<C> {
    pub fn new(cli: C) -> Self {
        Self { cli }
    }
}

#[async_trait]
impl<C: AwsCall> DnsApi for Route53Zone<C> {
    async fn upsert_record(
        &self,
        target: &DnsTarget,
        address: TaskAddress,
    ) -> Result<DnsChange, CloudError> {
        let batch = change_batch(target, address);
        let args = [
            "--hosted-zone-id".to_string(),
            target.hosted_zone_id.clone(),
            "--change-batch".to_string(),
            batch.to_string(),
        ];
        let resp = self
            .cli
            .call("route53", "change-resource-record-sets", &args)
            .await?;

        let change_id = change_id(&resp)?;
        debug!(zone = %target.hosted_zone_id, %change_id, "change submitted");
        Ok(DnsChange {
            change_id,
            record: target.domain_name.clone(),
            address,
        })
    }
}

fn record_type(address: TaskAddress) -> &'static str {
    if address.is_ipv4() { "A" } else { "AAAA" }
}

/// Single-change UPSERT batch pointing `target` at `address`.
fn change_batch(target: &DnsTarget, address: TaskAddress) -> Value {
    json!({
        "Comment": "game server address",
        "Changes": [{
            "Action": "UPSERT",
            "ResourceRecordSet": {
                "Name": target.domain_name,
                "Type": record_type(address),
                "TTL": target.ttl,
                "ResourceRecords": [{ "Value": address.to_string() }]
            }
        }]
    })
}

fn change_id(resp: &Value) -> Result<String, AwsError> {
    resp["ChangeInfo"]["Id"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            AwsError::decode("route53", "change-resource-record-sets", "missing ChangeInfo.Id")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::scripted::ScriptedCli;

    fn target() -> DnsTarget {
        DnsTarget {
            hosted_zone_id: "Z0123456789".into(),
            domain_name: "mc.example.net".into(),
            ttl: 60,
        }
    }

    #[test]
    fn batch_is_a_single_upsert() {
        let batch = change_batch(&target(), "18.1.2.3".parse().unwrap());
        let changes = batch["Changes"].as_array().unwrap();
        assert_eq!(changes.len(), 1);

        let rrs = &changes[0]["ResourceRecordSet"];
        assert_eq!(changes[0]["Action"], "UPSERT");
        assert_eq!(rrs["Name"], "mc.example.net");
        assert_eq!(rrs["Type"], "A");
        assert_eq!(rrs["TTL"], 60);
        assert_eq!(rrs["ResourceRecords"][0]["Value"], "18.1.2.3");
    }

    #[test]
    fn ipv6_gets_aaaa() {
        let batch = change_batch(&target(), "2600:1f18::5".parse().unwrap());
        assert_eq!(batch["Changes"][0]["ResourceRecordSet"]["Type"], "AAAA");
    }

    #[tokio::test]
    async fn upsert_returns_change_id() {
        let cli = ScriptedCli::new().respond(serde_json::json!({
            "ChangeInfo": { "Id": "/change/C2682N5HXP0BZ4", "Status": "PENDING" }
        }));
        let zone = Route53Zone::new(cli);

        let change = zone
            .upsert_record(&target(), "18.1.2.3".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(change.change_id, "/change/C2682N5HXP0BZ4");
        assert_eq!(change.record, "mc.example.net");

        let calls = zone.cli.calls();
        let args = &calls[0].2;
        assert_eq!(args[0..2], ["--hosted-zone-id", "Z0123456789"]);
        let sent: Value = serde_json::from_str(&args[3]).unwrap();
        assert_eq!(sent["Changes"][0]["Action"], "UPSERT");
    }

    #[tokio::test]
    async fn missing_change_id_is_an_error() {
        let zone = Route53Zone::new(ScriptedCli::new().respond(serde_json::json!({})));
        assert!(
            zone.upsert_record(&target(), "18.1.2.3".parse().unwrap())
                .await
                .is_err()
        );
    }
}
