use async_trait::async_trait;
use mcs_core::{CloudError, ClusterApi};
use mcs_model::{DesiredCount, TaskAddress, TaskArn};
use serde_json::Value;
use tracing::debug;

use crate::{AwsCall, AwsCli, AwsError};

const ENI_ATTACHMENT: &str = "ElasticNetworkInterface";

/// One ECS service, addressed by cluster and service name.
pub struct EcsService<C = AwsCli> {
    cli: C,
    cluster: String,
    service: String,
}

impl<C: AwsCall> EcsService<C> {
    pub fn new(cli: C, cluster: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            cli,
            cluster: cluster.into(),
            service: service.into(),
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    async fn network_interface(&self, task: &TaskArn) -> Result<Option<String>, AwsError> {
        let args = [
            "--cluster".to_string(),
            self.cluster.clone(),
            "--tasks".to_string(),
            task.as_str().to_string(),
        ];
        let resp = self.cli.call("ecs", "describe-tasks", &args).await?;
        Ok(eni_id(&resp))
    }

    async fn public_ip(&self, eni: &str) -> Result<Option<TaskAddress>, AwsError> {
        let args = [
            "--network-interface-ids".to_string(),
            eni.to_string(),
        ];
        let resp = self
            .cli
            .call("ec2", "describe-network-interfaces", &args)
            .await?;
        public_ip(&resp)
    }
}

#[async_trait]
impl<C: AwsCall> ClusterApi for EcsService<C> {
    async fn set_desired_count(&self, count: DesiredCount) -> Result<(), CloudError> {
        let args = [
            "--cluster".to_string(),
            self.cluster.clone(),
            "--service".to_string(),
            self.service.clone(),
            "--desired-count".to_string(),
            count.to_string(),
        ];
        self.cli.call("ecs", "update-service", &args).await?;
        debug!(cluster = %self.cluster, service = %self.service, %count, "service updated");
        Ok(())
    }

    async fn desired_count(&self) -> Result<DesiredCount, CloudError> {
        let args = [
            "--cluster".to_string(),
            self.cluster.clone(),
            "--services".to_string(),
            self.service.clone(),
        ];
        let resp = self.cli.call("ecs", "describe-services", &args).await?;
        Ok(desired_count(&resp)?)
    }

    async fn running_tasks(&self) -> Result<Vec<TaskArn>, CloudError> {
        let args = [
            "--cluster".to_string(),
            self.cluster.clone(),
            "--service-name".to_string(),
            self.service.clone(),
            "--desired-status".to_string(),
            "RUNNING".to_string(),
        ];
        let resp = self.cli.call("ecs", "list-tasks", &args).await?;
        Ok(task_arns(&resp)?)
    }

    async fn task_address(&self, task: &TaskArn) -> Result<Option<TaskAddress>, CloudError> {
        let Some(eni) = self.network_interface(task).await? else {
            debug!(task = task.short_id(), "no network interface attached yet");
            return Ok(None);
        };
        Ok(self.public_ip(&eni).await?)
    }
}

fn desired_count(resp: &Value) -> Result<DesiredCount, AwsError> {
    const OP: &str = "describe-services";

    if let Some(failure) = resp["failures"].as_array().and_then(|f| f.first()) {
        let arn = failure["arn"].as_str().unwrap_or("service");
        let reason = failure["reason"].as_str().unwrap_or("unknown");
        return Err(AwsError::NotFound {
            service: "ecs",
            operation: OP,
            what: format!("{arn} ({reason})"),
        });
    }

    let raw = resp["services"][0]["desiredCount"]
        .as_i64()
        .ok_or_else(|| AwsError::decode("ecs", OP, "missing services[0].desiredCount"))?;
    DesiredCount::try_from(raw).map_err(|e| AwsError::decode("ecs", OP, e.to_string()))
}

fn task_arns(resp: &Value) -> Result<Vec<TaskArn>, AwsError> {
    let arns = resp["taskArns"]
        .as_array()
        .ok_or_else(|| AwsError::decode("ecs", "list-tasks", "missing taskArns"))?;
    Ok(arns
        .iter()
        .filter_map(Value::as_str)
        .map(TaskArn::from)
        .collect())
}

/// Id of the task's elastic network interface, once the attachment reports it.
fn eni_id(resp: &Value) -> Option<String> {
    resp["tasks"][0]["attachments"]
        .as_array()?
        .iter()
        .filter(|a| a["type"] == ENI_ATTACHMENT)
        .flat_map(|a| a["details"].as_array().into_iter().flatten())
        .find(|d| d["name"] == "networkInterfaceId")
        .and_then(|d| d["value"].as_str())
        .map(str::to_string)
}

/// Public address from the interface's association; `None` until one is assigned.
fn public_ip(resp: &Value) -> Result<Option<TaskAddress>, AwsError> {
    match resp["NetworkInterfaces"][0]["Association"]["PublicIp"].as_str() {
        None => Ok(None),
        Some(ip) => ip
            .parse()
            .map(Some)
            .map_err(|e: mcs_model::ModelError| {
                AwsError::decode("ec2", "describe-network-interfaces", e.to_string())
            }),
    }
}
