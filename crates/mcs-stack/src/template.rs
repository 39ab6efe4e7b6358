use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};

use crate::StackError;

const FORMAT_VERSION: &str = "2010-09-09";

/// Logical ids of the resources the template declares.
pub mod ids {
    pub const VPC: &str = "MinecraftVpc";
    pub const IGW: &str = "MinecraftInternetGateway";
    pub const IGW_ATTACHMENT: &str = "MinecraftInternetGatewayAttachment";
    pub const ROUTE_TABLE: &str = "MinecraftPublicRouteTable";
    pub const DEFAULT_ROUTE: &str = "MinecraftPublicDefaultRoute";
    pub const SUBNETS: [&str; 2] = ["MinecraftPublicSubnet1", "MinecraftPublicSubnet2"];
    pub const SUBNET_ROUTES: [&str; 2] = [
        "MinecraftPublicSubnet1RouteTableAssociation",
        "MinecraftPublicSubnet2RouteTableAssociation",
    ];
    pub const SECURITY_GROUP: &str = "MinecraftSecurityGroup";

    pub const BUCKET: &str = "MinecraftBackups";

    pub const CLUSTER: &str = "MinecraftCluster";
    pub const CAPACITY_PROVIDERS: &str = "MinecraftClusterCapacityProviders";
    pub const LOG_GROUP: &str = "MinecraftLogGroup";
    pub const EXECUTION_ROLE: &str = "TaskExecutionRole";
    pub const TASK_ROLE: &str = "TaskRole";
    pub const TASK_DEFINITION: &str = "MinecraftTask";
    pub const SERVICE: &str = "MinecraftService";

    pub const WORKFLOW_ROLE: &str = "ServerWorkflowRole";
    pub const START_MACHINE: &str = "StartServerStateMachine";
    pub const STOP_MACHINE: &str = "StopServerStateMachine";
    pub const STATUS_MACHINE: &str = "ServerStatusStateMachine";

    pub const API: &str = "MinecraftApi";
    pub const API_ROLE: &str = "MinecraftApiRole";
    pub const API_STAGE: &str = "MinecraftApiDefaultStage";
    pub const API_START: &str = "MinecraftApiStartIntegration";
    pub const API_STOP: &str = "MinecraftApiStopIntegration";
    pub const API_STATUS: &str = "MinecraftApiStatusIntegration";

    pub const BUDGET: &str = "MinecraftBudget";
}

/// A CloudFormation template. Maps are ordered so rendering is deterministic.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: &'static str,
    pub description: String,
    pub resources: BTreeMap<String, Resource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub kind: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub description: String,
    pub value: Value,
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            description: description.into(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, id: &str, resource: Resource) -> Result<(), StackError> {
        if self.resources.contains_key(id) {
            return Err(StackError::DuplicateResource(id.to_string()));
        }
        self.resources.insert(id.to_string(), resource);
        Ok(())
    }

    pub fn output(&mut self, id: &str, description: impl Into<String>, value: Value) {
        self.outputs.insert(
            id.to_string(),
            Output {
                description: description.into(),
                value,
            },
        );
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Logical ids and resources of one CloudFormation type.
    pub fn of_type<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = (&'a str, &'a Resource)> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.kind == kind)
            .map(|(id, r)| (id.as_str(), r))
    }

    pub fn to_json_pretty(&self) -> Result<String, StackError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Resource {
    pub fn new(kind: &str, properties: Value) -> Self {
        Self {
            kind: kind.to_string(),
            properties,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    pub fn depends_on(mut self, id: &str) -> Self {
        self.depends_on.push(id.to_string());
        self
    }

    /// Keep the physical resource when the stack is deleted or the resource replaced.
    pub fn retained(mut self) -> Self {
        self.deletion_policy = Some("Retain");
        self.update_replace_policy = Some("Retain");
        self
    }
}

pub(crate) fn reference(id: &str) -> Value {
    json!({ "Ref": id })
}

pub(crate) fn get_att(id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id, attribute] })
}

pub(crate) fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

pub(crate) fn availability_zone(index: usize) -> Value {
    json!({ "Fn::Select": [index, { "Fn::GetAZs": "" }] })
}

/// Trust policy letting `service` assume a role.
pub(crate) fn assume_role(service: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": service },
            "Action": "sts:AssumeRole"
        }]
    })
}

pub(crate) fn policy(name: &str, statements: Vec<Value>) -> Value {
    json!({
        "PolicyName": name,
        "PolicyDocument": { "Version": "2012-10-17", "Statement": statements }
    })
}

pub(crate) fn allow(actions: &[&str], resources: Value) -> Value {
    json!({ "Effect": "Allow", "Action": actions, "Resource": resources })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut t = Template::new("t");
        t.add("A", Resource::new("AWS::SNS::Topic", json!({}))).unwrap();
        assert!(matches!(
            t.add("A", Resource::new("AWS::SNS::Topic", json!({}))),
            Err(StackError::DuplicateResource(id)) if id == "A"
        ));
    }

    #[test]
    fn optional_keys_are_omitted() {
        let mut t = Template::new("demo");
        t.add("Topic", Resource::new("AWS::SNS::Topic", json!({}))).unwrap();
        t.add(
            "Bucket",
            Resource::new("AWS::S3::Bucket", json!({})).retained().depends_on("Topic"),
        )
        .unwrap();

        let v: Value = serde_json::from_str(&t.to_json_pretty().unwrap()).unwrap();
        assert_eq!(v["AWSTemplateFormatVersion"], FORMAT_VERSION);
        assert!(v.get("Outputs").is_none());
        assert!(v["Resources"]["Topic"].get("DependsOn").is_none());
        assert_eq!(v["Resources"]["Bucket"]["DeletionPolicy"], "Retain");
        assert_eq!(v["Resources"]["Bucket"]["DependsOn"][0], "Topic");
    }
}
