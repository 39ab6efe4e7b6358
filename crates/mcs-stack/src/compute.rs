use mcs_model::{ContainerEnv, S3_BUCKET_VAR, ServerConfig, config::DEFAULT_CONTAINER_NAME};
use serde_json::{Value, json};

use crate::{
    Resource, StackError, Template, ids, network,
    storage::bucket_arns,
    template::{allow, assume_role, get_att, policy, reference, sub},
};

/// Retention periods CloudWatch Logs accepts.
const LOG_RETENTION_DAYS: &[u32] = &[
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

const TASK_EXECUTION_POLICY: &str =
    "arn:${AWS::Partition}:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy";

/// Smallest accepted retention not shorter than `days`.
pub(crate) fn log_retention(days: u32) -> u32 {
    LOG_RETENTION_DAYS
        .iter()
        .copied()
        .find(|&d| d >= days)
        .unwrap_or(3653)
}

pub(crate) fn add_compute(t: &mut Template, cfg: &ServerConfig) -> Result<(), StackError> {
    t.add(
        ids::CLUSTER,
        Resource::new(
            "AWS::ECS::Cluster",
            json!({ "ClusterSettings": [{ "Name": "containerInsights", "Value": "disabled" }] }),
        ),
    )?;
    t.add(
        ids::CAPACITY_PROVIDERS,
        Resource::new(
            "AWS::ECS::ClusterCapacityProviderAssociations",
            json!({
                "Cluster": reference(ids::CLUSTER),
                "CapacityProviders": ["FARGATE", "FARGATE_SPOT"],
                "DefaultCapacityProviderStrategy": spot_strategy()
            }),
        ),
    )?;
    t.add(
        ids::LOG_GROUP,
        Resource::new(
            "AWS::Logs::LogGroup",
            json!({ "RetentionInDays": log_retention(cfg.log_retention_days) }),
        ),
    )?;

    add_roles(t)?;
    add_task_definition(t, cfg)?;

    let desired = u8::from(cfg.start_on_deploy);
    t.add(
        ids::SERVICE,
        Resource::new(
            "AWS::ECS::Service",
            json!({
                "Cluster": reference(ids::CLUSTER),
                "TaskDefinition": reference(ids::TASK_DEFINITION),
                "DesiredCount": desired,
                "CapacityProviderStrategy": spot_strategy(),
                "EnableExecuteCommand": true,
                "DeploymentConfiguration": {
                    "MinimumHealthyPercent": 0,
                    "MaximumPercent": 100
                },
                "NetworkConfiguration": {
                    "AwsvpcConfiguration": {
                        "AssignPublicIp": "ENABLED",
                        "SecurityGroups": [network::security_group_id()],
                        "Subnets": network::subnet_refs()
                    }
                }
            }),
        )
        .depends_on(ids::CAPACITY_PROVIDERS)
        .depends_on(ids::DEFAULT_ROUTE),
    )
}

fn spot_strategy() -> Value {
    json!([{ "CapacityProvider": "FARGATE_SPOT", "Weight": 1 }])
}

fn add_roles(t: &mut Template) -> Result<(), StackError> {
    t.add(
        ids::EXECUTION_ROLE,
        Resource::new(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": assume_role("ecs-tasks.amazonaws.com"),
                "ManagedPolicyArns": [sub(TASK_EXECUTION_POLICY)]
            }),
        ),
    )?;

    let backups = allow(
        &[
            "s3:GetObject*",
            "s3:GetBucket*",
            "s3:List*",
            "s3:DeleteObject*",
            "s3:PutObject",
            "s3:PutObjectLegalHold",
            "s3:PutObjectRetention",
            "s3:PutObjectTagging",
            "s3:PutObjectVersionTagging",
            "s3:Abort*",
        ],
        bucket_arns(),
    );
    // execute-command sessions used for operator backups
    let exec = allow(
        &[
            "ssmmessages:CreateControlChannel",
            "ssmmessages:CreateDataChannel",
            "ssmmessages:OpenControlChannel",
            "ssmmessages:OpenDataChannel",
        ],
        json!("*"),
    );
    t.add(
        ids::TASK_ROLE,
        Resource::new(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": assume_role("ecs-tasks.amazonaws.com"),
                "Policies": [policy("BackupBucketAccess", vec![backups, exec])]
            }),
        ),
    )
}

fn container_environment(cfg: &ServerConfig) -> Result<Value, StackError> {
    let env = ContainerEnv::for_server(cfg);
    let mut entries = serde_json::to_value(env.resolved())?;
    if let Value::Array(items) = &mut entries {
        items.push(json!({ "Name": S3_BUCKET_VAR, "Value": reference(ids::BUCKET) }));
    }
    Ok(entries)
}

fn add_task_definition(t: &mut Template, cfg: &ServerConfig) -> Result<(), StackError> {
    let sizing = cfg.sizing();
    let container_name = if cfg.control.container.is_empty() {
        DEFAULT_CONTAINER_NAME
    } else {
        cfg.control.container.as_str()
    };

    t.add(
        ids::TASK_DEFINITION,
        Resource::new(
            "AWS::ECS::TaskDefinition",
            json!({
                "Family": cfg.full_stack_name(),
                "RequiresCompatibilities": ["FARGATE"],
                "NetworkMode": "awsvpc",
                "Cpu": sizing.cpu.to_string(),
                "Memory": sizing.memory_mib.to_string(),
                "ExecutionRoleArn": get_att(ids::EXECUTION_ROLE, "Arn"),
                "TaskRoleArn": get_att(ids::TASK_ROLE, "Arn"),
                "ContainerDefinitions": [{
                    "Name": container_name,
                    "Image": cfg.image,
                    "Essential": true,
                    "Environment": container_environment(cfg)?,
                    "PortMappings": [{ "ContainerPort": cfg.game_port, "Protocol": "tcp" }],
                    "LogConfiguration": {
                        "LogDriver": "awslogs",
                        "Options": {
                            "awslogs-group": reference(ids::LOG_GROUP),
                            "awslogs-region": reference("AWS::Region"),
                            "awslogs-stream-prefix": "minecraft"
                        }
                    }
                }]
            }),
        ),
    )
}

#[cfg(test)]
mod tests {
    use mcs_model::ServerSize;

    use super::*;

    fn synth(cfg: &ServerConfig) -> Template {
        let mut t = Template::new("t");
        add_compute(&mut t, cfg).unwrap();
        t
    }

    #[test]
    fn retention_rounds_up_to_accepted_value() {
        assert_eq!(log_retention(7), 7);
        assert_eq!(log_retention(8), 14);
        assert_eq!(log_retention(0), 1);
        assert_eq!(log_retention(10_000), 3653);
    }

    #[test]
    fn task_is_sized_by_tier() {
        for size in ServerSize::ALL {
            let cfg = ServerConfig {
                server_size: size,
                ..ServerConfig::default()
            };
            let t = synth(&cfg);
            let td = &t.resource(ids::TASK_DEFINITION).unwrap().properties;
            let sizing = size.sizing();
            assert_eq!(td["Cpu"], sizing.cpu.to_string());
            assert_eq!(td["Memory"], sizing.memory_mib.to_string());

            let env = td["ContainerDefinitions"][0]["Environment"].as_array().unwrap();
            let memory = env.iter().find(|e| e["Name"] == "MEMORY").unwrap();
            assert_eq!(memory["Value"], sizing.jvm_heap());
        }
    }

    #[test]
    fn environment_carries_defaults_variables_and_bucket() {
        let mut cfg = ServerConfig::default();
        cfg.variables.insert("DIFFICULTY".into(), "hard".into());
        cfg.variables.insert("VERSION".into(), "1.21.1".into());
        let t = synth(&cfg);

        let env = &t.resource(ids::TASK_DEFINITION).unwrap().properties["ContainerDefinitions"][0]
            ["Environment"];
        let get = |name: &str| {
            env.as_array()
                .unwrap()
                .iter()
                .filter(|e| e["Name"] == name)
                .map(|e| e["Value"].clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(get("EULA"), vec![json!("TRUE")]);
        assert_eq!(get("VERSION"), vec![json!("1.21.1")]);
        assert_eq!(get("DIFFICULTY"), vec![json!("hard")]);
        assert_eq!(get("S3_BUCKET"), vec![json!({ "Ref": ids::BUCKET })]);
    }

    #[test]
    fn service_starts_stopped_on_spot() {
        let t = synth(&ServerConfig::default());
        let svc = &t.resource(ids::SERVICE).unwrap().properties;
        assert_eq!(svc["DesiredCount"], 0);
        assert_eq!(svc["CapacityProviderStrategy"][0]["CapacityProvider"], "FARGATE_SPOT");
        assert_eq!(svc["DeploymentConfiguration"]["MaximumPercent"], 100);
        assert_eq!(
            svc["NetworkConfiguration"]["AwsvpcConfiguration"]["AssignPublicIp"],
            "ENABLED"
        );

        let running = synth(&ServerConfig {
            start_on_deploy: true,
            ..ServerConfig::default()
        });
        assert_eq!(
            running.resource(ids::SERVICE).unwrap().properties["DesiredCount"],
            1
        );
    }

    #[test]
    fn container_exposes_game_port() {
        let cfg = ServerConfig {
            game_port: 25570,
            ..ServerConfig::default()
        };
        let t = synth(&cfg);
        let c = &t.resource(ids::TASK_DEFINITION).unwrap().properties["ContainerDefinitions"][0];
        assert_eq!(c["PortMappings"][0]["ContainerPort"], 25570);
        assert_eq!(c["Image"], "itzg/minecraft-server");
        assert_eq!(c["Name"], DEFAULT_CONTAINER_NAME);
    }
}
