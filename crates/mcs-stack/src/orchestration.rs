//! Start, stop and status state machines.
//!
//! Each step is a direct SDK integration, so no functions are deployed. The start machine
//! polls for the task address in an explicit loop; delays are precomputed from the workflow
//! settings because the states language has no multiplication.

use mcs_model::{DnsTarget, WorkflowConfig};
use serde_json::{Map, Value, json};

use crate::{
    Resource, StackError, Template, ids,
    template::{allow, assume_role, get_att, policy, reference},
};

const SDK: &str = "arn:aws:states:::aws-sdk";
const ADDRESS_PATH: &str = "$.eni.interfaces[0].Association.PublicIp";

fn task(api: &str, parameters: Value) -> Map<String, Value> {
    let mut state = Map::new();
    state.insert("Type".into(), json!("Task"));
    state.insert("Resource".into(), json!(format!("{SDK}:{api}")));
    state.insert("Parameters".into(), parameters);
    state
}

fn with(mut state: Map<String, Value>, key: &str, value: Value) -> Value {
    state.insert(key.into(), value);
    Value::Object(state)
}

fn update_service(desired: u8) -> Map<String, Value> {
    task(
        "ecs:updateService",
        json!({ "Cluster": "${Cluster}", "Service": "${Service}", "DesiredCount": desired }),
    )
}

/// Seconds to wait after each unsuccessful poll, the same delays the local runner sleeps.
pub(crate) fn poll_delays(wf: &WorkflowConfig) -> Vec<u64> {
    (0..wf.max_attempts)
        .map(|n| wf.poll_delay(n).as_secs())
        .collect()
}

/// Start machine: scale to one, wait, poll for the address, publish DNS, succeed.
pub(crate) fn start_definition(wf: &WorkflowConfig, dns: Option<&DnsTarget>) -> Value {
    let after_address = if dns.is_some() { "UpdateDNS" } else { "ServerReady" };

    let mut states = Map::new();
    let mut start = update_service(1);
    start.insert("ResultPath".into(), Value::Null);
    states.insert("StartTask".into(), with(start, "Next", json!("InitPoll")));
    states.insert(
        "InitPoll".into(),
        json!({
            "Type": "Pass",
            "Result": { "attempt": 0, "delays": poll_delays(wf) },
            "ResultPath": "$.poll",
            "Next": "WaitForTask"
        }),
    );
    states.insert(
        "WaitForTask".into(),
        json!({ "Type": "Wait", "Seconds": wf.initial_wait_secs, "Next": "ListTasks" }),
    );

    let mut list = task(
        "ecs:listTasks",
        json!({ "Cluster": "${Cluster}", "ServiceName": "${Service}", "DesiredStatus": "RUNNING" }),
    );
    list.insert("ResultSelector".into(), json!({ "taskArns.$": "$.TaskArns" }));
    list.insert("ResultPath".into(), json!("$.tasks"));
    states.insert("ListTasks".into(), with(list, "Next", json!("HasTask")));
    states.insert(
        "HasTask".into(),
        choice("$.tasks.taskArns[0]", "DescribeTask"),
    );

    let mut describe = task(
        "ecs:describeTasks",
        json!({ "Cluster": "${Cluster}", "Tasks.$": "$.tasks.taskArns" }),
    );
    describe.insert(
        "ResultSelector".into(),
        json!({
            "eniIds.$": "$.Tasks[0].Attachments[?(@.Type == 'ElasticNetworkInterface')].Details[?(@.Name == 'networkInterfaceId')].Value"
        }),
    );
    describe.insert("ResultPath".into(), json!("$.task"));
    states.insert("DescribeTask".into(), with(describe, "Next", json!("HasInterface")));
    states.insert("HasInterface".into(), choice("$.task.eniIds[0]", "GetIP"));

    let mut get_ip = task(
        "ec2:describeNetworkInterfaces",
        json!({ "NetworkInterfaceIds.$": "$.task.eniIds" }),
    );
    get_ip.insert(
        "ResultSelector".into(),
        json!({ "interfaces.$": "$.NetworkInterfaces" }),
    );
    get_ip.insert("ResultPath".into(), json!("$.eni"));
    states.insert("GetIP".into(), with(get_ip, "Next", json!("HasAddress")));
    states.insert("HasAddress".into(), choice(ADDRESS_PATH, after_address));

    states.insert(
        "CountAttempt".into(),
        json!({
            "Type": "Pass",
            "Parameters": {
                "attempt.$": "States.MathAdd($.poll.attempt, 1)",
                "delays.$": "$.poll.delays",
                "delay.$": "States.ArrayGetItem($.poll.delays, $.poll.attempt)"
            },
            "ResultPath": "$.poll",
            "Next": "AttemptsLeft"
        }),
    );
    states.insert(
        "AttemptsLeft".into(),
        json!({
            "Type": "Choice",
            "Choices": [{
                "Variable": "$.poll.attempt",
                "NumericGreaterThanEquals": wf.max_attempts,
                "Next": "AddressTimeout"
            }],
            "Default": "PollWait"
        }),
    );
    states.insert(
        "PollWait".into(),
        json!({ "Type": "Wait", "SecondsPath": "$.poll.delay", "Next": "ListTasks" }),
    );
    states.insert(
        "AddressTimeout".into(),
        json!({
            "Type": "Fail",
            "Error": "AddressTimeout",
            "Cause": format!("no public address after {} attempts", wf.max_attempts)
        }),
    );

    if let Some(target) = dns {
        let mut change = task(
            "route53:changeResourceRecordSets",
            json!({
                "HostedZoneId": target.hosted_zone_id,
                "ChangeBatch": {
                    "Changes": [{
                        "Action": "UPSERT",
                        "ResourceRecordSet": {
                            "Name": target.domain_name,
                            "Type": "A",
                            "TTL": target.ttl,
                            "ResourceRecords": [{ "Value.$": ADDRESS_PATH }]
                        }
                    }]
                }
            }),
        );
        change.insert("ResultPath".into(), json!("$.dns"));
        states.insert("UpdateDNS".into(), with(change, "Next", json!("ServerReady")));
    }

    states.insert(
        "ServerReady".into(),
        json!({
            "Type": "Pass",
            "Parameters": {
                "publicIp.$": ADDRESS_PATH,
                "taskArn.$": "$.tasks.taskArns[0]"
            },
            "End": true
        }),
    );

    json!({
        "Comment": "Start the game server and publish its address",
        "StartAt": "StartTask",
        "TimeoutSeconds": wf.timeout_secs,
        "States": states
    })
}

fn choice(present: &str, next: &str) -> Value {
    json!({
        "Type": "Choice",
        "Choices": [{ "Variable": present, "IsPresent": true, "Next": next }],
        "Default": "CountAttempt"
    })
}

/// Stop machine: scale to zero. Backups are not taken here.
pub(crate) fn stop_definition(wf: &WorkflowConfig) -> Value {
    json!({
        "Comment": "Stop the game server",
        "StartAt": "StopTask",
        "TimeoutSeconds": wf.timeout_secs,
        "States": {
            "StopTask": with(update_service(0), "Next", json!("ServerStopped")),
            "ServerStopped": { "Type": "Succeed" }
        }
    })
}

/// Express machine answering `/status` synchronously.
pub(crate) fn status_definition() -> Value {
    let mut list = task(
        "ecs:listTasks",
        json!({ "Cluster": "${Cluster}", "ServiceName": "${Service}", "DesiredStatus": "RUNNING" }),
    );
    list.insert("ResultSelector".into(), json!({ "taskArns.$": "$.TaskArns" }));
    json!({
        "Comment": "Report whether the game server is running",
        "StartAt": "ListTasks",
        "States": {
            "ListTasks": with(list, "Next", json!("IsRunning")),
            "IsRunning": {
                "Type": "Choice",
                "Choices": [{ "Variable": "$.taskArns[0]", "IsPresent": true, "Next": "Running" }],
                "Default": "Stopped"
            },
            "Running": {
                "Type": "Pass",
                "Parameters": {
                    "status": "running",
                    "taskCount.$": "States.ArrayLength($.taskArns)"
                },
                "End": true
            },
            "Stopped": { "Type": "Pass", "Result": { "status": "stopped" }, "End": true }
        }
    })
}

pub(crate) fn add_state_machines(
    t: &mut Template,
    wf: &WorkflowConfig,
    dns: Option<&DnsTarget>,
) -> Result<(), StackError> {
    let mut statements = vec![
        allow(&["ecs:UpdateService"], reference(ids::SERVICE)),
        allow(&["ecs:ListTasks", "ecs:DescribeTasks"], json!("*")),
        allow(&["ec2:DescribeNetworkInterfaces"], json!("*")),
    ];
    if let Some(target) = dns {
        statements.push(allow(
            &["route53:ChangeResourceRecordSets"],
            json!(format!("arn:aws:route53:::hostedzone/{}", target.hosted_zone_id)),
        ));
    }
    t.add(
        ids::WORKFLOW_ROLE,
        Resource::new(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": assume_role("states.amazonaws.com"),
                "Policies": [policy("ServerWorkflow", statements)]
            }),
        ),
    )?;

    let machines = [
        (ids::START_MACHINE, "STANDARD", start_definition(wf, dns)),
        (ids::STOP_MACHINE, "STANDARD", stop_definition(wf)),
        (ids::STATUS_MACHINE, "EXPRESS", status_definition()),
    ];
    for (id, kind, definition) in machines {
        t.add(
            id,
            Resource::new(
                "AWS::StepFunctions::StateMachine",
                json!({
                    "StateMachineType": kind,
                    "RoleArn": get_att(ids::WORKFLOW_ROLE, "Arn"),
                    "Definition": definition,
                    "DefinitionSubstitutions": {
                        "Cluster": reference(ids::CLUSTER),
                        "Service": get_att(ids::SERVICE, "Name")
                    }
                }),
            ),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dns() -> DnsTarget {
        DnsTarget {
            hosted_zone_id: "Z42".into(),
            domain_name: "mc.example.com".into(),
            ttl: 60,
        }
    }

    #[test]
    fn start_carries_workflow_parameters() {
        let wf = WorkflowConfig::default();
        let def = start_definition(&wf, None);

        assert_eq!(def["TimeoutSeconds"], 600);
        assert_eq!(def["States"]["WaitForTask"]["Seconds"], 30);
        assert_eq!(def["States"]["AttemptsLeft"]["Choices"][0]["NumericGreaterThanEquals"], 20);
        assert_eq!(def["States"]["StartTask"]["Parameters"]["DesiredCount"], 1);
        assert_eq!(
            def["States"]["InitPoll"]["Result"]["delays"].as_array().unwrap().len(),
            20
        );
    }

    #[test]
    fn delays_follow_backoff() {
        let wf = WorkflowConfig {
            poll_interval_secs: 5,
            backoff_rate: 2.0,
            max_attempts: 4,
            ..WorkflowConfig::default()
        };
        assert_eq!(poll_delays(&wf), vec![5, 10, 20, 40]);
    }

    #[test]
    fn fractional_delays_match_local_runner() {
        let wf = WorkflowConfig {
            poll_interval_secs: 5,
            backoff_rate: 1.5,
            max_attempts: 4,
            ..WorkflowConfig::default()
        };
        let local: Vec<u64> = (0..4).map(|n| wf.poll_delay(n).as_secs()).collect();
        assert_eq!(poll_delays(&wf), local);
        assert_eq!(poll_delays(&wf), vec![5, 8, 11, 17]);
    }

    #[test]
    fn dns_step_only_when_enabled() {
        let wf = WorkflowConfig::default();

        let without = start_definition(&wf, None);
        assert!(without["States"].get("UpdateDNS").is_none());
        assert_eq!(without["States"]["HasAddress"]["Choices"][0]["Next"], "ServerReady");

        let target = dns();
        let with_dns = start_definition(&wf, Some(&target));
        let step = &with_dns["States"]["UpdateDNS"];
        assert_eq!(step["Resource"], "arn:aws:states:::aws-sdk:route53:changeResourceRecordSets");
        assert_eq!(step["Parameters"]["HostedZoneId"], "Z42");
        let rrs = &step["Parameters"]["ChangeBatch"]["Changes"][0]["ResourceRecordSet"];
        assert_eq!(rrs["Name"], "mc.example.com");
        assert_eq!(rrs["TTL"], 60);
        assert_eq!(with_dns["States"]["HasAddress"]["Choices"][0]["Next"], "UpdateDNS");
    }

    #[test]
    fn every_transition_targets_a_state() {
        let target = dns();
        let def = start_definition(&WorkflowConfig::default(), Some(&target));
        let states = def["States"].as_object().unwrap();

        for (name, state) in states {
            let mut targets: Vec<&str> = Vec::new();
            for key in ["Next", "Default"] {
                if let Some(next) = state[key].as_str() {
                    targets.push(next);
                }
            }
            if let Some(choices) = state["Choices"].as_array() {
                targets.extend(choices.iter().filter_map(|c| c["Next"].as_str()));
            }
            for next in targets {
                assert!(states.contains_key(next), "{name} -> {next}");
            }
        }
        assert!(states.contains_key(def["StartAt"].as_str().unwrap()));
    }

    #[test]
    fn stop_scales_to_zero() {
        let def = stop_definition(&WorkflowConfig::default());
        assert_eq!(def["States"]["StopTask"]["Parameters"]["DesiredCount"], 0);
        assert_eq!(def["States"]["StopTask"]["Next"], "ServerStopped");
    }

    #[test]
    fn zone_permission_follows_dns_setting() {
        let wf = WorkflowConfig::default();

        let mut off = Template::new("t");
        add_state_machines(&mut off, &wf, None).unwrap();
        let policy = off.resource(ids::WORKFLOW_ROLE).unwrap().properties.to_string();
        assert!(!policy.contains("route53"));

        let target = dns();
        let mut on = Template::new("t");
        add_state_machines(&mut on, &wf, Some(&target)).unwrap();
        let policy = on.resource(ids::WORKFLOW_ROLE).unwrap().properties.to_string();
        assert!(policy.contains("hostedzone/Z42"));
        assert_eq!(on.of_type("AWS::StepFunctions::StateMachine").count(), 3);
    }
}
