use mcs_model::ServerConfig;
use serde_json::json;
use tracing::debug;

use crate::{
    StackError, Template, budget, compute, gateway, ids, network, orchestration, storage,
    template::{get_att, reference, sub},
};

/// Validate `cfg` and build the full template.
pub fn synthesize(cfg: &ServerConfig) -> Result<Template, StackError> {
    cfg.validate()?;
    let cidrs = cfg.ingress_cidrs()?;
    let dns = cfg.dns_target();
    let stack = cfg.full_stack_name();
    let sizing = cfg.sizing();

    let mut t = Template::new(format!(
        "On-demand Minecraft server ({} tier, {})",
        cfg.server_size, sizing.description
    ));

    network::add_network(&mut t, &stack)?;
    network::add_security_group(&mut t, &cidrs, cfg.game_port)?;
    storage::add_backup_bucket(&mut t, &cfg.backup)?;
    compute::add_compute(&mut t, cfg)?;
    orchestration::add_state_machines(&mut t, &cfg.workflow, dns.as_ref())?;
    gateway::add_http_api(&mut t, &stack)?;
    if let Some(email) = &cfg.budget_email {
        budget::add_budget(&mut t, cfg.budget_amount, email)?;
    }

    let endpoint = format!("${{{}.ApiEndpoint}}", ids::API);
    t.output(
        "ApiEndpoint",
        "API endpoint to control server",
        get_att(ids::API, "ApiEndpoint"),
    );
    t.output(
        "StartCommand",
        "Command to start server",
        sub(&format!("curl -X POST {endpoint}/start")),
    );
    t.output(
        "StopCommand",
        "Command to stop server",
        sub(&format!("curl -X POST {endpoint}/stop")),
    );
    t.output(
        "StatusCommand",
        "Command to check server status",
        sub(&format!("curl {endpoint}/status")),
    );
    t.output(
        "BackupBucket",
        "S3 bucket for world backups",
        reference(ids::BUCKET),
    );
    t.output("ClusterName", "ECS cluster", reference(ids::CLUSTER));
    t.output(
        "ServiceName",
        "ECS service",
        get_att(ids::SERVICE, "Name"),
    );
    t.output(
        "ServerSize",
        "Server size configuration",
        json!(format!("{} ({})", cfg.server_size, sizing.description)),
    );
    if let Some(target) = &dns {
        t.output("DomainName", "Server DNS record", json!(target.domain_name));
    }

    debug!(stack = %stack, resources = t.resources.len(), "template synthesized");
    Ok(t)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn rendered(cfg: &ServerConfig) -> Value {
        let t = synthesize(cfg).unwrap();
        serde_json::from_str(&t.to_json_pretty().unwrap()).unwrap()
    }

    #[test]
    fn default_config_synthesizes() {
        let v = rendered(&ServerConfig::default());
        let resources = v["Resources"].as_object().unwrap();

        for id in [
            ids::VPC,
            ids::SECURITY_GROUP,
            ids::BUCKET,
            ids::CLUSTER,
            ids::SERVICE,
            ids::START_MACHINE,
            ids::STOP_MACHINE,
            ids::API,
        ] {
            assert!(resources.contains_key(id), "missing {id}");
        }
        assert!(!resources.contains_key(ids::BUDGET));
        assert!(v["Outputs"].get("DomainName").is_none());
        assert_eq!(v["Outputs"]["ServerSize"]["Value"], "small (1-5 players)");
    }

    #[test]
    fn nothing_runs_functions_or_nat() {
        let t = synthesize(&ServerConfig::default()).unwrap();
        assert_eq!(t.of_type("AWS::Lambda::Function").count(), 0);
        assert_eq!(t.of_type("AWS::EC2::NatGateway").count(), 0);
        assert_eq!(t.of_type("AWS::ECS::Service").count(), 1);
    }

    #[test]
    fn duplicate_ranges_collapse_to_one_rule() {
        let cfg = ServerConfig {
            allowed_cidrs: vec![
                "203.0.113.0/24".into(),
                "198.51.100.0/24".into(),
                "203.0.113.0/24".into(),
            ],
            ..ServerConfig::default()
        };
        let v = rendered(&cfg);
        let rules = v["Resources"][ids::SECURITY_GROUP]["Properties"]["SecurityGroupIngress"]
            .as_array()
            .unwrap();
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn default_ingress_is_open_to_all() {
        let v = rendered(&ServerConfig::default());
        let rules = &v["Resources"][ids::SECURITY_GROUP]["Properties"]["SecurityGroupIngress"];
        assert_eq!(rules.as_array().unwrap().len(), 1);
        assert_eq!(rules[0]["CidrIp"], "0.0.0.0/0");
        assert_eq!(rules[0]["FromPort"], 25565);
    }

    #[test]
    fn dns_enabled_wires_record_and_output() {
        let cfg = ServerConfig {
            enable_route53: true,
            hosted_zone_id: "Z0ABC".into(),
            domain_name: "mc.example.com".into(),
            ..ServerConfig::default()
        };
        let v = rendered(&cfg);
        let states = &v["Resources"][ids::START_MACHINE]["Properties"]["Definition"]["States"];
        assert!(states.get("UpdateDNS").is_some());
        assert_eq!(v["Outputs"]["DomainName"]["Value"], "mc.example.com");
    }

    #[test]
    fn budget_only_with_email() {
        let cfg = ServerConfig {
            budget_email: Some("owner@example.com".into()),
            budget_amount: 20.0,
            ..ServerConfig::default()
        };
        let t = synthesize(&cfg).unwrap();
        assert!(t.resource(ids::BUDGET).is_some());
    }

    #[test]
    fn invalid_config_is_refused() {
        let cfg = ServerConfig {
            enable_route53: true,
            allowed_cidrs: vec!["10.0.0.1/8".into()],
            ..ServerConfig::default()
        };
        match synthesize(&cfg) {
            Err(StackError::Config(e)) => assert!(e.issues().len() >= 3),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        let cfg = ServerConfig::default();
        let a = synthesize(&cfg).unwrap().to_json_pretty().unwrap();
        let b = synthesize(&cfg).unwrap().to_json_pretty().unwrap();
        assert_eq!(a, b);
    }
}
