use std::sync::Arc;

use mcs_aws::{AwsCli, EcsService, Route53Zone};
use mcs_core::{Controller, WorkflowRunner};
use mcs_model::{ServerConfig, config::DEFAULT_CONTAINER_NAME};
use tracing::debug;

pub fn aws_cli(cfg: &ServerConfig, profile: Option<&str>) -> AwsCli {
    let cli = AwsCli::new(cfg.region());
    match profile {
        Some(p) => cli.with_profile(p),
        None => cli,
    }
}

pub fn ecs_service(cfg: &ServerConfig, aws: &AwsCli) -> anyhow::Result<EcsService> {
    let (cluster, service) = cfg.control_target()?;
    Ok(EcsService::new(aws.clone(), cluster, service))
}

/// Controller over the configured service, with DNS when the config enables it.
pub fn controller(cfg: &ServerConfig, aws: &AwsCli) -> anyhow::Result<Controller> {
    let ecs = ecs_service(cfg, aws)?;
    debug!(cluster = ecs.cluster(), service = ecs.service(), "control target");

    let controller = Controller::new(Arc::new(ecs));
    Ok(match cfg.dns_target() {
        Some(target) => {
            debug!(zone = %target.hosted_zone_id, record = %target.domain_name, "dns enabled");
            controller.with_dns(target, Arc::new(Route53Zone::new(aws.clone())))
        }
        None => controller,
    })
}

/// Workflow runner over the configured service. The config must validate first: the
/// runner sleeps the delays `[workflow]` describes.
pub fn runner(cfg: &ServerConfig, aws: &AwsCli) -> anyhow::Result<WorkflowRunner> {
    runner_over(cfg, controller(cfg, aws)?)
}

pub fn runner_over(cfg: &ServerConfig, controller: Controller) -> anyhow::Result<WorkflowRunner> {
    cfg.validate()?;
    Ok(WorkflowRunner::new(Arc::new(controller), cfg.workflow.clone()))
}

pub fn container_name(cfg: &ServerConfig) -> &str {
    if cfg.control.container.is_empty() {
        DEFAULT_CONTAINER_NAME
    } else {
        &cfg.control.container
    }
}

#[cfg(test)]
mod tests {
    use mcs_model::ControlConfig;

    use super::*;

    fn targeted() -> ServerConfig {
        ServerConfig {
            control: ControlConfig {
                cluster: Some("mc".into()),
                service: Some("mc-svc".into()),
                ..ControlConfig::default()
            },
            ..ServerConfig::default()
        }
    }

    #[test]
    fn controller_needs_control_target() {
        let cfg = ServerConfig::default();
        let aws = aws_cli(&cfg, None);
        let err = controller(&cfg, &aws).err().unwrap();
        assert!(err.to_string().contains("cluster"));
    }

    #[test]
    fn controller_picks_up_dns() {
        let cfg = ServerConfig {
            control: ControlConfig {
                cluster: Some("mc".into()),
                service: Some("mc-svc".into()),
                ..ControlConfig::default()
            },
            enable_route53: true,
            hosted_zone_id: "Z1".into(),
            domain_name: "mc.example.com".into(),
            ..ServerConfig::default()
        };
        let aws = aws_cli(&cfg, Some("games"));
        let c = controller(&cfg, &aws).unwrap();
        assert_eq!(c.dns_target().unwrap().domain_name, "mc.example.com");
    }

    #[test]
    fn runner_refuses_invalid_workflow() {
        let mut cfg = targeted();
        cfg.workflow.backoff_rate = -1.0;
        let aws = aws_cli(&cfg, None);
        let err = runner(&cfg, &aws).err().unwrap();
        assert!(err.to_string().contains("workflow.backoff_rate"), "{err}");
    }

    #[test]
    fn runner_builds_from_valid_config() {
        let cfg = targeted();
        let aws = aws_cli(&cfg, None);
        assert!(runner(&cfg, &aws).is_ok());
    }

    #[test]
    fn container_name_falls_back() {
        let mut cfg = ServerConfig::default();
        cfg.control.container.clear();
        assert_eq!(container_name(&cfg), DEFAULT_CONTAINER_NAME);
        cfg.control.container = "mc".into();
        assert_eq!(container_name(&cfg), "mc");
    }
}
