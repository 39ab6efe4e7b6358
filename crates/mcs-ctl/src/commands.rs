use std::fs;

use anyhow::{Context, bail};
use mcs_aws::AwsCli;
use mcs_core::ClusterApi;
use mcs_model::{ExecutionInfo, ExecutionStatus, ServerConfig, backup::BackupPlan};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use crate::{backend, cli::Command, serve};

pub async fn run(command: Command, cfg: ServerConfig, aws: AwsCli) -> anyhow::Result<()> {
    match command {
        Command::Validate => validate(&cfg),
        Command::Synth { out } => {
            let rendered = mcs_stack::synthesize(&cfg)?.to_json_pretty()?;
            match out {
                Some(path) => {
                    fs::write(&path, rendered)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), "template written");
                }
                None => println!("{rendered}"),
            }
            Ok(())
        }
        Command::Serve { listen } => serve::serve(&cfg, &aws, listen).await,
        Command::Start { wait: false } => print_json(&backend::controller(&cfg, &aws)?.start().await?),
        Command::Stop { wait: false } => print_json(&backend::controller(&cfg, &aws)?.stop().await?),
        Command::Start { wait: true } => {
            let info = backend::runner(&cfg, &aws)?.run_start().await;
            finish(&info)
        }
        Command::Stop { wait: true } => {
            let info = backend::runner(&cfg, &aws)?.run_stop().await;
            finish(&info)
        }
        Command::Status => print_json(&backend::controller(&cfg, &aws)?.status().await?),
        Command::GetIp => print_json(&backend::controller(&cfg, &aws)?.get_ip().await?),
        Command::UpdateDns { address } => {
            let controller = backend::controller(&cfg, &aws)?;
            if controller.dns_target().is_none() {
                bail!("DNS is disabled; set enable_route53, hosted_zone_id and domain_name");
            }
            print_json(&controller.update_dns(address).await?)
        }
        Command::BackupPlan => backup_plan(&cfg, &aws).await,
    }
}

fn finish(info: &ExecutionInfo) -> anyhow::Result<()> {
    print_json(info)?;
    if info.status != ExecutionStatus::Succeeded {
        bail!(
            "{} run {} ended {}: {}",
            info.kind,
            info.id,
            info.status.as_str(),
            info.error.as_deref().unwrap_or("no detail")
        );
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn validate(cfg: &ServerConfig) -> anyhow::Result<()> {
    cfg.validate()?;
    let sizing = cfg.sizing();
    println!("stack:    {} ({})", cfg.full_stack_name(), cfg.region());
    println!(
        "size:     {} ({}, {} vCPU units, {} MiB)",
        cfg.server_size, sizing.description, sizing.cpu, sizing.memory_mib
    );
    println!("image:    {} on port {}", cfg.image, cfg.game_port);
    println!("ingress:  {}", cfg.allowed_cidrs.join(", "));
    match cfg.dns_target() {
        Some(t) => println!("dns:      {} in {} (ttl {})", t.domain_name, t.hosted_zone_id, t.ttl),
        None => println!("dns:      disabled"),
    }
    match &cfg.budget_email {
        Some(email) => println!("budget:   {} USD/month, alerts to {email}", cfg.budget_amount),
        None => println!("budget:   no alarm"),
    }
    println!(
        "backups:  kept {} days ({} for noncurrent versions)",
        cfg.backup.retention_days, cfg.backup.noncurrent_retention_days
    );
    Ok(())
}

async fn backup_plan(cfg: &ServerConfig, aws: &AwsCli) -> anyhow::Result<()> {
    let bucket = cfg
        .control
        .bucket
        .as_deref()
        .filter(|b| !b.is_empty())
        .context("control.bucket is not set; use the BackupBucket stack output")?;
    let ecs = backend::ecs_service(cfg, aws)?;
    let tasks = ecs.running_tasks().await?;
    let Some(task) = tasks.first() else {
        bail!("no running task; start the server first");
    };

    let plan = BackupPlan::new(
        ecs.cluster(),
        task,
        backend::container_name(cfg),
        bucket,
        OffsetDateTime::now_utc(),
    )?;
    println!("bucket:  {}", plan.bucket);
    println!("key:     {}", plan.key);
    println!("command: {}", plan.command);
    Ok(())
}
