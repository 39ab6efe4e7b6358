use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, Subcommand};
use mcs_model::TaskAddress;

/// On-demand Minecraft server on ECS Fargate Spot
#[derive(Parser, Debug)]
#[command(name = "mcs")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    \
    MCS_DEPLOY_REGION / MCS_DEFAULT_REGION    region when the config leaves it unset\n    \
    MCS_DEPLOY_ACCOUNT / MCS_DEFAULT_ACCOUNT  account when the config leaves it unset")]
pub struct Cli {
    /// Server config file; a missing file means all defaults
    #[arg(short, long, global = true, default_value = "mcs.toml")]
    pub config: PathBuf,

    /// Log filter, overrides `[log] level`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output (text|json|journald), overrides `[log] format`
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// AWS CLI profile for runtime commands
    #[arg(long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Check the config and print the resolved deployment
    Validate,

    /// Render the CloudFormation template
    Synth {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run the HTTP control API locally
    Serve {
        /// Listen address, overrides `[control] listen`
        #[arg(long)]
        listen: Option<SocketAddr>,
    },

    /// Set the desired count to 1
    Start {
        /// Run the whole start workflow (wait for the address, update DNS)
        #[arg(long)]
        wait: bool,
    },

    /// Set the desired count to 0
    Stop {
        /// Run the stop workflow and report it
        #[arg(long)]
        wait: bool,
    },

    /// Show desired count, running tasks and address
    Status,

    /// Resolve the public address of the running task
    GetIp,

    /// Point the configured record at ADDRESS
    UpdateDns { address: TaskAddress },

    /// Print where a world backup would go and the command that takes it
    BackupPlan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mcs",
            "status",
            "--config",
            "prod.toml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.command, Command::Status);
        assert_eq!(cli.config, PathBuf::from("prod.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn update_dns_parses_address() {
        let cli = Cli::try_parse_from(["mcs", "update-dns", "203.0.113.7"]).unwrap();
        match cli.command {
            Command::UpdateDns { address } => assert_eq!(address.to_string(), "203.0.113.7"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["mcs", "update-dns", "not-an-ip"]).is_err());
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["mcs", "start"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("mcs.toml"));
        assert_eq!(cli.command, Command::Start { wait: false });

        let cli = Cli::try_parse_from(["mcs", "synth", "-o", "stack.json"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Synth {
                out: Some(PathBuf::from("stack.json"))
            }
        );
    }
}
