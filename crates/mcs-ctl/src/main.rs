use clap::Parser;
use mcs_model::ServerConfig;
use mcs_observe::{LoggerConfig, logger_init};
use tracing::debug;

mod backend;
mod cli;
mod commands;
mod serve;

use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = ServerConfig::load(&cli.config)?;
    cfg.apply_env();

    // Logger before the runtime: the local offset is read once, single threaded.
    let level = cli.log_level.as_deref().unwrap_or(&cfg.log.level);
    let format = cli.log_format.as_deref().unwrap_or(&cfg.log.format);
    logger_init(&LoggerConfig::from_parts(level, format)?)?;
    debug!(config = %cli.config.display(), stack = %cfg.full_stack_name(), "config loaded");

    let aws = backend::aws_cli(&cfg, cli.profile.as_deref());
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(commands::run(cli.command, cfg, aws))
}
