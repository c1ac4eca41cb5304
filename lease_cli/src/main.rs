mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use distributed_lock::{DistributedLease, LockConfig, RedisLeaseStore};
use log::error;

use crate::commands::LeaseCommands;

#[derive(Parser, Debug)]
#[command(author, version, about = "Take, hold and inspect Redis-backed leases", long_about = None)]
struct Cli {
    /// Lock configuration file; REDIS_URL and LEASE_* variables are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging configuration file
    #[arg(long)]
    log_config: Option<PathBuf>,

    #[command(subcommand)]
    command: LeaseCommands,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.log_config {
        Some(path) => common_log::init_with_yaml(path),
        None => common_log::init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    let config = match &cli.config {
        Some(path) => LockConfig::from_yaml(path),
        None => LockConfig::from_env(),
    }
    .context("Failed to load lock configuration")?;

    let store = RedisLeaseStore::from_config(&config).context("Failed to open lease store")?;
    let lease = DistributedLease::new(store).with_key_prefix(config.key_prefix.clone());
    commands::execute(&lease, &config, &cli.command, &mut std::io::stdout().lock())
}
