// src/main.rs

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let root = cli.workspace.as_path();
    match cli.command {
        Commands::Init { index, mirror } => commands::cmd_init(root, index, mirror),
        Commands::Add {
            package,
            constraint,
            dry_run,
        } => commands::cmd_add(root, &package, constraint.as_deref(), dry_run),
        Commands::Remove { package, dry_run } => commands::cmd_remove(root, &package, dry_run),
        Commands::Sync { dry_run } => commands::cmd_sync(root, dry_run),
        Commands::Update { from, dry_run } => commands::cmd_update(root, from, dry_run),
        Commands::Check => commands::cmd_check(root),
        Commands::Status => commands::cmd_status(root),
        Commands::Hold { package } => commands::cmd_hold(root, &package, true),
        Commands::Release { package } => commands::cmd_hold(root, &package, false),
    }
}
