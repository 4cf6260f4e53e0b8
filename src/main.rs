//! crossforge - from-source GNU cross toolchain builder
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use crossforge::cli::{commands, Cli, Commands};
use crossforge::config::ConfigManager;
use crossforge::error::{ForgeError, ForgeResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ForgeResult<()> {
    let cli = Cli::parse();

    // 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("crossforge=warn"),
        1 => EnvFilter::new("crossforge=info"),
        _ => EnvFilter::new("crossforge=debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    let workdir = workdir(cli.workdir)?;

    match cli.command {
        Commands::Build(args) => commands::build::execute(args, config, workdir, cli.verbose).await,
        Commands::Resolve(args) => commands::resolve::execute(args, config).await,
        Commands::Status => commands::status::execute().await,
        Commands::Clean(args) => commands::clean::execute(args, workdir).await,
    }
}

fn workdir(flag: Option<PathBuf>) -> ForgeResult<PathBuf> {
    match flag {
        Some(path) => Ok(path),
        None => std::env::current_dir()
            .map_err(|e| ForgeError::io("getting current directory", e)),
    }
}
