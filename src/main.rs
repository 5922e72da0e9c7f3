use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod domain;
mod error;
mod infrastructure;
mod services;
mod ui;

use cli::{Cli, Commands};
use commands::{plan, run, tag_check};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .init();

    match cli.command {
        Commands::Run {
            inputs,
            build_dir,
            artifacts_dir,
            remote,
            token,
            report,
        } => {
            run::execute(
                inputs,
                run::RunOverrides {
                    build_dir,
                    artifacts_dir,
                    remote,
                    token,
                    report,
                },
            )
            .await?;
        }
        Commands::Plan { inputs, json } => {
            plan::execute(inputs, json).await?;
        }
        Commands::TagCheck { tag } => {
            tag_check::execute(&tag)?;
        }
    }

    Ok(())
}
