//! milkbook CLI - record milk collections from the terminal
//!
//! Every command works against the local database first; `sync`, `refresh`
//! and `watch` talk to the spreadsheet endpoint.

mod cli;
mod cli_config;
mod commands;
mod connectivity;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::cli_config::{CliConfig, Overrides, Settings};
use crate::commands::add::run_add;
use crate::commands::batches::run_batches;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::deduct::run_deduct;
use crate::commands::dispatch::run_dispatch;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::pending::run_pending;
use crate::commands::refresh::run_refresh;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        if matches!(&error, CliError::Core(core) if core.is_retryable()) {
            eprintln!("Local changes are kept; run `milkbook sync` again later.");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "milkbook=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = Overrides {
        db_path: cli.db_path,
        endpoint: cli.endpoint,
        offline: cli.offline,
    };

    match cli.command {
        Commands::Config { command } => run_config(command, overrides)?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
        command => run_command(command, &load_settings(overrides)?).await?,
    }

    Ok(())
}

fn load_settings(overrides: Overrides) -> Result<Settings, CliError> {
    let file = CliConfig::load().map_err(CliError::Config)?;
    Settings::resolve(overrides, &file)
}

async fn run_command(command: Commands, settings: &Settings) -> Result<(), CliError> {
    match command {
        Commands::Add(args) => run_add(&args, settings).await?,
        Commands::Edit { id, changes } => run_edit(&id, &changes, settings).await?,
        Commands::Deduct {
            batch,
            quantity,
            reason,
        } => run_deduct(&batch, quantity, &reason, settings).await?,
        Commands::Dispatch { batch } => run_dispatch(&batch, settings).await?,
        Commands::List { batch, limit, json } => {
            run_list(batch.as_deref(), limit, json, settings).await?;
        }
        Commands::Batches { json } => run_batches(json, settings).await?,
        Commands::Pending { json } => run_pending(json, settings).await?,
        Commands::Status => run_status(settings).await?,
        Commands::Sync => run_sync(settings).await?,
        Commands::Refresh => run_refresh(settings).await?,
        Commands::Watch { interval } => run_watch(interval, settings).await?,
        Commands::Config { .. } | Commands::Completions { .. } => {}
    }

    Ok(())
}
