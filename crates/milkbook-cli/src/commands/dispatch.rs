use crate::cli_config::Settings;
use crate::commands::common::open_engine;
use crate::error::CliError;

pub async fn run_dispatch(batch: &str, settings: &Settings) -> Result<(), CliError> {
    let (engine, _signal) = open_engine(settings, false)?;
    engine.set_batch_dispatched(batch, true).await?;
    println!("Dispatched {}", batch.trim());
    Ok(())
}
