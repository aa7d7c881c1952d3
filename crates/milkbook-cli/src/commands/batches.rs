use crate::cli_config::Settings;
use crate::commands::common::{format_batch_lines, open_engine};
use crate::error::CliError;

pub async fn run_batches(as_json: bool, settings: &Settings) -> Result<(), CliError> {
    let (engine, _signal) = open_engine(settings, false)?;
    let totals = engine.batch_totals().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
    } else if totals.is_empty() {
        println!("No batches yet.");
    } else {
        for line in format_batch_lines(&totals) {
            println!("{line}");
        }
    }
    Ok(())
}
