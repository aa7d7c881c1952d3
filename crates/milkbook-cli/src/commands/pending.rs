use crate::cli_config::Settings;
use crate::commands::common::{format_pending_lines, open_engine, pending_to_item, PendingItem};
use crate::error::CliError;

pub async fn run_pending(as_json: bool, settings: &Settings) -> Result<(), CliError> {
    let (engine, _signal) = open_engine(settings, false)?;
    let operations = engine.pending_operations().await;

    if as_json {
        let json_items = operations
            .iter()
            .enumerate()
            .map(|(index, operation)| pending_to_item(index + 1, operation))
            .collect::<Vec<PendingItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if operations.is_empty() {
        println!("Nothing waiting to sync.");
        return Ok(());
    }

    for line in format_pending_lines(&operations) {
        println!("{line}");
    }
    Ok(())
}
