use milkbook_core::util::now_millis;

use crate::cli_config::Settings;
use crate::commands::common::{format_last_sync, open_engine, probe_online};
use crate::error::CliError;

pub async fn run_status(settings: &Settings) -> Result<(), CliError> {
    let online = probe_online(settings).await?;
    let (engine, _signal) = open_engine(settings, online)?;
    let view = engine.view().await;

    let endpoint = match (&settings.sync.endpoint, settings.offline) {
        (None, _) => "not configured".to_string(),
        (Some(endpoint), true) => format!("{endpoint} (offline)"),
        (Some(endpoint), false) if online => endpoint.clone(),
        (Some(endpoint), false) => format!("{endpoint} (unreachable)"),
    };

    println!("Endpoint: {endpoint}");
    println!("State: {}", view.state);
    println!("Pending operations: {}", view.pending_operations);
    println!("Batches: {}", view.batch_totals.len());
    println!(
        "Last sync: {}",
        format_last_sync(view.last_sync.as_deref(), now_millis())
    );
    Ok(())
}
