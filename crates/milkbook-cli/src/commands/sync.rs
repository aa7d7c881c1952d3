use milkbook_core::SyncReport;

use crate::cli_config::Settings;
use crate::commands::common::{format_sync_report, open_engine};
use crate::error::CliError;

pub async fn run_sync(settings: &Settings) -> Result<(), CliError> {
    let report = sync_now(settings).await?;
    println!("{}", format_sync_report(&report));
    Ok(())
}

/// Manual flush. `--offline` is reported by the engine itself.
pub async fn sync_now(settings: &Settings) -> Result<SyncReport, CliError> {
    if !settings.offline && settings.sync.endpoint.is_none() {
        return Err(CliError::SyncNotConfigured);
    }

    let (engine, _signal) = open_engine(settings, !settings.offline)?;
    Ok(engine.request_sync().await?)
}
