use std::time::Duration;

use milkbook_core::{RemoteError, SyncState};
use tokio::sync::watch;

use crate::cli_config::Settings;
use crate::commands::common::{format_sync_report, format_view_summary, open_engine};
use crate::connectivity::EndpointProbe;
use crate::error::CliError;

/// Stay up, flushing whenever the endpoint comes back, until Ctrl-C
pub async fn run_watch(interval_secs: u64, settings: &Settings) -> Result<(), CliError> {
    let endpoint = match &settings.sync.endpoint {
        Some(endpoint) if !settings.offline => endpoint.clone(),
        _ => return Err(CliError::SyncNotConfigured),
    };

    let probe = EndpointProbe::new(endpoint).map_err(RemoteError::from)?;
    let online = probe.is_reachable().await;
    let (engine, signal) = open_engine(settings, online)?;

    let view = engine.start().await;
    println!("{}", format_view_summary(&view));

    // Operations queued by earlier runs have no connectivity edge to wait for
    if online && view.pending_operations > 0 {
        match engine.request_sync().await {
            Ok(report) => println!("{}", format_sync_report(&report)),
            Err(error) => tracing::warn!(%error, "Initial sync failed"),
        }
    }

    let interval = Duration::from_secs(interval_secs.max(1));
    let mut states = engine.subscribe_state();
    tokio::select! {
        () = engine.watch_connectivity() => {}
        () = probe.run(&signal, interval) => {}
        () = print_states(&mut states) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            println!("Stopping");
        }
    }
    Ok(())
}

async fn print_states(states: &mut watch::Receiver<SyncState>) {
    while states.changed().await.is_ok() {
        let state = *states.borrow_and_update();
        println!("State: {state}");
    }
}
