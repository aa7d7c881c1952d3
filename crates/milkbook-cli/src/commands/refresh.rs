use crate::cli_config::Settings;
use crate::commands::common::{format_batch_lines, format_view_summary, open_engine};
use crate::error::CliError;

pub async fn run_refresh(settings: &Settings) -> Result<(), CliError> {
    let (engine, _signal) = open_engine(settings, settings.wants_network())?;
    let view = engine.refresh().await?;

    for line in format_batch_lines(&view.batch_totals) {
        println!("{line}");
    }
    println!("{}", format_view_summary(&view));
    Ok(())
}
