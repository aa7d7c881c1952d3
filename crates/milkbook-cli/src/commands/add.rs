use chrono::Local;
use milkbook_core::{Batch, CollectionInput, CollectionRecord};

use crate::cli::AddArgs;
use crate::cli_config::Settings;
use crate::commands::common::{apply_quality, open_engine, parse_arrival};
use crate::error::CliError;

pub async fn run_add(args: &AddArgs, settings: &Settings) -> Result<(), CliError> {
    if !Batch::new(args.batch.trim()).follows_naming_convention() {
        eprintln!(
            "Warning: batch '{}' does not look like <code>-<ddmmyy>",
            args.batch.trim()
        );
    }

    let record = add_collection(args, settings).await?;
    println!("{}", record.id);
    Ok(())
}

pub async fn add_collection(
    args: &AddArgs,
    settings: &Settings,
) -> Result<CollectionRecord, CliError> {
    let mut input = CollectionInput {
        collector: args.collector.clone(),
        arrival_time: parse_arrival(args.arrival.as_deref(), &Local::now())?,
        quantity_liters: Some(args.quantity),
        batch_id: args.batch.clone(),
        ..CollectionInput::default()
    };
    apply_quality(&mut input, &args.quality);

    let (engine, _signal) = open_engine(settings, false)?;
    let (record, view) = engine.add_collection(input).await?;
    tracing::debug!(pending = view.pending_operations, "Collection queued");
    Ok(record)
}
