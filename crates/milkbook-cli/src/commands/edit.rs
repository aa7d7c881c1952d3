use chrono::Local;
use milkbook_core::{CollectionRecord, RecordId};

use crate::cli::CollectionArgs;
use crate::cli_config::Settings;
use crate::commands::common::{edited_input, open_engine};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    changes: &CollectionArgs,
    settings: &Settings,
) -> Result<(), CliError> {
    let record = edit_collection(id, changes, settings).await?;
    println!("Updated {}", record.id);
    Ok(())
}

pub async fn edit_collection(
    id: &str,
    changes: &CollectionArgs,
    settings: &Settings,
) -> Result<CollectionRecord, CliError> {
    let id = RecordId::from(id.trim());
    let (engine, _signal) = open_engine(settings, false)?;
    let existing = engine
        .collection(&id)
        .await
        .ok_or_else(|| CliError::CollectionNotFound(id.to_string()))?;

    let input = edited_input(&existing, changes, &Local::now())?;
    let (record, _view) = engine.edit_collection(&id, input).await?;
    Ok(record)
}
