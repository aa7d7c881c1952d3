use milkbook_core::CollectionRecord;

use crate::cli_config::Settings;
use crate::commands::common::{
    collection_to_list_item, format_collection_lines, open_engine, CollectionListItem,
};
use crate::error::CliError;

pub async fn run_list(
    batch: Option<&str>,
    limit: usize,
    as_json: bool,
    settings: &Settings,
) -> Result<(), CliError> {
    let collections = list_collections(batch, limit, settings).await?;

    if as_json {
        let json_items = collections
            .iter()
            .map(collection_to_list_item)
            .collect::<Vec<CollectionListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if collections.is_empty() {
        println!("No collections recorded.");
    } else {
        for line in format_collection_lines(&collections) {
            println!("{line}");
        }
    }

    Ok(())
}

/// Newest arrival first, optionally limited to one batch
pub async fn list_collections(
    batch: Option<&str>,
    limit: usize,
    settings: &Settings,
) -> Result<Vec<CollectionRecord>, CliError> {
    let (engine, _signal) = open_engine(settings, false)?;
    let batch = batch.map(str::trim).filter(|batch| !batch.is_empty());

    let mut collections = engine
        .collections()
        .await
        .into_iter()
        .filter(|record| batch.is_none_or(|batch| record.batch_id == batch))
        .collect::<Vec<_>>();
    collections.sort_by(|a, b| {
        b.arrival_time
            .cmp(&a.arrival_time)
            .then_with(|| b.id.cmp(&a.id))
    });
    collections.truncate(limit);
    Ok(collections)
}
