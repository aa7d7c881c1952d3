use std::sync::Arc;

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use milkbook_core::util::rfc3339_to_millis;
use milkbook_core::{
    BatchTotals, CollectionInput, CollectionRecord, ConnectivitySignal, DerivedView,
    PendingOperation, RemoteError, SheetsGateway, SqliteStorage, SyncEngine, SyncOutcome,
    SyncReport,
};
use serde::Serialize;

use crate::cli::{CollectionArgs, QualityArgs};
use crate::cli_config::Settings;
use crate::connectivity::EndpointProbe;
use crate::error::CliError;

pub type Engine = SyncEngine<Option<SheetsGateway>>;

#[derive(Debug, Serialize)]
pub struct CollectionListItem {
    pub id: String,
    pub collector: String,
    pub arrival_time: i64,
    pub arrival: String,
    pub quantity_liters: f64,
    pub clr: Option<f64>,
    pub fat: Option<f64>,
    pub snf: Option<f64>,
    pub water_percent: Option<f64>,
    pub mbrt_hours: Option<f64>,
    pub alcohol_test: String,
    pub batch_id: String,
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub position: usize,
    pub kind: &'static str,
    pub batch_id: String,
    pub record_id: Option<String>,
}

/// Open the engine over the local database.
///
/// `online` is the initial connectivity; it is forced off when no endpoint
/// is configured or `--offline` was given.
pub fn open_engine(
    settings: &Settings,
    online: bool,
) -> Result<(Engine, ConnectivitySignal), CliError> {
    let storage = SqliteStorage::open(&settings.db_path)?;
    let gateway = if settings.offline {
        None
    } else {
        settings.sync.gateway()?
    };
    let signal = ConnectivitySignal::new(online && gateway.is_some());
    let engine = SyncEngine::new(
        Arc::new(storage),
        gateway,
        signal.subscribe(),
        settings.sync.clone(),
    );
    Ok((engine, signal))
}

/// One reachability check; false without a usable endpoint
pub async fn probe_online(settings: &Settings) -> Result<bool, CliError> {
    match &settings.sync.endpoint {
        Some(endpoint) if settings.wants_network() => {
            let probe = EndpointProbe::new(endpoint.clone()).map_err(RemoteError::from)?;
            Ok(probe.is_reachable().await)
        }
        _ => Ok(false),
    }
}

/// Resolve `HH:MM` against the date of `now`; `None` means `now`
pub fn parse_arrival<Tz: TimeZone>(
    raw: Option<&str>,
    now: &DateTime<Tz>,
) -> Result<i64, CliError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(now.timestamp_millis());
    };

    let time = NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| CliError::InvalidArrivalTime(raw.to_string()))?;
    now.timezone()
        .from_local_datetime(&now.date_naive().and_time(time))
        .earliest()
        .map(|arrival| arrival.timestamp_millis())
        .ok_or_else(|| CliError::InvalidArrivalTime(raw.to_string()))
}

pub fn apply_quality(input: &mut CollectionInput, quality: &QualityArgs) {
    if let Some(clr) = quality.clr {
        input.clr = Some(clr);
    }
    if let Some(fat) = quality.fat {
        input.fat = Some(fat);
    }
    if let Some(snf) = quality.snf {
        input.snf = Some(snf);
    }
    if let Some(water) = quality.water {
        input.water_percent = Some(water);
    }
    if let Some(mbrt) = quality.mbrt {
        input.mbrt_hours = Some(mbrt);
    }
    if let Some(alcohol) = quality.alcohol {
        input.alcohol_test = alcohol;
    }
}

/// Overlay the given edit fields on an existing record
pub fn edited_input(
    existing: &CollectionRecord,
    changes: &CollectionArgs,
    now: &DateTime<Local>,
) -> Result<CollectionInput, CliError> {
    let mut input = CollectionInput::from_record(existing);
    if let Some(quantity) = changes.quantity {
        input.quantity_liters = Some(quantity);
    }
    if let Some(batch) = &changes.batch {
        input.batch_id.clone_from(batch);
    }
    if let Some(collector) = &changes.collector {
        input.collector = collector.clone();
    }
    if changes.arrival.is_some() {
        input.arrival_time = parse_arrival(changes.arrival.as_deref(), now)?;
    }
    apply_quality(&mut input, &changes.quality);
    Ok(input)
}

pub fn format_measurement(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |value| format!("{value:.1}"))
}

pub fn format_clock(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map_or_else(
        || "--:--".to_string(),
        |at| at.with_timezone(&Local).format("%H:%M").to_string(),
    )
}

pub fn format_collection_lines(collections: &[CollectionRecord]) -> Vec<String> {
    collections
        .iter()
        .map(|record| {
            format!(
                "{}  {:<9} {:>7.2} L  {}  {}  CLR {} FAT {} SNF {} water {} MBRT {} alcohol {}",
                record.id,
                record.collector.as_str(),
                record.quantity_liters,
                record.batch_id,
                format_clock(record.arrival_time),
                format_measurement(record.clr),
                format_measurement(record.fat),
                format_measurement(record.snf),
                format_measurement(record.water_percent),
                format_measurement(record.mbrt_hours),
                record.alcohol_test,
            )
        })
        .collect()
}

pub fn collection_to_list_item(record: &CollectionRecord) -> CollectionListItem {
    CollectionListItem {
        id: record.id.to_string(),
        collector: record.collector.to_string(),
        arrival_time: record.arrival_time,
        arrival: format_clock(record.arrival_time),
        quantity_liters: record.quantity_liters,
        clr: record.clr,
        fat: record.fat,
        snf: record.snf,
        water_percent: record.water_percent,
        mbrt_hours: record.mbrt_hours,
        alcohol_test: record.alcohol_test.to_string(),
        batch_id: record.batch_id.clone(),
        created_at: record.created_at,
    }
}

/// Newest batch first
pub fn format_batch_lines(totals: &BatchTotals) -> Vec<String> {
    totals
        .most_recent_first()
        .map(|total| {
            let status = if total.dispatched {
                "dispatched"
            } else {
                "open"
            };
            format!("{:<12} {:>9.2} L  {status}", total.batch_id, total.net_liters)
        })
        .collect()
}

pub fn pending_to_item(position: usize, operation: &PendingOperation) -> PendingItem {
    let record_id = match operation {
        PendingOperation::AddCollection(record) | PendingOperation::EditCollection(record) => {
            Some(record.id.to_string())
        }
        PendingOperation::AddDeduction(record) => Some(record.id.to_string()),
        PendingOperation::SetBatchDispatched { .. } => None,
    };
    PendingItem {
        position,
        kind: operation.kind(),
        batch_id: operation.batch_id().to_string(),
        record_id,
    }
}

pub fn format_pending_lines(operations: &[PendingOperation]) -> Vec<String> {
    operations
        .iter()
        .enumerate()
        .map(|(index, operation)| {
            let item = pending_to_item(index + 1, operation);
            match item.record_id {
                Some(id) => format!(
                    "{:>3}. {:<14} {}  batch {}",
                    item.position, item.kind, id, item.batch_id
                ),
                None => format!(
                    "{:>3}. {:<14} batch {}",
                    item.position, item.kind, item.batch_id
                ),
            }
        })
        .collect()
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}

pub fn format_last_sync(last_sync: Option<&str>, now_ms: i64) -> String {
    match last_sync {
        None => "never".to_string(),
        Some(value) => rfc3339_to_millis(value).map_or_else(
            || value.to_string(),
            |millis| format!("{value} ({})", format_relative_time(millis, now_ms)),
        ),
    }
}

pub fn format_view_summary(view: &DerivedView) -> String {
    format!("{} pending, state {}", view.pending_operations, view.state)
}

pub fn format_sync_report(report: &SyncReport) -> String {
    match report.outcome {
        SyncOutcome::Completed { pushed, pulled } => {
            format!("Sync completed: pushed {pushed} operations, pulled {pulled} records")
        }
        SyncOutcome::AlreadySyncing => "A sync is already in progress".to_string(),
    }
}
