//! Decode pulled sheet rows into records.
//!
//! Rows come straight from the sheet, so headers appear either as the
//! sheet's column titles (`Collector Name`) or as the camel-case keys pushes
//! use (`collectorName`). Numbers may arrive as strings.

use serde_json::{Map, Value};

use super::RemoteError;
use crate::models::{AlcoholTest, Batch, CollectionRecord, Collector, DeductionRecord, RecordId};
use crate::store::RecordSet;
use crate::util::rfc3339_to_millis;

type Row = Map<String, Value>;

/// Decode a full pull response.
///
/// The body must be an object with a truthy `success`; missing arrays decode
/// as empty. Rows without an identifier are skipped.
pub fn decode_snapshot(body: &Value) -> Result<RecordSet, RemoteError> {
    let object = body.as_object().ok_or_else(|| {
        RemoteError::InvalidPayload("pull response is not a JSON object".to_string())
    })?;

    if !object.get("success").is_some_and(is_truthy) {
        let message = object
            .get("message")
            .or_else(|| object.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("pull response did not report success");
        return Err(RemoteError::Api(message.to_string()));
    }

    let mut records = RecordSet {
        collections: rows(object, "collections")?
            .filter_map(decode_collection)
            .collect(),
        deductions: rows(object, "deductions")?
            .filter_map(decode_deduction)
            .collect(),
        batches: Vec::new(),
    };

    for row in rows(object, "batches")? {
        let Some(batch) = decode_batch(row) else {
            continue;
        };
        match records
            .batches
            .iter_mut()
            .find(|existing| existing.batch_id == batch.batch_id)
        {
            Some(existing) => *existing = batch,
            None => records.batches.push(batch),
        }
    }

    let referenced = records
        .collections
        .iter()
        .map(|record| record.batch_id.clone())
        .filter(|batch_id| !batch_id.is_empty())
        .collect::<Vec<_>>();
    for batch_id in referenced {
        records.ensure_batch(&batch_id);
    }

    Ok(records)
}

fn rows<'a>(
    object: &'a Row,
    key: &'static str,
) -> Result<impl Iterator<Item = &'a Row>, RemoteError> {
    let values = match object.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Array(values)) => Some(values),
        Some(_) => {
            return Err(RemoteError::InvalidPayload(format!(
                "`{key}` is not an array"
            )))
        }
    };

    Ok(values.into_iter().flatten().filter_map(move |value| {
        let row = value.as_object();
        if row.is_none() {
            tracing::warn!(key, "Skipping non-object row in pull response");
        }
        row
    }))
}

/// Collection row. `None` when it has no BUID.
pub fn decode_collection(row: &Row) -> Option<CollectionRecord> {
    let Some(id) = text(row, &["BUID"]) else {
        tracing::warn!("Skipping pulled collection without BUID");
        return None;
    };

    Some(CollectionRecord {
        collector: text(row, &["Collector Name", "collectorName"])
            .map_or_else(|| Collector::Other(String::new()), Collector::from),
        arrival_time: timestamp(row, &["Arrival Time", "arrivalTime"], &id),
        quantity_liters: number(row, &["Quantity", "quantity"]).unwrap_or(0.0),
        clr: measurement(row, &["CLR"]),
        fat: measurement(row, &["FAT"]),
        snf: measurement(row, &["SNF"]),
        water_percent: measurement(row, &["Water", "water"]),
        mbrt_hours: measurement(row, &["MBRT"]),
        alcohol_test: text(row, &["Alcohol", "alcohol"])
            .map(|value| AlcoholTest::from_remote(&value))
            .unwrap_or_default(),
        batch_id: text(row, &["Batch"]).unwrap_or_default(),
        created_at: timestamp(row, &["Timestamp", "timestamp"], &id),
        id: RecordId::from(id),
    })
}

/// Deduction row. `None` when it has no id.
pub fn decode_deduction(row: &Row) -> Option<DeductionRecord> {
    let Some(id) = text(row, &["ID", "id"]) else {
        tracing::warn!("Skipping pulled deduction without id");
        return None;
    };

    Some(DeductionRecord {
        batch_id: text(row, &["Batch", "batch"]).unwrap_or_default(),
        reason: text(row, &["Reason", "reason"]).unwrap_or_default(),
        quantity_liters: number(row, &["Quantity", "quantity"]).unwrap_or(0.0),
        created_at: timestamp(row, &["Timestamp", "timestamp"], &id),
        id: RecordId::from(id),
    })
}

/// Batch row. `None` when it has no name.
pub fn decode_batch(row: &Row) -> Option<Batch> {
    let Some(batch_id) = text(row, &["Batch Name", "batch"]) else {
        tracing::warn!("Skipping pulled batch without name");
        return None;
    };

    let dispatched = match field(row, &["Dispatched", "dispatched"]) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => flag.trim().eq_ignore_ascii_case("yes"),
        _ => false,
    };

    Some(Batch {
        batch_id,
        dispatched,
    })
}

/// First present value among `keys`; null and blank strings count as absent
fn field<'a>(row: &'a Row, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|key| row.get(*key)).find(|value| match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        _ => true,
    })
}

fn text(row: &Row, keys: &[&str]) -> Option<String> {
    match field(row, keys)? {
        Value::String(value) => Some(value.trim().to_string()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn number(row: &Row, keys: &[&str]) -> Option<f64> {
    let value = match field(row, keys)? {
        Value::Number(value) => value.as_f64(),
        Value::String(value) => value.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

/// Negative values, including the sheet's `-1`, mean "not measured"
fn measurement(row: &Row, keys: &[&str]) -> Option<f64> {
    number(row, keys).filter(|value| *value >= 0.0)
}

fn timestamp(row: &Row, keys: &[&str], id: &str) -> i64 {
    let parsed = match field(row, keys) {
        Some(Value::String(value)) => {
            rfc3339_to_millis(value).or_else(|| value.trim().parse::<i64>().ok())
        }
        Some(Value::Number(value)) => value.as_i64(),
        _ => None,
    };

    parsed.unwrap_or_else(|| {
        tracing::warn!(id, ?keys, "Pulled row has no readable timestamp");
        0
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}
