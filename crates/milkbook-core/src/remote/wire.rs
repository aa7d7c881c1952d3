//! Push payload in the remote service's `{type, data}` shape

use serde::Serialize;

use crate::models::{CollectionRecord, DeductionRecord};
use crate::store::PendingOperation;
use crate::util::millis_to_rfc3339;

/// Value the sheet uses for a measurement that was not taken
pub const UNSET_MEASUREMENT: f64 = -1.0;

/// Body of a push request: `{"actions": [...]}`
#[derive(Debug, Serialize)]
pub struct PushPayload<'a> {
    pub actions: Vec<WireAction<'a>>,
}

#[derive(Debug, Serialize)]
pub struct WireAction<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: WireData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WireData<'a> {
    Collection(WireCollection<'a>),
    Deduction(WireDeduction<'a>),
    Dispatch(WireDispatch<'a>),
}

#[derive(Debug, Serialize)]
pub struct WireCollection<'a> {
    #[serde(rename = "BUID")]
    pub id: &'a str,
    #[serde(rename = "collectorName")]
    pub collector: &'a str,
    #[serde(rename = "arrivalTime")]
    pub arrival_time: String,
    pub quantity: f64,
    #[serde(rename = "CLR")]
    pub clr: f64,
    #[serde(rename = "FAT")]
    pub fat: f64,
    #[serde(rename = "SNF")]
    pub snf: f64,
    pub water: f64,
    pub alcohol: &'static str,
    #[serde(rename = "MBRT")]
    pub mbrt: f64,
    #[serde(rename = "Batch")]
    pub batch: &'a str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct WireDeduction<'a> {
    pub id: &'a str,
    pub batch: &'a str,
    pub reason: &'a str,
    pub quantity: f64,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct WireDispatch<'a> {
    pub batch: &'a str,
    pub dispatched: bool,
}

/// Encode queued operations, preserving their order
pub fn push_payload(operations: &[PendingOperation]) -> PushPayload<'_> {
    PushPayload {
        actions: operations.iter().map(encode_operation).collect(),
    }
}

fn encode_operation(operation: &PendingOperation) -> WireAction<'_> {
    let data = match operation {
        PendingOperation::AddCollection(record) | PendingOperation::EditCollection(record) => {
            WireData::Collection(encode_collection(record))
        }
        PendingOperation::AddDeduction(record) => WireData::Deduction(encode_deduction(record)),
        PendingOperation::SetBatchDispatched {
            batch_id,
            dispatched,
        } => WireData::Dispatch(WireDispatch {
            batch: batch_id,
            dispatched: *dispatched,
        }),
    };

    WireAction {
        kind: operation.kind(),
        data,
    }
}

fn encode_collection(record: &CollectionRecord) -> WireCollection<'_> {
    WireCollection {
        id: record.id.as_str(),
        collector: record.collector.as_str(),
        arrival_time: millis_to_rfc3339(record.arrival_time),
        quantity: record.quantity_liters,
        clr: record.clr.unwrap_or(UNSET_MEASUREMENT),
        fat: record.fat.unwrap_or(UNSET_MEASUREMENT),
        snf: record.snf.unwrap_or(UNSET_MEASUREMENT),
        water: record.water_percent.unwrap_or(UNSET_MEASUREMENT),
        alcohol: record.alcohol_test.as_str(),
        mbrt: record.mbrt_hours.unwrap_or(UNSET_MEASUREMENT),
        batch: &record.batch_id,
        timestamp: millis_to_rfc3339(record.created_at),
    }
}

fn encode_deduction(record: &DeductionRecord) -> WireDeduction<'_> {
    WireDeduction {
        id: record.id.as_str(),
        batch: &record.batch_id,
        reason: &record.reason,
        quantity: record.quantity_liters,
        timestamp: millis_to_rfc3339(record.created_at),
    }
}
