//! Per-batch net totals derived from the record store

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{Batch, CollectionRecord, DeductionRecord};

/// Net quantity and dispatch flag of one batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchTotal {
    pub batch_id: String,
    pub net_liters: f64,
    pub dispatched: bool,
}

/// Batch totals keyed by batch id, in first-seen order of the collections
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BatchTotals {
    entries: Vec<BatchTotal>,
}

impl BatchTotals {
    pub fn get(&self, batch_id: &str) -> Option<&BatchTotal> {
        self.entries.iter().find(|entry| entry.batch_id == batch_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BatchTotal> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest batch first, the order the batch list is shown in
    pub fn most_recent_first(&self) -> impl Iterator<Item = &BatchTotal> {
        self.entries.iter().rev()
    }
}

impl<'a> IntoIterator for &'a BatchTotals {
    type Item = &'a BatchTotal;
    type IntoIter = std::slice::Iter<'a, BatchTotal>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Derive net liters and dispatch state per batch.
///
/// Only batches that have at least one collection get an entry. Deductions
/// against any other batch id are ignored. Sums run in slice order, so equal
/// inputs always produce bit-identical totals.
///
/// ```
/// use milkbook_core::{compute_batch_totals, Batch};
///
/// let totals = compute_batch_totals(&[], &[], &[Batch::new("M-010124")]);
/// assert!(totals.is_empty());
/// ```
pub fn compute_batch_totals(
    collections: &[CollectionRecord],
    deductions: &[DeductionRecord],
    batches: &[Batch],
) -> BatchTotals {
    let mut entries: Vec<BatchTotal> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for collection in collections {
        let position = *index.entry(collection.batch_id.as_str()).or_insert_with(|| {
            entries.push(BatchTotal {
                batch_id: collection.batch_id.clone(),
                net_liters: 0.0,
                dispatched: batches
                    .iter()
                    .find(|batch| batch.batch_id == collection.batch_id)
                    .is_some_and(|batch| batch.dispatched),
            });
            entries.len() - 1
        });
        entries[position].net_liters += collection.quantity_liters;
    }

    for deduction in deductions {
        if let Some(&position) = index.get(deduction.batch_id.as_str()) {
            entries[position].net_liters -= deduction.quantity_liters;
        }
    }

    BatchTotals { entries }
}
