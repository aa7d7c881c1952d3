//! Deduction model

use serde::{Deserialize, Serialize};

use super::collection::validate_quantity;
use super::RecordId;
use crate::error::ValidationError;

/// Quantity subtracted from a batch's net total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionRecord {
    pub id: RecordId,
    pub batch_id: String,
    pub reason: String,
    pub quantity_liters: f64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

/// Operator input for a deduction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeductionInput {
    pub reason: String,
    pub quantity_liters: Option<f64>,
}

impl DeductionInput {
    pub fn new(reason: impl Into<String>, quantity_liters: f64) -> Self {
        Self {
            reason: reason.into(),
            quantity_liters: Some(quantity_liters),
        }
    }

    /// Validate the input and build a deduction against `batch_id`.
    ///
    /// Batch existence and dispatch status are checked by the caller, which
    /// holds the store.
    pub fn into_record(
        self,
        id: RecordId,
        batch_id: &str,
        created_at: i64,
    ) -> Result<DeductionRecord, ValidationError> {
        let reason = self.reason.trim().to_string();
        if reason.is_empty() {
            return Err(ValidationError::MissingReason);
        }
        let quantity_liters = validate_quantity(self.quantity_liters)?;

        Ok(DeductionRecord {
            id,
            batch_id: batch_id.to_string(),
            reason,
            quantity_liters,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_is_required() {
        let result = DeductionInput::new("  ", 2.0).into_record("BUID1".into(), "M-010124", 0);
        assert_eq!(result, Err(ValidationError::MissingReason));
    }

    #[test]
    fn test_quantity_is_required() {
        let input = DeductionInput {
            reason: "spilled".to_string(),
            quantity_liters: None,
        };
        assert_eq!(
            input.into_record("BUID1".into(), "M-010124", 0),
            Err(ValidationError::MissingQuantity)
        );
    }

    #[test]
    fn test_builds_record() {
        let record = DeductionInput::new(" sour ", 1.5)
            .into_record("BUID1".into(), "M-010124", 7)
            .unwrap();
        assert_eq!(record.reason, "sour");
        assert_eq!(record.batch_id, "M-010124");
        assert_eq!(record.created_at, 7);
    }
}
