//! Collection model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::RecordId;
use crate::error::ValidationError;

/// Person (or source) delivering milk.
///
/// Local input is restricted to the registered set; the remote sheet is
/// authoritative and may carry names this build does not know, which are
/// kept as [`Collector::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Collector {
    #[default]
    Raju,
    Ranganna,
    Arjun,
    Rocky,
    Jagga,
    Farm,
    Other(String),
}

impl Collector {
    /// Registered collectors, in the order front ends offer them.
    pub const REGISTERED: [Self; 6] = [
        Self::Raju,
        Self::Ranganna,
        Self::Arjun,
        Self::Rocky,
        Self::Jagga,
        Self::Farm,
    ];

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Raju => "Raju",
            Self::Ranganna => "Ranganna",
            Self::Arjun => "Arjun",
            Self::Rocky => "Rocky",
            Self::Jagga => "Jagga",
            Self::Farm => "Farm",
            Self::Other(name) => name,
        }
    }

    #[must_use]
    pub const fn is_registered(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    fn registered(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::REGISTERED
            .into_iter()
            .find(|collector| collector.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collector {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::registered(s).ok_or_else(|| ValidationError::UnknownCollector(s.trim().to_string()))
    }
}

impl From<String> for Collector {
    fn from(value: String) -> Self {
        Self::registered(&value).unwrap_or_else(|| Self::Other(value.trim().to_string()))
    }
}

impl From<Collector> for String {
    fn from(value: Collector) -> Self {
        match value {
            Collector::Other(name) => name,
            registered => registered.as_str().to_string(),
        }
    }
}

/// Alcohol test outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AlcoholTest {
    #[serde(rename = "+ve")]
    Positive,
    #[serde(rename = "-ve")]
    Negative,
    #[default]
    #[serde(rename = "NA")]
    NotApplicable,
}

impl AlcoholTest {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "+ve",
            Self::Negative => "-ve",
            Self::NotApplicable => "NA",
        }
    }

    /// Lenient parse used for remote rows; unknown values are not applicable.
    pub(crate) fn from_remote(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for AlcoholTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlcoholTest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "+ve" | "+" | "positive" | "pos" => Ok(Self::Positive),
            "-ve" | "-" | "negative" | "neg" => Ok(Self::Negative),
            "na" | "n/a" | "none" | "" => Ok(Self::NotApplicable),
            other => Err(format!("unknown alcohol test result: {other}")),
        }
    }
}

/// One milk intake event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub id: RecordId,
    pub collector: Collector,
    /// Arrival timestamp (Unix ms)
    pub arrival_time: i64,
    pub quantity_liters: f64,
    pub clr: Option<f64>,
    pub fat: Option<f64>,
    pub snf: Option<f64>,
    pub water_percent: Option<f64>,
    pub mbrt_hours: Option<f64>,
    pub alcohol_test: AlcoholTest,
    pub batch_id: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

/// Operator input for a new or edited collection.
///
/// Quality measurements are optional; a negative value means "not measured",
/// the same as leaving it out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionInput {
    pub collector: Collector,
    /// Arrival timestamp (Unix ms)
    pub arrival_time: i64,
    pub quantity_liters: Option<f64>,
    pub clr: Option<f64>,
    pub fat: Option<f64>,
    pub snf: Option<f64>,
    pub water_percent: Option<f64>,
    pub mbrt_hours: Option<f64>,
    pub alcohol_test: AlcoholTest,
    pub batch_id: String,
}

impl CollectionInput {
    /// Prefill an input from an existing record, for edits.
    #[must_use]
    pub fn from_record(record: &CollectionRecord) -> Self {
        Self {
            collector: record.collector.clone(),
            arrival_time: record.arrival_time,
            quantity_liters: Some(record.quantity_liters),
            clr: record.clr,
            fat: record.fat,
            snf: record.snf,
            water_percent: record.water_percent,
            mbrt_hours: record.mbrt_hours,
            alcohol_test: record.alcohol_test,
            batch_id: record.batch_id.clone(),
        }
    }

    /// Reject collectors that cannot be picked for new local entries
    pub fn require_registered_collector(&self) -> Result<(), ValidationError> {
        if self.collector.is_registered() {
            Ok(())
        } else {
            Err(ValidationError::UnknownCollector(
                self.collector.as_str().to_string(),
            ))
        }
    }

    /// Validate the input and build the record it describes.
    ///
    /// Any collector is accepted here; records pulled from the remote may
    /// carry names outside the registered set.
    pub fn into_record(
        self,
        id: RecordId,
        created_at: i64,
    ) -> Result<CollectionRecord, ValidationError> {
        let quantity_liters = validate_quantity(self.quantity_liters)?;
        let batch_id = self.batch_id.trim().to_string();
        if batch_id.is_empty() {
            return Err(ValidationError::MissingBatch);
        }

        Ok(CollectionRecord {
            id,
            collector: self.collector,
            arrival_time: self.arrival_time,
            quantity_liters,
            clr: measurement("CLR", self.clr)?,
            fat: measurement("FAT", self.fat)?,
            snf: measurement("SNF", self.snf)?,
            water_percent: measurement("water", self.water_percent)?,
            mbrt_hours: measurement("MBRT", self.mbrt_hours)?,
            alcohol_test: self.alcohol_test,
            batch_id,
            created_at,
        })
    }
}

pub(crate) fn validate_quantity(quantity: Option<f64>) -> Result<f64, ValidationError> {
    let quantity = quantity.ok_or(ValidationError::MissingQuantity)?;
    if quantity.is_finite() && quantity >= 0.0 {
        Ok(quantity)
    } else {
        Err(ValidationError::InvalidQuantity(quantity))
    }
}

fn measurement(name: &'static str, value: Option<f64>) -> Result<Option<f64>, ValidationError> {
    match value {
        Some(value) if !value.is_finite() => Err(ValidationError::InvalidMeasurement(name)),
        Some(value) if value < 0.0 => Ok(None),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(quantity: Option<f64>, batch: &str) -> CollectionInput {
        CollectionInput {
            collector: Collector::Arjun,
            arrival_time: 1_000,
            quantity_liters: quantity,
            batch_id: batch.to_string(),
            ..CollectionInput::default()
        }
    }

    #[test]
    fn test_collector_parse_is_case_insensitive() {
        assert_eq!("ranganna".parse::<Collector>().unwrap(), Collector::Ranganna);
        assert_eq!(" FARM ".parse::<Collector>().unwrap(), Collector::Farm);
        assert!("Stranger".parse::<Collector>().is_err());
    }

    #[test]
    fn test_collector_from_remote_keeps_unknown_names() {
        assert_eq!(Collector::from("Rocky".to_string()), Collector::Rocky);
        assert_eq!(
            Collector::from("Meena".to_string()),
            Collector::Other("Meena".to_string())
        );
        assert_eq!(
            serde_json::to_string(&Collector::Other("Meena".to_string())).unwrap(),
            "\"Meena\""
        );
    }

    #[test]
    fn test_alcohol_test_serializes_short_labels() {
        assert_eq!(serde_json::to_string(&AlcoholTest::Positive).unwrap(), "\"+ve\"");
        assert_eq!("-ve".parse::<AlcoholTest>().unwrap(), AlcoholTest::Negative);
        assert_eq!(AlcoholTest::from_remote("garbage"), AlcoholTest::NotApplicable);
    }

    #[test]
    fn test_into_record_requires_quantity_and_batch() {
        assert_eq!(
            input(None, "M-010124").into_record("BUID1".into(), 0),
            Err(ValidationError::MissingQuantity)
        );
        assert_eq!(
            input(Some(4.0), "   ").into_record("BUID1".into(), 0),
            Err(ValidationError::MissingBatch)
        );
        assert_eq!(
            input(Some(-1.0), "M-010124").into_record("BUID1".into(), 0),
            Err(ValidationError::InvalidQuantity(-1.0))
        );
    }

    #[test]
    fn test_into_record_accepts_zero_quantity_and_trims_batch() {
        let record = input(Some(0.0), " M-010124 ")
            .into_record("BUID1".into(), 42)
            .unwrap();
        assert_eq!(record.batch_id, "M-010124");
        assert!(record.quantity_liters.abs() < f64::EPSILON);
        assert_eq!(record.created_at, 42);
    }

    #[test]
    fn test_negative_measurement_means_unset() {
        let mut collection = input(Some(3.0), "M-010124");
        collection.fat = Some(-1.0);
        collection.snf = Some(8.5);
        let record = collection.into_record("BUID1".into(), 0).unwrap();
        assert_eq!(record.fat, None);
        assert_eq!(record.snf, Some(8.5));

        let mut bad = input(Some(3.0), "M-010124");
        bad.clr = Some(f64::NAN);
        assert_eq!(
            bad.into_record("BUID2".into(), 0),
            Err(ValidationError::InvalidMeasurement("CLR"))
        );
    }

    #[test]
    fn test_unregistered_collector_rejected_for_local_input() {
        let mut collection = input(Some(3.0), "M-010124");
        collection.collector = Collector::Other("Meena".to_string());
        assert_eq!(
            collection.require_registered_collector(),
            Err(ValidationError::UnknownCollector("Meena".to_string()))
        );
        assert_eq!(input(Some(3.0), "M-010124").require_registered_collector(), Ok(()));
    }

    #[test]
    fn test_into_record_keeps_unregistered_collector() {
        let mut collection = input(Some(3.0), "M-010124");
        collection.collector = Collector::Other("Meena".to_string());
        let record = collection.into_record("BUID1".into(), 0).unwrap();
        assert_eq!(record.collector, Collector::Other("Meena".to_string()));
    }
}
