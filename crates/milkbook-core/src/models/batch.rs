//! Batch model

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

static BATCH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]+-(\d{6})$").expect("Invalid regex")
});

/// Aggregation unit for a day or shift
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,
    pub dispatched: bool,
}

impl Batch {
    /// A batch that has not been dispatched yet
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            dispatched: false,
        }
    }

    /// Whether the id follows the `<code>-<ddmmyy>` convention.
    ///
    /// The store accepts any id; front ends use this to warn the operator.
    ///
    /// ```
    /// use milkbook_core::Batch;
    ///
    /// assert!(Batch::new("M-010124").follows_naming_convention());
    /// assert!(!Batch::new("morning").follows_naming_convention());
    /// ```
    #[must_use]
    pub fn follows_naming_convention(&self) -> bool {
        BATCH_NAME
            .captures(&self.batch_id)
            .is_some_and(|cap| NaiveDate::parse_from_str(&cap[1], "%d%m%y").is_ok())
    }
}
