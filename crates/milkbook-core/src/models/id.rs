//! Locally generated record identifiers

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Identifier for collections and deductions.
///
/// Generated ids look like `BUID20240101063000123`: the local wall clock down
/// to the millisecond. Two ids generated within the same millisecond collide;
/// [`IdGenerator`] bumps to the next free millisecond instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generate an id from the current local time
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(&Local::now())
    }

    /// Generate the id for a specific instant
    #[must_use]
    pub fn generate_at<Tz>(at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self(at.format("BUID%Y%m%d%H%M%S%3f").to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Generate a record id from the current local time.
pub fn generate_id() -> RecordId {
    RecordId::generate()
}

/// Issues ids that are unique within one process.
///
/// An id that would land on an already used millisecond moves to the next
/// free one, so the format and time order are kept. Ids from different
/// devices can still collide.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_millis: AtomicI64,
}

impl IdGenerator {
    pub const fn new() -> Self {
        Self {
            last_millis: AtomicI64::new(0),
        }
    }

    pub fn next(&self) -> RecordId {
        self.next_at(Utc::now().timestamp_millis())
    }

    pub(crate) fn next_at(&self, now_millis: i64) -> RecordId {
        let previous = self
            .last_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now_millis.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        let millis = now_millis.max(previous + 1);

        let at = DateTime::<Utc>::from_timestamp_millis(millis)
            .map_or_else(Local::now, |utc| utc.with_timezone(&Local));
        RecordId::generate_at(&at)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_id_format_is_fixed_width() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_milli_opt(6, 7, 8, 9)
            .unwrap()
            .and_utc();
        let id = RecordId::generate_at(&at);
        assert_eq!(id.as_str(), "BUID20240105060708009");
        assert_eq!(id.as_str().len(), 21);
    }

    #[test]
    fn test_ids_sort_by_time() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert!(RecordId::generate_at(&earlier) < RecordId::generate_at(&later));
    }

    #[test]
    fn test_generate_uses_buid_prefix() {
        let id = generate_id();
        assert!(id.as_str().starts_with("BUID"));
        assert!(id.as_str()[4..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generator_never_repeats_a_millisecond() {
        let generator = IdGenerator::new();
        let first = generator.next_at(1_704_090_600_000);
        let second = generator.next_at(1_704_090_600_000);
        let third = generator.next_at(1_704_090_599_000);

        assert!(first < second);
        assert!(second < third);
        assert_eq!(first.as_str().len(), second.as_str().len());
    }
}
