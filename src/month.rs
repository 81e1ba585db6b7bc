//! Month bucketing: calendar-month keys and the cutoff filter.

use crate::dataset::Record;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// Earliest month included in every aggregation.
pub const CUTOFF_MONTH: MonthKey = MonthKey { year: 2021, month: 10 };

/// A calendar month. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_timestamp(ts: &NaiveDateTime) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Human-readable label, e.g. `Oct-2021`.
    pub fn label(&self) -> String {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(date) => date.format("%b-%Y").to_string(),
            None => self.to_string(),
        }
    }
}

/// Sortable `YYYY-MM` form.
impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("invalid month key '{}'", s))?;
        let year: i32 = year.parse().map_err(|_| format!("invalid year in '{}'", s))?;
        let month: u32 = month.parse().map_err(|_| format!("invalid month in '{}'", s))?;
        MonthKey::new(year, month).ok_or_else(|| format!("month out of range in '{}'", s))
    }
}

/// A record tagged with its month bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketedRecord {
    pub month: MonthKey,
    pub record: Record,
}

/// Assign month keys and drop everything strictly before `cutoff`.
/// Dropping every record is fine; callers get an empty vector.
pub fn bucket_records(records: Vec<Record>, cutoff: MonthKey) -> Vec<BucketedRecord> {
    records
        .into_iter()
        .map(|record| BucketedRecord {
            month: MonthKey::from_timestamp(&record.timestamp),
            record,
        })
        .filter(|b| b.month >= cutoff)
        .collect()
}
