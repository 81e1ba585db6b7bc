//! In-memory records and timestamp parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// One tagged question occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Groups the tag rows of one question. `None` when the source cell was empty.
    pub question_id: Option<String>,
    pub tag: String,
    pub timestamp: NaiveDateTime,
}

/// Counters collected while loading; malformed and untagged rows are dropped, not raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub sources: usize,
    pub rows_read: usize,
    pub malformed_rows: usize,
    pub untagged_rows: usize,
}

impl LoadStats {
    pub fn merge(&mut self, other: &LoadStats) {
        self.sources += other.sources;
        self.rows_read += other.rows_read;
        self.malformed_rows += other.malformed_rows;
        self.untagged_rows += other.untagged_rows;
    }
}

/// All records for one request, in source order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<Record>,
    pub stats: LoadStats,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn extend(&mut self, other: Dataset) {
        self.records.extend(other.records);
        self.stats.merge(&other.stats);
    }
}

// Day-first formats are tried before ISO ones so that "03/04/2022" means 3 April.
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S%.f",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %I:%M:%S %p",
    "%d/%m/%Y %I:%M %p",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// Parse a date-time string, returning `None` for anything unparseable.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_utc());
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Combine separate date and time cells with a single space before parsing.
pub fn parse_date_time(date: &str, time: Option<&str>) -> Option<NaiveDateTime> {
    match time.map(str::trim).filter(|t| !t.is_empty()) {
        Some(time) => parse_timestamp(&format!("{} {}", date.trim(), time)),
        None => parse_timestamp(date),
    }
}
