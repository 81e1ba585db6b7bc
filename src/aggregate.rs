//! Aggregation Engine - monthly tag matrix and the derived trend views
//!
//! The month x tag counts are grouped with polars, then pivoted and derived in
//! plain Rust (simpler than the polars pivot/sort API for a table this small).

use crate::error::{Result, TrendsError};
use crate::month::{BucketedRecord, MonthKey};
use polars::prelude::*;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Number of tags kept in the latest-month pie breakdown.
pub const PIE_TOP_N: usize = 15;

/// Month x tag occurrence counts, zero-filled.
///
/// Rows are months in chronological order, columns are tags in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthlyTagMatrix {
    months: Vec<MonthKey>,
    tags: Vec<String>,
    counts: Vec<Vec<u64>>,
}

impl MonthlyTagMatrix {
    /// Group bucketed records by (month, tag) and pivot into a matrix.
    pub fn from_records(records: &[BucketedRecord]) -> Result<Self> {
        if records.is_empty() {
            return Ok(Self::default());
        }

        let months: Vec<String> = records.iter().map(|r| r.month.to_string()).collect();
        let tags: Vec<&str> = records.iter().map(|r| r.record.tag.as_str()).collect();
        let df = df![
            "month" => months,
            "tag" => tags
        ]?;

        let grouped = df
            .lazy()
            .group_by([col("month"), col("tag")])
            .agg([len().alias("count")])
            .collect()?;

        let month_col = grouped.column("month")?.str()?;
        let tag_col = grouped.column("tag")?.str()?;
        let count_series = grouped.column("count")?.cast(&DataType::UInt64)?;
        let count_col = count_series.u64()?;

        let mut cells: BTreeMap<MonthKey, BTreeMap<String, u64>> = BTreeMap::new();
        let mut all_tags: BTreeSet<String> = BTreeSet::new();

        for i in 0..grouped.height() {
            let (Some(month), Some(tag), Some(count)) = (month_col.get(i), tag_col.get(i), count_col.get(i)) else {
                continue;
            };
            let month = parse_month_key(month)?;
            all_tags.insert(tag.to_string());
            cells.entry(month).or_default().insert(tag.to_string(), count);
        }

        let tags: Vec<String> = all_tags.into_iter().collect();
        let mut months = Vec::with_capacity(cells.len());
        let mut counts = Vec::with_capacity(cells.len());
        for (month, row) in cells {
            months.push(month);
            counts.push(
                tags.iter()
                    .map(|tag| row.get(tag).copied().unwrap_or(0))
                    .collect(),
            );
        }

        debug!("Built monthly matrix: {} months x {} tags", months.len(), tags.len());

        Ok(Self { months, tags, counts })
    }

    pub fn months(&self) -> &[MonthKey] {
        &self.months
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn month_labels(&self) -> Vec<String> {
        self.months.iter().map(MonthKey::label).collect()
    }

    pub fn row(&self, month_idx: usize) -> &[u64] {
        &self.counts[month_idx]
    }

    /// Counts for one tag column, one entry per month.
    pub fn column(&self, tag_idx: usize) -> Vec<u64> {
        self.counts.iter().map(|row| row[tag_idx]).collect()
    }

    pub fn count(&self, month: MonthKey, tag: &str) -> u64 {
        let month_idx = self.months.iter().position(|m| *m == month);
        let tag_idx = self.tags.iter().position(|t| t == tag);
        match (month_idx, tag_idx) {
            (Some(m), Some(t)) => self.counts[m][t],
            _ => 0,
        }
    }

    pub fn month_total(&self, month_idx: usize) -> u64 {
        self.counts[month_idx].iter().sum()
    }
}

/// A per-tag series: month labels and a parallel list of values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagSeries<T> {
    pub months: Vec<String>,
    pub values: Vec<T>,
}

/// Tag -> series mapping that keeps matrix column order.
/// Serializes as a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct TagSeriesMap<T> {
    entries: Vec<(String, TagSeries<T>)>,
}

impl<T> Default for TagSeriesMap<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> TagSeriesMap<T> {
    pub fn insert(&mut self, tag: String, series: TagSeries<T>) {
        self.entries.push((tag, series));
    }

    pub fn get(&self, tag: &str) -> Option<&TagSeries<T>> {
        self.entries.iter().find(|(t, _)| t == tag).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagSeries<T>)> {
        self.entries.iter().map(|(t, s)| (t.as_str(), s))
    }
}

impl<T: Serialize> Serialize for TagSeriesMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (tag, series) in &self.entries {
            map.serialize_entry(tag, series)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PieChart {
    pub labels: Vec<String>,
    pub values: Vec<u64>,
}

/// Every view derived from one matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendViews {
    pub months: Vec<String>,
    pub count: TagSeriesMap<u64>,
    pub percentage: TagSeriesMap<f64>,
    pub volatile: TagSeriesMap<u64>,
    pub growth: TagSeriesMap<f64>,
    pub pie: PieChart,
}

impl TrendViews {
    pub fn from_matrix(matrix: &MonthlyTagMatrix) -> Self {
        Self {
            months: matrix.month_labels(),
            count: count_view(matrix),
            percentage: percentage_view(matrix),
            volatile: volatility_view(matrix),
            growth: growth_view(matrix),
            pie: pie_view(matrix, PIE_TOP_N),
        }
    }
}

fn parse_month_key(key: &str) -> Result<MonthKey> {
    key.parse().map_err(|_| TrendsError::InvalidMonth(key.to_string()))
}

/// Round to two decimals from the exact binary value; true halves go to the even digit.
pub fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

fn per_tag<T, F>(matrix: &MonthlyTagMatrix, months: &[String], mut values: F) -> TagSeriesMap<T>
where
    F: FnMut(usize) -> Vec<T>,
{
    let mut view = TagSeriesMap::default();
    for (tag_idx, tag) in matrix.tags().iter().enumerate() {
        view.insert(
            tag.clone(),
            TagSeries {
                months: months.to_vec(),
                values: values(tag_idx),
            },
        );
    }
    view
}

pub fn count_view(matrix: &MonthlyTagMatrix) -> TagSeriesMap<u64> {
    let labels = matrix.month_labels();
    per_tag(matrix, &labels, |tag_idx| matrix.column(tag_idx))
}

/// Share of the month's total, in percent. Zero when the month has no rows.
pub fn percentage_view(matrix: &MonthlyTagMatrix) -> TagSeriesMap<f64> {
    let labels = matrix.month_labels();
    let totals: Vec<u64> = (0..matrix.months().len()).map(|m| matrix.month_total(m)).collect();
    per_tag(matrix, &labels, |tag_idx| {
        matrix
            .column(tag_idx)
            .iter()
            .zip(&totals)
            .map(|(&count, &total)| {
                if total == 0 {
                    0.0
                } else {
                    round2(count as f64 / total as f64 * 100.0)
                }
            })
            .collect()
    })
}

/// Absolute month-over-month change. The first month is always 0.
pub fn volatility_view(matrix: &MonthlyTagMatrix) -> TagSeriesMap<u64> {
    let labels = matrix.month_labels();
    per_tag(matrix, &labels, |tag_idx| {
        let column = matrix.column(tag_idx);
        column
            .iter()
            .enumerate()
            .map(|(i, &curr)| if i == 0 { 0 } else { curr.abs_diff(column[i - 1]) })
            .collect()
    })
}

/// Percent change from the previous month; 0 when the previous month is 0.
/// The first month has no predecessor and is left out.
pub fn growth_view(matrix: &MonthlyTagMatrix) -> TagSeriesMap<f64> {
    let labels: Vec<String> = matrix.month_labels().into_iter().skip(1).collect();
    per_tag(matrix, &labels, |tag_idx| {
        matrix
            .column(tag_idx)
            .windows(2)
            .map(|pair| {
                let (prev, curr) = (pair[0], pair[1]);
                if prev == 0 {
                    0.0
                } else {
                    round2((curr as f64 / prev as f64 - 1.0) * 100.0)
                }
            })
            .collect()
    })
}

/// Top tags of the latest month, highest count first. Ties keep column order.
pub fn pie_view(matrix: &MonthlyTagMatrix, top_n: usize) -> PieChart {
    let Some(latest) = matrix.months().len().checked_sub(1) else {
        return PieChart::default();
    };

    let mut latest_counts: Vec<(&String, u64)> = matrix
        .tags()
        .iter()
        .zip(matrix.row(latest).iter().copied())
        .collect();
    // sort_by is stable
    latest_counts.sort_by(|a, b| b.1.cmp(&a.1));
    latest_counts.truncate(top_n);

    PieChart {
        labels: latest_counts.iter().map(|(tag, _)| (*tag).clone()).collect(),
        values: latest_counts.iter().map(|(_, count)| *count).collect(),
    }
}
