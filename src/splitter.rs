//! Monthly splitter - turns one combined export into per-month Parquet files
//!
//! The combined export carries separate `Date` and `Time` columns. They are
//! merged into a single `DateTime` datetime column (day-first), rows that do not parse
//! are dropped, and each calendar month is written to `<YYYY-MM>.parquet`.

use crate::error::Result;
use crate::loader::{parse_timestamps, read_frame, strip_column_names};
use crate::month::MonthKey;
use polars::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DATETIME_COLUMN: &str = "DateTime";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthFile {
    pub month: MonthKey,
    pub path: PathBuf,
    pub rows: usize,
}

/// Split `input` (CSV or Parquet) into one Snappy Parquet file per month under `output_dir`.
pub fn split_by_month(input: &Path, output_dir: &Path) -> Result<Vec<MonthFile>> {
    info!("Reading {}...", input.display());
    let mut df = read_frame(input)?;
    strip_column_names(&mut df)?;

    let source = input.display().to_string();
    let (timestamps, used_columns) = parse_timestamps(&df, &source)?;

    let micros: Vec<Option<i64>> = timestamps
        .iter()
        .map(|ts| ts.map(|t| t.and_utc().timestamp_micros()))
        .collect();
    let months: Vec<Option<MonthKey>> = timestamps
        .iter()
        .map(|ts| ts.as_ref().map(MonthKey::from_timestamp))
        .collect();

    for name in &used_columns {
        df = df.drop(name)?;
    }
    let datetime = Series::new(DATETIME_COLUMN, micros).cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
    df.with_column(datetime)?;

    let dropped = months.iter().filter(|m| m.is_none()).count();
    if dropped > 0 {
        info!("Dropping {} rows with invalid date/time", dropped);
    }

    std::fs::create_dir_all(output_dir)?;

    let distinct: BTreeSet<MonthKey> = months.iter().flatten().copied().collect();
    let mut written = Vec::with_capacity(distinct.len());
    for month in distinct {
        let mask: BooleanChunked = months.iter().map(|m| *m == Some(month)).collect();
        let mut month_df = df.filter(&mask)?;

        let path = output_dir.join(format!("{}.parquet", month));
        let mut file = std::fs::File::create(&path)?;
        ParquetWriter::new(&mut file)
            .with_compression(ParquetCompression::Snappy)
            .finish(&mut month_df)?;

        info!("Saved: {} ({} rows)", path.display(), month_df.height());
        written.push(MonthFile {
            month,
            path,
            rows: month_df.height(),
        });
    }

    Ok(written)
}
