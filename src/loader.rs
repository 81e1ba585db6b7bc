//! Record Loader - reads Parquet/CSV sources into a single Dataset
//!
//! Column names are trimmed and matched loosely (case, spaces, underscores and
//! hyphens are ignored), every needed column is cast to text, and timestamps
//! are parsed row by row. Rows with a malformed timestamp or a blank tag are
//! dropped and counted; they never fail the load.

use crate::dataset::{parse_date_time, parse_timestamp, Dataset, LoadStats, Record};
use crate::error::{Result, TrendsError};
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ID_ALIASES: &[&str] = &["questionid", "question", "id"];
pub const TAG_ALIASES: &[&str] = &["tag", "tags"];
pub const DATETIME_ALIASES: &[&str] = &["datetime", "timestamp"];
pub const DATE_ALIASES: &[&str] = &["date"];
pub const TIME_ALIASES: &[&str] = &["time"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Parquet,
    Csv,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "parquet" => Some(SourceFormat::Parquet),
            "csv" => Some(SourceFormat::Csv),
            _ => None,
        }
    }
}

/// List every Parquet/CSV file directly inside `dir`, sorted by file name.
pub fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(TrendsError::DataUnavailable(format!(
            "data directory {} not found",
            dir.display()
        )));
    }

    let mut sources = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && SourceFormat::from_path(&path).is_some() {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

/// Load every source in `dir` into one Dataset.
pub fn load_dir(dir: &Path) -> Result<Dataset> {
    let sources = discover_sources(dir)?;
    if sources.is_empty() {
        return Err(TrendsError::DataUnavailable(format!(
            "no parquet or csv files found in {}",
            dir.display()
        )));
    }
    load_sources(&sources)
}

/// Load and concatenate the given sources.
pub fn load_sources(paths: &[PathBuf]) -> Result<Dataset> {
    if paths.is_empty() {
        return Err(TrendsError::DataUnavailable("no input sources given".to_string()));
    }

    let mut dataset = Dataset::default();
    for path in paths {
        let df = read_frame(path)?;
        let source = load_frame(df, &path.display().to_string())?;
        dataset.extend(source);
    }

    if dataset.stats.rows_read == 0 {
        return Err(TrendsError::DataUnavailable(format!(
            "all {} input sources are empty",
            paths.len()
        )));
    }

    info!(
        "Loaded {} records from {} sources ({} rows read, {} malformed, {} untagged)",
        dataset.len(),
        dataset.stats.sources,
        dataset.stats.rows_read,
        dataset.stats.malformed_rows,
        dataset.stats.untagged_rows
    );

    Ok(dataset)
}

/// Read one file into a DataFrame. CSV columns are all read as text.
pub fn read_frame(path: &Path) -> Result<DataFrame> {
    let format = SourceFormat::from_path(path).ok_or_else(|| {
        TrendsError::DataUnavailable(format!("unsupported source {}", path.display()))
    })?;

    if std::fs::metadata(path)?.len() == 0 {
        debug!("Source {} is a zero-byte file", path.display());
        return Ok(DataFrame::empty());
    }

    let df = match format {
        SourceFormat::Csv => LazyCsvReader::new(path)
            .with_infer_schema_length(Some(0))
            .finish()
            .map_err(|e| TrendsError::Polars(format!("Failed to scan CSV {}: {}", path.display(), e)))?
            .collect()
            .map_err(|e| TrendsError::Polars(format!("Failed to collect CSV {}: {}", path.display(), e)))?,
        SourceFormat::Parquet => LazyFrame::scan_parquet(path, ScanArgsParquet::default())
            .map_err(|e| TrendsError::Polars(format!("Failed to scan {}: {}", path.display(), e)))?
            .collect()
            .map_err(|e| TrendsError::Polars(format!("Failed to collect {}: {}", path.display(), e)))?,
    };

    debug!("Read {} rows from {}", df.height(), path.display());
    Ok(df)
}

/// Trim surrounding whitespace from every column name.
pub fn strip_column_names(df: &mut DataFrame) -> Result<()> {
    let stripped: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.trim().to_string())
        .collect();
    df.set_column_names(&stripped)?;
    Ok(())
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(*c, ' ' | '_' | '-'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Find the first column whose normalized name matches one of `aliases`.
/// Aliases are tried in order, so earlier ones take priority.
pub fn find_column(df: &DataFrame, aliases: &[&str]) -> Option<String> {
    let names = df.get_column_names();
    aliases.iter().find_map(|alias| {
        names
            .iter()
            .find(|name| normalize_name(name) == *alias)
            .map(|name| name.to_string())
    })
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

/// Parse the timestamp of every row. Returns one entry per row (`None` when
/// malformed) and the names of the columns the timestamps came from.
///
/// A combined `DateTime`/`Timestamp` column wins over separate `Date` + `Time`.
pub fn parse_timestamps(df: &DataFrame, source: &str) -> Result<(Vec<Option<NaiveDateTime>>, Vec<String>)> {
    if let Some(name) = find_column(df, DATETIME_ALIASES) {
        let parsed = text_column(df, &name)?
            .iter()
            .map(|v| v.as_deref().and_then(parse_timestamp))
            .collect();
        return Ok((parsed, vec![name]));
    }

    let date_name = find_column(df, DATE_ALIASES).ok_or_else(|| missing(source, "DateTime"))?;
    let dates = text_column(df, &date_name)?;
    let mut used = vec![date_name];

    let parsed = match find_column(df, TIME_ALIASES) {
        Some(time_name) => {
            let times = text_column(df, &time_name)?;
            used.push(time_name);
            dates
                .iter()
                .zip(&times)
                .map(|(date, time)| date.as_deref().and_then(|d| parse_date_time(d, time.as_deref())))
                .collect()
        }
        None => dates.iter().map(|v| v.as_deref().and_then(parse_timestamp)).collect(),
    };

    Ok((parsed, used))
}

fn missing(source: &str, column: &str) -> TrendsError {
    TrendsError::MissingColumn {
        source_name: source.to_string(),
        column: column.to_string(),
    }
}

/// Turn one already-read frame into records.
pub fn load_frame(mut df: DataFrame, source: &str) -> Result<Dataset> {
    strip_column_names(&mut df)?;

    let mut stats = LoadStats {
        sources: 1,
        rows_read: df.height(),
        ..LoadStats::default()
    };

    if df.height() == 0 {
        debug!("Source {} is empty", source);
        return Ok(Dataset {
            records: Vec::new(),
            stats,
        });
    }

    let id_col = find_column(&df, ID_ALIASES).ok_or_else(|| missing(source, "Question ID"))?;
    let tag_col = find_column(&df, TAG_ALIASES).ok_or_else(|| missing(source, "Tag"))?;

    let (timestamps, _) = parse_timestamps(&df, source)?;

    let ids = text_column(&df, &id_col)?;
    let tags = text_column(&df, &tag_col)?;

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let tag = match tags[row].as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(tag) => tag.to_string(),
            None => {
                stats.untagged_rows += 1;
                continue;
            }
        };

        let timestamp = match timestamps[row] {
            Some(ts) => ts,
            None => {
                stats.malformed_rows += 1;
                continue;
            }
        };

        let question_id = ids[row]
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        records.push(Record {
            question_id,
            tag,
            timestamp,
        });
    }

    if stats.malformed_rows > 0 {
        debug!("Dropped {} rows with malformed timestamps from {}", stats.malformed_rows, source);
    }

    Ok(Dataset { records, stats })
}
