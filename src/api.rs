//! API Responder - runs the whole pipeline and shapes the `/data` payload.

use crate::aggregate::{MonthlyTagMatrix, PieChart, TagSeriesMap, TrendViews};
use crate::cooccurrence::{co_occurring_tags, ANCHOR_TAG, COOCCURRENCE_TOP_N};
use crate::error::{Result, TrendsError};
use crate::loader;
use crate::month::{bucket_records, MonthKey, CUTOFF_MONTH};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct TrendsPayload {
    pub count: TagSeriesMap<u64>,
    pub percentage: TagSeriesMap<f64>,
    pub volatile: TagSeriesMap<u64>,
    pub growth: TagSeriesMap<f64>,
    pub pie: PieChart,
    pub python_tags: Vec<(String, u64)>,
    pub months: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub error: String,
}

/// Pipeline parameters. Defaults are the production constants.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub data_dir: PathBuf,
    pub cutoff: MonthKey,
    pub anchor_tag: String,
}

impl PipelineOptions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cutoff: CUTOFF_MONTH,
            anchor_tag: ANCHOR_TAG.to_string(),
        }
    }
}

/// Load, bucket and aggregate everything under `options.data_dir`.
pub fn build_payload(options: &PipelineOptions) -> Result<TrendsPayload> {
    let dataset = loader::load_dir(&options.data_dir)?;
    let loaded = dataset.len();

    let bucketed = bucket_records(dataset.records, options.cutoff);
    if bucketed.is_empty() {
        info!("No records on or after {} ({} loaded)", options.cutoff, loaded);
    }

    let matrix = MonthlyTagMatrix::from_records(&bucketed)?;
    let views = TrendViews::from_matrix(&matrix);
    let python_tags = co_occurring_tags(&bucketed, &options.anchor_tag, COOCCURRENCE_TOP_N);

    Ok(TrendsPayload {
        count: views.count,
        percentage: views.percentage,
        volatile: views.volatile,
        growth: views.growth,
        pie: views.pie,
        python_tags,
        months: views.months,
    })
}

/// A rendered `/data` response body plus the error that produced it, if any.
#[derive(Debug)]
pub struct DataResponse {
    pub body: String,
    pub error: Option<TrendsError>,
}

/// Run the pipeline and serialize the result; failures become `{"error": ...}`.
pub fn respond(options: &PipelineOptions) -> DataResponse {
    let result = build_payload(options).and_then(|payload| Ok(serde_json::to_string(&payload)?));
    match result {
        Ok(body) => DataResponse { body, error: None },
        Err(e) => {
            warn!("Pipeline failed: {}", e);
            DataResponse {
                body: error_body(&e.to_string()),
                error: Some(e),
            }
        }
    }
}

pub fn error_body(message: &str) -> String {
    serde_json::to_string(&ErrorPayload {
        error: message.to_string(),
    })
    .unwrap_or_else(|_| r#"{"error":"internal error"}"#.to_string())
}
