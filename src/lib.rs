//! Monthly tag trend statistics over tagged Q&A records, served as JSON.
//!
//! Loader -> month bucketing -> aggregation + co-occurrence -> `/data` payload.
//! Every request recomputes from the input files; nothing is cached.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod cooccurrence;
pub mod dataset;
pub mod error;
pub mod http;
pub mod loader;
pub mod month;
pub mod splitter;

pub use api::{build_payload, respond, PipelineOptions, TrendsPayload};
pub use error::{Result, TrendsError};
