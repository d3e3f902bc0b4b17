//! Metric sinks: where training and evaluation records end up.
//!
//! A sink receives scalar records (a map of metric name to value, tagged with a
//! global step) and image records (a rendered grid plus caption). Sinks are
//! append-only; nothing in the training loop reads them back.

pub mod jsonl;
pub mod memory;

use std::{collections::BTreeMap, path::PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize};

pub use jsonl::{JsonlSink, METRICS_FILE};
pub use memory::MemorySink;

/// Metric name -> value
pub type Metrics = BTreeMap<String, MetricValue>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            MetricValue::Int(value) => value as f64,
            MetricValue::Float(value) => value,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Float(value)
    }
}

impl From<usize> for MetricValue {
    fn from(value: usize) -> Self {
        MetricValue::Int(value as i64)
    }
}

/// One entry in a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogRecord {
    Scalars {
        step: usize,
        metrics: Metrics,
    },
    Image {
        step: usize,
        key: String,
        caption: String,
        width: u32,
        height: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
}

impl LogRecord {
    pub fn step(&self) -> usize {
        match self {
            LogRecord::Scalars { step, .. } | LogRecord::Image { step, .. } => *step,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("failed to write metrics: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to save image: {0}")]
    Image(#[from] image::ImageError),
}

/// Append-only destination for metrics and images
pub trait MetricSink {
    fn log_scalars(&mut self, metrics: &Metrics, step: usize) -> Result<(), TrackingError>;

    fn log_image(
        &mut self,
        key: &str,
        image: &RgbImage,
        caption: &str,
        step: usize,
    ) -> Result<(), TrackingError>;
}
