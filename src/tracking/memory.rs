use image::RgbImage;

use crate::tracking::{LogRecord, MetricSink, Metrics, TrackingError};

/// Keeps every record in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<LogRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Scalar records as (step, metrics) pairs, in logging order
    pub fn scalars(&self) -> impl Iterator<Item = (usize, &Metrics)> {
        self.records.iter().filter_map(|record| match record {
            LogRecord::Scalars { step, metrics } => Some((*step, metrics)),
            LogRecord::Image { .. } => None,
        })
    }

    /// Scalar records that contain `name`
    pub fn scalars_with<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (usize, &'a Metrics)> {
        self.scalars().filter(move |(_, metrics)| metrics.contains_key(name))
    }

    pub fn images(&self) -> impl Iterator<Item = &LogRecord> {
        self.records
            .iter()
            .filter(|record| matches!(record, LogRecord::Image { .. }))
    }
}

impl MetricSink for MemorySink {
    fn log_scalars(&mut self, metrics: &Metrics, step: usize) -> Result<(), TrackingError> {
        self.records.push(LogRecord::Scalars {
            step,
            metrics: metrics.clone(),
        });
        Ok(())
    }

    fn log_image(
        &mut self,
        key: &str,
        image: &RgbImage,
        caption: &str,
        step: usize,
    ) -> Result<(), TrackingError> {
        self.records.push(LogRecord::Image {
            step,
            key: key.to_string(),
            caption: caption.to_string(),
            width: image.width(),
            height: image.height(),
            path: None,
        });
        Ok(())
    }
}
