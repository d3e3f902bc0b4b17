use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use image::RgbImage;
use tracing::debug;

use crate::tracking::{LogRecord, MetricSink, Metrics, TrackingError};

pub const METRICS_FILE: &str = "metrics.jsonl";
pub const MEDIA_DIR: &str = "media";

/// Appends records to `<run>/metrics.jsonl` and stores images under `<run>/media/`
pub struct JsonlSink {
    writer: BufWriter<File>,
    media_dir: PathBuf,
}

impl JsonlSink {
    pub fn create(run_dir: &Path) -> Result<Self, TrackingError> {
        let media_dir = run_dir.join(MEDIA_DIR);
        fs::create_dir_all(&media_dir)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(run_dir.join(METRICS_FILE))?;

        Ok(Self {
            writer: BufWriter::new(file),
            media_dir,
        })
    }

    fn append(&mut self, record: &LogRecord) -> Result<(), TrackingError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl MetricSink for JsonlSink {
    fn log_scalars(&mut self, metrics: &Metrics, step: usize) -> Result<(), TrackingError> {
        self.append(&LogRecord::Scalars {
            step,
            metrics: metrics.clone(),
        })
    }

    fn log_image(
        &mut self,
        key: &str,
        image: &RgbImage,
        caption: &str,
        step: usize,
    ) -> Result<(), TrackingError> {
        let path = self.media_dir.join(format!("{key}_{step:06}.png"));
        image.save(&path)?;
        debug!(path = %path.display(), "saved image");

        self.append(&LogRecord::Image {
            step,
            key: key.to_string(),
            caption: caption.to_string(),
            width: image.width(),
            height: image.height(),
            path: Some(path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::MetricValue;
    use image::Rgb;

    #[test]
    fn writes_one_json_line_per_record() {
        let run = tempfile::tempdir().unwrap();
        let mut sink = JsonlSink::create(run.path()).unwrap();

        let metrics = Metrics::from([("batch_g_loss".to_string(), MetricValue::from(0.5))]);
        sink.log_scalars(&metrics, 3).unwrap();
        sink.log_image("generated_images", &RgbImage::from_pixel(4, 2, Rgb([9, 9, 9])), "Generated Images", 4)
            .unwrap();

        let contents = fs::read_to_string(run.path().join(METRICS_FILE)).unwrap();
        let records: Vec<LogRecord> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(
            records[0],
            LogRecord::Scalars {
                step: 3,
                metrics
            }
        );
        match &records[1] {
            LogRecord::Image {
                step,
                width,
                height,
                path: Some(path),
                ..
            } => {
                assert_eq!((*step, *width, *height), (4, 4, 2));
                assert!(path.ends_with("generated_images_000004.png"));
                assert!(path.exists());
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn reopening_appends_to_existing_log() {
        let run = tempfile::tempdir().unwrap();
        let metrics = Metrics::from([("epoch".to_string(), MetricValue::from(1usize))]);

        JsonlSink::create(run.path()).unwrap().log_scalars(&metrics, 0).unwrap();
        JsonlSink::create(run.path()).unwrap().log_scalars(&metrics, 1).unwrap();

        let contents = fs::read_to_string(run.path().join(METRICS_FILE)).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
