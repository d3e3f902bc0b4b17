use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Summary of one finished epoch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub global_step: usize,
    pub avg_g_loss: f64,
    pub avg_d_loss: f64,
    pub duration_secs: f64,
}

impl EpochMetrics {
    pub fn print(&self) {
        info!(
            "Epoch {:>3} | Step {:>6} | G Loss: {:.4} | D Loss: {:.4} | Time: {:.1}s",
            self.epoch, self.global_step, self.avg_g_loss, self.avg_d_loss, self.duration_secs,
        );
    }
}

/// Running loss totals over the batches of one epoch
#[derive(Debug, Default)]
pub struct LossAccumulator {
    total_g_loss: f64,
    total_d_loss: f64,
    num_batches: usize,
}

impl LossAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, g_loss: f64, d_loss: f64) {
        self.total_g_loss += g_loss;
        self.total_d_loss += d_loss;
        self.num_batches += 1;
    }

    pub fn num_batches(&self) -> usize {
        self.num_batches
    }

    pub fn avg_g_loss(&self) -> f64 {
        if self.num_batches == 0 { return 0.0; }
        self.total_g_loss / self.num_batches as f64
    }

    pub fn avg_d_loss(&self) -> f64 {
        if self.num_batches == 0 { return 0.0; }
        self.total_d_loss / self.num_batches as f64
    }
}

#[derive(Debug, Default)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metrics: EpochMetrics) {
        metrics.print();
        self.epochs.push(metrics);
    }

    /// Reads rows written by [`TrainingHistory::save_csv`]
    pub fn load_csv(path: &Path) -> Result<Self, csv::Error> {
        let mut reader = csv::Reader::from_path(path)?;
        let epochs = reader.deserialize().collect::<Result<Vec<EpochMetrics>, _>>()?;
        Ok(Self { epochs })
    }

    pub fn save_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        for m in &self.epochs {
            writer.serialize(m)?;
        }
        writer.flush()?;
        info!("Training history saved to {}", path.display());
        Ok(())
    }

    /// Drops epochs after `epoch`, e.g. ones a resumed checkpoint never saw
    pub fn truncate_after(&mut self, epoch: usize) {
        self.epochs.retain(|m| m.epoch <= epoch);
    }

    /// Epoch whose generator loss was lowest
    pub fn best_g_loss(&self) -> Option<&EpochMetrics> {
        self.epochs
            .iter()
            .min_by(|a, b| a.avg_g_loss.total_cmp(&b.avg_g_loss))
    }
}
