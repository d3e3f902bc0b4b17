use burn::{config::Config, optim::AdamConfig};

use crate::model::ModelConfig;

/// All hyperparameters for training in one place
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Generator and discriminator shapes
    pub model: ModelConfig,
    /// Number of full passes through the training data
    #[config(default = 20)]
    pub epochs: usize,
    /// Number of images per batch
    #[config(default = 64)]
    pub batch_size: usize,
    /// Learning rate shared by both optimizers
    #[config(default = 2e-4)]
    pub learning_rate: f64,
    /// Emit per-batch metrics every N batches; `None` disables them
    pub log_interval: Option<usize>,
    /// Number of images rendered per evaluation
    #[config(default = 16)]
    pub num_eval_samples: usize,
    /// Run the evaluator every N epochs
    #[config(default = 1)]
    pub eval_every: usize,
    /// Save a checkpoint every N epochs
    #[config(default = 5)]
    pub checkpoint_every: usize,
    /// Seeds the backend RNG and data shuffling
    #[config(default = 42)]
    pub seed: u64,
    /// Optimizer settings, one instance per network
    #[config(default = "AdamConfig::new().with_beta_1(0.5).with_beta_2(0.999)")]
    pub optimizer: AdamConfig,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidConfig {
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
    #[error("`log_interval` must be at least 1 when set")]
    ZeroLogInterval,
    #[error("`model.channels` must be 1 or 3, got {0}")]
    Channels(usize),
}

impl TrainingConfig {
    /// Ten classes of 28x28 grayscale images, MNIST-shaped
    pub fn mnist() -> Self {
        Self::new(ModelConfig::new(100, 10))
    }

    /// Small config for quick testing
    pub fn quick_test() -> Self {
        Self::new(ModelConfig::new(16, 10).with_features(16))
            .with_epochs(2)
            .with_batch_size(16)
            .with_log_interval(Some(5))
            .with_num_eval_samples(8)
            .with_checkpoint_every(1)
    }

    /// Rejects values the training loop cannot run with
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        let required = [
            ("model.latent_dim", self.model.latent_dim),
            ("model.num_classes", self.model.num_classes),
            ("model.features", self.model.features),
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
            ("num_eval_samples", self.num_eval_samples),
            ("eval_every", self.eval_every),
            ("checkpoint_every", self.checkpoint_every),
        ];
        if let Some(&(name, _)) = required.iter().find(|(_, value)| *value == 0) {
            return Err(InvalidConfig::Zero(name));
        }
        if self.log_interval == Some(0) {
            return Err(InvalidConfig::ZeroLogInterval);
        }
        if self.model.channels != 1 && self.model.channels != 3 {
            return Err(InvalidConfig::Channels(self.model.channels));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert_eq!(TrainingConfig::mnist().validate(), Ok(()));
        assert_eq!(TrainingConfig::quick_test().validate(), Ok(()));
    }

    #[test]
    fn defaults_disable_batch_logging() {
        let config = TrainingConfig::mnist();

        assert_eq!(config.log_interval, None);
        assert_eq!(config.epochs, 20);
        assert_eq!(config.num_eval_samples, 16);
    }

    #[test]
    fn zero_log_interval_is_rejected() {
        let config = TrainingConfig::mnist().with_log_interval(Some(0));

        assert_eq!(config.validate(), Err(InvalidConfig::ZeroLogInterval));
    }

    #[test]
    fn zero_sized_fields_are_named() {
        let config = TrainingConfig::new(ModelConfig::new(100, 0));
        assert_eq!(config.validate(), Err(InvalidConfig::Zero("model.num_classes")));

        let config = TrainingConfig::mnist().with_batch_size(0);
        assert_eq!(config.validate(), Err(InvalidConfig::Zero("batch_size")));
    }

    #[test]
    fn two_channel_images_are_rejected() {
        let config = TrainingConfig::new(ModelConfig::new(100, 10).with_channels(2));

        assert_eq!(config.validate(), Err(InvalidConfig::Channels(2)));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = TrainingConfig::quick_test();

        config.save(&path).unwrap();
        let loaded = TrainingConfig::load(&path).unwrap();

        assert_eq!(loaded.log_interval, Some(5));
        assert_eq!(loaded.model.features, 16);
        assert_eq!(loaded.batch_size, 16);
    }
}
