use std::path::Path;

use burn::tensor::{backend::Backend, Int, Tensor, TensorData};
use image::RgbImage;
use rand::Rng;
use tracing::info;

use crate::{
    inference::grid::{make_grid, GridError},
    model::{latent_noise, ConditionalGenerator, Generator, ModelConfig},
    training::checkpoint::{load_generator, CheckpointError},
};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("label {label} is out of range for {num_classes} classes")]
    LabelOutOfRange { label: usize, num_classes: usize },
    #[error("at least one label is required")]
    NoLabels,
}

/// Draws images from a trained generator outside of training
pub struct Sampler<B: Backend> {
    generator: Generator<B>,
    device: B::Device,
}

impl<B: Backend> Sampler<B> {
    pub fn new(generator: Generator<B>, device: B::Device) -> Self {
        Self { generator, device }
    }

    /// Loads the generator saved in checkpoint directory `dir`
    pub fn load(dir: &Path, config: &ModelConfig, device: B::Device) -> Result<Self, InferenceError> {
        let generator = load_generator::<B>(dir, config, &device)?;
        Ok(Self::new(generator, device))
    }

    pub fn num_classes(&self) -> usize {
        self.generator.num_classes()
    }

    /// `count` labels drawn uniformly from the known classes
    pub fn random_labels(&self, count: usize) -> Vec<usize> {
        let mut rng = rand::rng();
        (0..count)
            .map(|_| rng.random_range(0..self.num_classes()))
            .collect()
    }

    /// One image per label, shaped [labels.len(), channels, 28, 28]
    pub fn sample(&self, labels: &[usize]) -> Result<Tensor<B, 4>, InferenceError> {
        if labels.is_empty() {
            return Err(InferenceError::NoLabels);
        }
        let num_classes = self.num_classes();
        if let Some(&label) = labels.iter().find(|&&label| label >= num_classes) {
            return Err(InferenceError::LabelOutOfRange { label, num_classes });
        }

        let ids: Vec<i64> = labels.iter().map(|&label| label as i64).collect();
        let labels = Tensor::<B, 1, Int>::from_data(TensorData::new(ids, [labels.len()]), &self.device);
        let noise = latent_noise::<B>(labels.dims()[0], self.generator.latent_dim(), &self.device);

        Ok(self.generator.generate(noise, labels))
    }

    /// Samples `labels` and renders them as a grid
    pub fn sample_grid(&self, labels: &[usize], columns: usize) -> Result<RgbImage, InferenceError> {
        let images = self.sample(labels)?;
        info!("Sampled {} images for labels {:?}", labels.len(), labels);
        Ok(make_grid(images, columns, 2)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    type TestBackend = NdArray<f32>;

    fn sampler() -> Sampler<TestBackend> {
        let device = NdArrayDevice::default();
        let generator = ModelConfig::new(8, 4)
            .with_features(4)
            .init_generator::<TestBackend>(&device);
        Sampler::new(generator, device)
    }

    #[test]
    fn samples_one_image_per_label() {
        let images = sampler().sample(&[0, 3, 3]).unwrap();

        assert_eq!(images.dims(), [3, 1, 28, 28]);
    }

    #[test]
    fn rejects_unknown_labels() {
        let result = sampler().sample(&[1, 4]);

        assert!(matches!(
            result,
            Err(InferenceError::LabelOutOfRange { label: 4, num_classes: 4 })
        ));
    }

    #[test]
    fn rejects_empty_label_list() {
        assert!(matches!(sampler().sample(&[]), Err(InferenceError::NoLabels)));
    }

    #[test]
    fn random_labels_stay_in_range() {
        let sampler = sampler();
        let labels = sampler.random_labels(50);

        assert_eq!(labels.len(), 50);
        assert!(labels.iter().all(|&label| label < 4));
    }

    #[test]
    fn grid_has_expected_geometry() {
        let grid = sampler().sample_grid(&[0, 1, 2], 2).unwrap();

        assert_eq!(grid.dimensions(), (62, 62));
    }
}
