pub mod config;
pub mod discriminator;
pub mod generator;

use burn::tensor::{backend::Backend, Int, Tensor};

pub use config::{ModelConfig, IMAGE_SIZE};
pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use generator::{latent_noise, Generator, GeneratorConfig};

/// A network mapping (noise, label) to a batch of images
pub trait ConditionalGenerator<B: Backend> {
    /// noise: [batch, latent_dim, 1, 1], labels: [batch] -> [batch, channels, height, width]
    fn generate(&self, noise: Tensor<B, 4>, labels: Tensor<B, 1, Int>) -> Tensor<B, 4>;
}

/// A network judging whether (image, label) pairs are real
pub trait ConditionalDiscriminator<B: Backend> {
    /// Returns one probability per image, shaped [batch]
    fn classify(&self, images: Tensor<B, 4>, labels: Tensor<B, 1, Int>) -> Tensor<B, 1>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        module::Module,
        tensor::{Distribution, TensorData},
    };

    type TestBackend = NdArray<f32>;

    fn config() -> ModelConfig {
        ModelConfig::new(8, 3).with_features(4)
    }

    fn labels(values: Vec<i64>, device: &NdArrayDevice) -> Tensor<TestBackend, 1, Int> {
        let len = values.len();
        Tensor::from_data(TensorData::new(values, [len]), device)
    }

    #[test]
    fn generator_produces_images_in_tanh_range() {
        let device = NdArrayDevice::default();
        let generator = config().init_generator::<TestBackend>(&device);

        let noise = latent_noise::<TestBackend>(2, 8, &device);
        let images = generator.generate(noise, labels(vec![0, 2], &device));

        assert_eq!(images.dims(), [2, 1, IMAGE_SIZE, IMAGE_SIZE]);
        let values = images.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn discriminator_outputs_one_probability_per_image() {
        let device = NdArrayDevice::default();
        let discriminator = config().init_discriminator::<TestBackend>(&device);

        let images = Tensor::<TestBackend, 4>::random(
            [3, 1, IMAGE_SIZE, IMAGE_SIZE],
            Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let verdict = discriminator.classify(images, labels(vec![0, 1, 2], &device));

        assert_eq!(verdict.dims(), [3]);
        let values = verdict.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|p| *p > 0.0 && *p < 1.0));
    }

    #[test]
    fn rgb_generator_matches_channel_count() {
        let device = NdArrayDevice::default();
        let generator = config().with_channels(3).init_generator::<TestBackend>(&device);

        let images = generator.generate(
            latent_noise::<TestBackend>(1, 8, &device),
            labels(vec![1], &device),
        );

        assert_eq!(images.dims(), [1, 3, IMAGE_SIZE, IMAGE_SIZE]);
    }

    #[test]
    fn parameter_count_matches_initialized_modules() {
        let device = NdArrayDevice::default();
        let config = config();
        let (generator_params, discriminator_params) = config.count_parameters();

        assert_eq!(
            config.init_generator::<TestBackend>(&device).num_params(),
            generator_params
        );
        assert_eq!(
            config.init_discriminator::<TestBackend>(&device).num_params(),
            discriminator_params
        );
    }
}
