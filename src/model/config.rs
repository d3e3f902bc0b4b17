use burn::{config::Config, tensor::backend::Backend};

use crate::model::{
    discriminator::{Discriminator, DiscriminatorConfig},
    generator::{Generator, GeneratorConfig},
};

/// Side length of the square images both networks work on
pub const IMAGE_SIZE: usize = 28;

/// Hyperparameters shared by the generator and the discriminator
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// Size of the noise vector fed to the generator
    pub latent_dim: usize,
    /// Number of classes the networks are conditioned on
    pub num_classes: usize,
    /// Image channels, 1 for grayscale or 3 for RGB
    #[config(default = 1)]
    pub channels: usize,
    /// Width of the first convolution block, doubled once inside each network
    #[config(default = 64)]
    pub features: usize,
}

impl ModelConfig {
    pub fn init_generator<B: Backend>(&self, device: &B::Device) -> Generator<B> {
        GeneratorConfig {
            latent_dim: self.latent_dim,
            num_classes: self.num_classes,
            channels: self.channels,
            features: self.features,
        }
        .init(device)
    }

    pub fn init_discriminator<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        DiscriminatorConfig {
            num_classes: self.num_classes,
            channels: self.channels,
            features: self.features,
        }
        .init(device)
    }

    /// Counts trainable parameters of both networks
    pub fn count_parameters(&self) -> (usize, usize) {
        let (latent, classes, channels, f) =
            (self.latent_dim, self.num_classes, self.channels, self.features);

        // Transposed convolutions: in * out * k * k weights + out biases
        let generator = classes * classes
            + (latent + classes) * (2 * f) * 7 * 7 + 2 * f
            + (2 * f) * f * 4 * 4 + f
            + f * channels * 4 * 4 + channels;

        let discriminator = classes * IMAGE_SIZE * IMAGE_SIZE
            + (channels + 1) * f * 4 * 4 + f
            + f * (2 * f) * 4 * 4 + 2 * f
            + (2 * f) * 7 * 7 + 1;

        (generator, discriminator)
    }
}
