use burn::{
    module::Module,
    nn::{
        conv::{ConvTranspose2d, ConvTranspose2dConfig},
        Embedding, EmbeddingConfig, Relu,
    },
    tensor::{backend::Backend, Distribution, Int, Tensor},
};

use crate::model::ConditionalGenerator;

/// Layer sizes for the generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub latent_dim: usize,
    pub num_classes: usize,
    pub channels: usize,
    pub features: usize,
}

impl GeneratorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Generator<B> {
        let label_embedding = EmbeddingConfig::new(self.num_classes, self.num_classes).init(device);

        // 1x1 -> 7x7
        let project = ConvTranspose2dConfig::new(
            [self.latent_dim + self.num_classes, self.features * 2],
            [7, 7],
        )
        .init(device);

        // 7x7 -> 14x14
        let upsample = ConvTranspose2dConfig::new([self.features * 2, self.features], [4, 4])
            .with_stride([2, 2])
            .with_padding([1, 1])
            .init(device);

        // 14x14 -> 28x28
        let to_image = ConvTranspose2dConfig::new([self.features, self.channels], [4, 4])
            .with_stride([2, 2])
            .with_padding([1, 1])
            .init(device);

        Generator {
            label_embedding,
            project,
            upsample,
            to_image,
            activation: Relu::new(),
            latent_dim: self.latent_dim,
            num_classes: self.num_classes,
        }
    }
}

/// Maps (noise, label) to an image with pixels in [-1, 1]
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    label_embedding: Embedding<B>,
    project: ConvTranspose2d<B>,
    upsample: ConvTranspose2d<B>,
    to_image: ConvTranspose2d<B>,
    activation: Relu,
    latent_dim: usize,
    num_classes: usize,
}

impl<B: Backend> Generator<B> {
    /// noise: [batch, latent_dim, 1, 1], labels: [batch] -> [batch, channels, 28, 28]
    pub fn forward(&self, noise: Tensor<B, 4>, labels: Tensor<B, 1, Int>) -> Tensor<B, 4> {
        let [batch_size, ..] = noise.dims();

        // Embed the labels and stack them onto the noise as extra channels
        let embedded = self
            .label_embedding
            .forward(labels.reshape([batch_size, 1]))
            .reshape([batch_size, self.num_classes, 1, 1]);
        let x = Tensor::cat(vec![noise, embedded], 1);

        let x = self.activation.forward(self.project.forward(x));
        let x = self.activation.forward(self.upsample.forward(x));
        self.to_image.forward(x).tanh()
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

impl<B: Backend> ConditionalGenerator<B> for Generator<B> {
    fn generate(&self, noise: Tensor<B, 4>, labels: Tensor<B, 1, Int>) -> Tensor<B, 4> {
        self.forward(noise, labels)
    }
}

/// Standard normal noise shaped [batch, latent_dim, 1, 1]
pub fn latent_noise<B: Backend>(
    batch_size: usize,
    latent_dim: usize,
    device: &B::Device,
) -> Tensor<B, 4> {
    Tensor::random(
        [batch_size, latent_dim, 1, 1],
        Distribution::Normal(0.0, 1.0),
        device,
    )
}
