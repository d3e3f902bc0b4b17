use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        Embedding, EmbeddingConfig, LeakyRelu, LeakyReluConfig, PaddingConfig2d,
    },
    tensor::{activation::sigmoid, backend::Backend, Int, Tensor},
};

use crate::model::{ConditionalDiscriminator, IMAGE_SIZE};

/// Layer sizes for the discriminator
#[derive(Debug, Clone)]
pub struct DiscriminatorConfig {
    pub num_classes: usize,
    pub channels: usize,
    pub features: usize,
}

impl DiscriminatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        // One embedding row per class, shaped like an extra image plane
        let label_embedding =
            EmbeddingConfig::new(self.num_classes, IMAGE_SIZE * IMAGE_SIZE).init(device);

        // 28x28 -> 14x14
        let downsample_1 = Conv2dConfig::new([self.channels + 1, self.features], [4, 4])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);

        // 14x14 -> 7x7
        let downsample_2 = Conv2dConfig::new([self.features, self.features * 2], [4, 4])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);

        // 7x7 -> 1x1
        let verdict = Conv2dConfig::new([self.features * 2, 1], [7, 7]).init(device);

        Discriminator {
            label_embedding,
            downsample_1,
            downsample_2,
            verdict,
            activation: LeakyReluConfig::new().with_negative_slope(0.2).init(),
        }
    }
}

/// Estimates the probability that an (image, label) pair is real
#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    label_embedding: Embedding<B>,
    downsample_1: Conv2d<B>,
    downsample_2: Conv2d<B>,
    verdict: Conv2d<B>,
    activation: LeakyRelu,
}

impl<B: Backend> Discriminator<B> {
    /// images: [batch, channels, 28, 28], labels: [batch] -> probabilities [batch]
    pub fn forward(&self, images: Tensor<B, 4>, labels: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        let [batch_size, ..] = images.dims();

        let label_plane = self
            .label_embedding
            .forward(labels.reshape([batch_size, 1]))
            .reshape([batch_size, 1, IMAGE_SIZE, IMAGE_SIZE]);
        let x = Tensor::cat(vec![images, label_plane], 1);

        let x = self.activation.forward(self.downsample_1.forward(x));
        let x = self.activation.forward(self.downsample_2.forward(x));
        let logits = self.verdict.forward(x).reshape([batch_size]);

        sigmoid(logits)
    }
}

impl<B: Backend> ConditionalDiscriminator<B> for Discriminator<B> {
    fn classify(&self, images: Tensor<B, 4>, labels: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        self.forward(images, labels)
    }
}
