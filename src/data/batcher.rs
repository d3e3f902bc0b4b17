use std::marker::PhantomData;

use burn::{
    data::dataloader::batcher::Batcher,
    tensor::{backend::Backend, Int, Tensor, TensorData},
};

use crate::{data::dataset::ImageItem, model::IMAGE_SIZE};

/// A mini-batch of images and their class labels
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// [batch, channels, 28, 28]
    pub images: Tensor<B, 4>,
    /// [batch]
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    channels: usize,
    _backend: PhantomData<B>,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            _backend: PhantomData,
        }
    }
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|item| item.pixels.iter().copied())
            .collect();

        let labels: Vec<i64> = items.iter().map(|item| item.label as i64).collect();

        let images = Tensor::<B, 1>::from_data(
            TensorData::new(pixels, [batch_size * self.channels * IMAGE_SIZE * IMAGE_SIZE]),
            device,
        )
        .reshape([batch_size, self.channels, IMAGE_SIZE, IMAGE_SIZE]);

        let labels = Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [batch_size]), device);

        ImageBatch { images, labels }
    }
}

/// Wraps one epoch of a data loader's batches together with their known count,
/// so consumers get an exact `size_hint`.
pub struct EpochBatches<I> {
    inner: I,
    remaining: usize,
}

impl<I> EpochBatches<I> {
    pub fn new(inner: I, num_batches: usize) -> Self {
        Self {
            inner,
            remaining: num_batches,
        }
    }
}

impl<I: Iterator> Iterator for EpochBatches<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        self.remaining = self.remaining.saturating_sub(1);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
