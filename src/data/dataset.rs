use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::model::IMAGE_SIZE;

/// A single labeled image ready to be batched
#[derive(Debug, Clone)]
pub struct ImageItem {
    /// Pixels in channel-major order, scaled to [-1, 1]
    pub pixels: Vec<f32>,
    /// Class index of the image
    pub label: usize,
}

/// Labeled images held in memory
pub struct ImageDataset {
    items: Vec<ImageItem>,
    classes: Vec<String>,
    channels: usize,
}

impl ImageDataset {
    /// Creates a dataset directly from pre-built items
    pub fn from_items(items: Vec<ImageItem>, classes: Vec<String>, channels: usize) -> Self {
        Self {
            items,
            classes,
            channels,
        }
    }

    /// Builds `per_class` images for each class, each class drawing a horizontal
    /// stripe at its own height over a noisy background.
    pub fn synthetic(num_classes: usize, per_class: usize, channels: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let band = (IMAGE_SIZE / num_classes.max(1)).max(1);
        let plane = IMAGE_SIZE * IMAGE_SIZE;

        let mut items = Vec::with_capacity(num_classes * per_class);
        for label in 0..num_classes {
            let top = (label * band).min(IMAGE_SIZE - 1);
            let bottom = (top + band).min(IMAGE_SIZE);
            for _ in 0..per_class {
                let mut pixels = Vec::with_capacity(channels * plane);
                for _ in 0..channels {
                    for row in 0..IMAGE_SIZE {
                        let base = if (top..bottom).contains(&row) { 0.9 } else { -0.9 };
                        for _ in 0..IMAGE_SIZE {
                            let value: f32 = base + rng.random_range(-0.1..0.1);
                            pixels.push(value.clamp(-1.0, 1.0));
                        }
                    }
                }
                items.push(ImageItem { pixels, label });
            }
        }

        let classes = (0..num_classes).map(|label| label.to_string()).collect();
        Self::from_items(items, classes, channels)
    }

    /// Class names, indexed by label
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn items(&self) -> &[ImageItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_dataset_covers_every_class() {
        let dataset = ImageDataset::synthetic(4, 3, 1, 7);

        assert_eq!(dataset.len(), 12);
        assert_eq!(dataset.num_classes(), 4);
        for label in 0..4 {
            assert_eq!(
                dataset.items().iter().filter(|item| item.label == label).count(),
                3
            );
        }
    }

    #[test]
    fn synthetic_pixels_are_scaled_and_sized() {
        let dataset = ImageDataset::synthetic(2, 1, 3, 1);

        for item in dataset.items() {
            assert_eq!(item.pixels.len(), 3 * IMAGE_SIZE * IMAGE_SIZE);
            assert!(item.pixels.iter().all(|v| (-1.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn synthetic_dataset_is_reproducible_per_seed() {
        let a = ImageDataset::synthetic(2, 2, 1, 99);
        let b = ImageDataset::synthetic(2, 2, 1, 99);

        assert_eq!(a.items()[3].pixels, b.items()[3].pixels);
    }

    #[test]
    fn dataset_trait_reads_items_by_index() {
        let dataset = ImageDataset::synthetic(2, 1, 1, 0);

        assert_eq!(Dataset::len(&dataset), 2);
        assert_eq!(dataset.get(1).map(|item| item.label), Some(1));
        assert!(dataset.get(2).is_none());
    }
}
