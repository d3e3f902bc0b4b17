pub mod batcher;
pub mod dataset;
pub mod loader;

pub use batcher::{EpochBatches, ImageBatch, ImageBatcher};
pub use dataset::{ImageDataset, ImageItem};
pub use loader::{image_to_pixels, load_image_folder, DataError};
