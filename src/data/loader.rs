use std::{
    fs,
    path::{Path, PathBuf},
};

use image::{imageops::FilterType, DynamicImage};
use tracing::{debug, info};

use crate::{
    data::dataset::{ImageDataset, ImageItem},
    model::IMAGE_SIZE,
};

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("data directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("no class directories under {0}")]
    NoClasses(PathBuf),
    #[error("no images found under {0}")]
    NoImages(PathBuf),
    #[error("unsupported channel count {0}, expected 1 or 3")]
    UnsupportedChannels(usize),
    #[error("failed to decode {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Loads a folder laid out as `root/<class>/<image>`.
///
/// Class directories are sorted by name and numbered from zero. Every image is
/// converted to `channels`, resized to 28x28 and scaled to [-1, 1].
pub fn load_image_folder(root: &Path, channels: usize) -> Result<ImageDataset, DataError> {
    if channels != 1 && channels != 3 {
        return Err(DataError::UnsupportedChannels(channels));
    }
    if !root.is_dir() {
        return Err(DataError::MissingDirectory(root.to_path_buf()));
    }

    let class_dirs = sorted_entries(root, |path| path.is_dir())?;
    if class_dirs.is_empty() {
        return Err(DataError::NoClasses(root.to_path_buf()));
    }

    let mut items = Vec::new();
    let mut classes = Vec::with_capacity(class_dirs.len());

    for (label, dir) in class_dirs.iter().enumerate() {
        let name = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let files = sorted_entries(dir, is_image_file)?;
        debug!(class = %name, label, images = files.len(), "loading class");

        for path in files {
            let image = image::open(&path).map_err(|source| DataError::Decode {
                path: path.clone(),
                source,
            })?;
            items.push(ImageItem {
                pixels: image_to_pixels(&image, channels),
                label,
            });
        }
        classes.push(name);
    }

    if items.is_empty() {
        return Err(DataError::NoImages(root.to_path_buf()));
    }

    info!(
        "Loaded {} images in {} classes from {}",
        items.len(),
        classes.len(),
        root.display()
    );
    Ok(ImageDataset::from_items(items, classes, channels))
}

/// Resizes to 28x28 and flattens into channel-major pixels in [-1, 1]
pub fn image_to_pixels(image: &DynamicImage, channels: usize) -> Vec<f32> {
    let size = IMAGE_SIZE as u32;
    let resized = image.resize_exact(size, size, FilterType::Triangle);
    let scale = |value: u8| value as f32 / 127.5 - 1.0;

    if channels == 1 {
        return resized.to_luma8().pixels().map(|p| scale(p.0[0])).collect();
    }

    let rgb = resized.to_rgb8();
    (0..3)
        .flat_map(|channel| rgb.pixels().map(move |p| scale(p.0[channel])))
        .collect()
}

fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, DataError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if keep(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn is_image_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}
