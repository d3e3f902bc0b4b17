use burn::tensor::{backend::Backend, Tensor};
use image::{Rgb, RgbImage};

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("cannot build a grid from zero images")]
    Empty,
    #[error("unsupported channel count {0}, expected 1 or 3")]
    UnsupportedChannels(usize),
    #[error("failed to read image data: {0}")]
    Data(String),
}

/// Arranges a batch `[count, channels, height, width]` into one image with
/// `columns` images per row and `padding` black pixels around every cell.
/// Pixel values are min-max normalised over the whole batch.
pub fn make_grid<B: Backend>(
    images: Tensor<B, 4>,
    columns: usize,
    padding: usize,
) -> Result<RgbImage, GridError> {
    let dims = images.dims();
    let values = images
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| GridError::Data(format!("{err:?}")))?;

    render_grid(&values, dims, columns, padding)
}

/// Host-side half of [`make_grid`], over channel-major `values`
pub fn render_grid(
    values: &[f32],
    [count, channels, height, width]: [usize; 4],
    columns: usize,
    padding: usize,
) -> Result<RgbImage, GridError> {
    if count == 0 {
        return Err(GridError::Empty);
    }
    if channels != 1 && channels != 3 {
        return Err(GridError::UnsupportedChannels(channels));
    }

    let (low, high) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = (high - low).max(1e-5);
    let to_byte = |v: f32| ((v - low) / range * 255.0).round().clamp(0.0, 255.0) as u8;

    let columns = columns.clamp(1, count);
    let rows = count.div_ceil(columns);
    let cell_height = height + padding;
    let cell_width = width + padding;

    let mut grid = RgbImage::new(
        (columns * cell_width + padding) as u32,
        (rows * cell_height + padding) as u32,
    );

    for index in 0..count {
        let top = (index / columns) * cell_height + padding;
        let left = (index % columns) * cell_width + padding;

        for y in 0..height {
            for x in 0..width {
                let sample = |channel: usize| {
                    to_byte(values[((index * channels + channel) * height + y) * width + x])
                };
                let pixel = if channels == 1 {
                    let gray = sample(0);
                    [gray, gray, gray]
                } else {
                    [sample(0), sample(1), sample(2)]
                };
                grid.put_pixel((left + x) as u32, (top + y) as u32, Rgb(pixel));
            }
        }
    }

    Ok(grid)
}
