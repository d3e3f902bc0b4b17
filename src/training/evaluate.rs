use burn::{
    module::AutodiffModule,
    tensor::{backend::AutodiffBackend, backend::Backend, Int, Tensor, TensorData},
};
use image::RgbImage;
use rand::Rng;
use tracing::info;

use crate::{
    inference::make_grid,
    model::{latent_noise, ConditionalGenerator},
    tracking::MetricSink,
    training::{config::TrainingConfig, trainer::TrainingError},
};

pub const GRID_COLUMNS: usize = 4;
pub const GRID_PADDING: usize = 2;

/// Images produced by one evaluation pass
#[derive(Debug, Clone)]
pub struct EvalSamples<B: Backend> {
    pub labels: Vec<usize>,
    /// [num_eval_samples, channels, 28, 28], pixels in [-1, 1]
    pub images: Tensor<B, 4>,
    pub grid: RgbImage,
}

/// Samples `num_eval_samples` images for random labels and logs them as one
/// grid under `generated_images` at `step`.
///
/// Runs on an inference copy of `generator`; the training module itself is
/// left untouched.
pub fn evaluate<B, G, S>(
    generator: &G,
    device: &B::Device,
    config: &TrainingConfig,
    step: usize,
    sink: &mut S,
) -> Result<EvalSamples<B::InnerBackend>, TrainingError>
where
    B: AutodiffBackend,
    G: AutodiffModule<B>,
    G::InnerModule: ConditionalGenerator<B::InnerBackend>,
    S: MetricSink + ?Sized,
{
    let model = generator.valid();
    let count = config.num_eval_samples;

    let mut rng = rand::rng();
    let labels: Vec<usize> = (0..count)
        .map(|_| rng.random_range(0..config.model.num_classes))
        .collect();
    let label_tensor = Tensor::<B::InnerBackend, 1, Int>::from_data(
        TensorData::new(labels.iter().map(|&l| l as i64).collect::<Vec<_>>(), [count]),
        device,
    );

    let noise = latent_noise::<B::InnerBackend>(count, config.model.latent_dim, device);
    let images = model.generate(noise, label_tensor);

    let grid = make_grid(images.clone(), GRID_COLUMNS, GRID_PADDING)?;
    sink.log_image("generated_images", &grid, "Generated Images", step)?;
    info!("Logged {count} generated images at step {step}");

    Ok(EvalSamples {
        labels,
        images,
        grid,
    })
}
