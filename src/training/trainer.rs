use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion, Int, Tensor},
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::{
    data::ImageBatch,
    inference::GridError,
    model::{latent_noise, ConditionalDiscriminator, ConditionalGenerator},
    tracking::{MetricSink, Metrics, TrackingError},
    training::{
        config::TrainingConfig,
        loss::{discriminator_loss, generator_loss, Targets},
        metrics::LossAccumulator,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("epoch {epoch} produced no batches")]
    EmptyEpoch { epoch: usize },
    #[error(transparent)]
    Tracking(#[from] TrackingError),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// A network together with the optimizer that updates it
pub struct Learner<M, O> {
    pub model: M,
    pub(crate) optimizer: O,
    learning_rate: f64,
}

impl<M, O> Learner<M, O> {
    pub fn new(model: M, optimizer: O, learning_rate: f64) -> Self {
        Self {
            model,
            optimizer,
            learning_rate,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Back-propagates `loss` and applies one optimizer step to the model.
    ///
    /// Only this model's parameters are updated, even when the loss graph
    /// reaches into other modules.
    pub fn step<B>(&mut self, loss: Tensor<B, 1>)
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self
            .optimizer
            .step(self.learning_rate, self.model.clone(), grads);
    }
}

/// Scalar losses of one adversarial step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepLosses {
    pub g_loss: f64,
    pub d_loss: f64,
}

/// Outcome of one pass over the training data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    /// Step counter after the last batch, ready for the next epoch
    pub global_step: usize,
    pub avg_g_loss: f64,
    pub avg_d_loss: f64,
    pub num_batches: usize,
}

fn scalar<B: AutodiffBackend>(loss: &Tensor<B, 1>) -> f64 {
    loss.clone().into_scalar().elem::<f64>()
}

/// One generator update followed by one discriminator update.
///
/// The discriminator is trained on the images the generator produced in this
/// same step, detached from the generator's graph.
pub fn train_step<B, G, D, OG, OD>(
    generator: &mut Learner<G, OG>,
    discriminator: &mut Learner<D, OD>,
    images: Tensor<B, 4>,
    labels: Tensor<B, 1, Int>,
    noise: Tensor<B, 4>,
) -> StepLosses
where
    B: AutodiffBackend,
    G: AutodiffModule<B> + ConditionalGenerator<B>,
    D: AutodiffModule<B> + ConditionalDiscriminator<B>,
    OG: Optimizer<G, B>,
    OD: Optimizer<D, B>,
{
    let [batch_size, ..] = images.dims();
    let targets = Targets::new(batch_size, &images.device());

    let generated = generator.model.generate(noise, labels.clone());
    let g_loss = generator_loss(
        &discriminator.model,
        generated.clone(),
        labels.clone(),
        &targets,
    );
    let g_value = scalar(&g_loss);
    generator.step(g_loss);

    let d_loss = discriminator_loss(&discriminator.model, images, generated, labels, &targets);
    let d_value = scalar(&d_loss);
    discriminator.step(d_loss);

    StepLosses {
        g_loss: g_value,
        d_loss: d_value,
    }
}

fn progress_bar(len: usize, epoch: usize, epochs: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    bar.set_prefix(format!("Epoch {epoch}/{epochs}"));
    bar
}

/// Runs one training epoch over `batches`.
///
/// `global_step` is the step counter at the start of the epoch; it advances by
/// one per batch and the final value comes back in the summary. Per-batch
/// records are emitted at the step of the batch they describe, the epoch
/// averages at the step after the last batch.
#[allow(clippy::too_many_arguments)]
pub fn train_epoch<B, G, D, OG, OD, I, S>(
    generator: &mut Learner<G, OG>,
    discriminator: &mut Learner<D, OD>,
    batches: I,
    device: &B::Device,
    config: &TrainingConfig,
    epoch: usize,
    mut global_step: usize,
    sink: &mut S,
) -> Result<EpochSummary, TrainingError>
where
    B: AutodiffBackend,
    G: AutodiffModule<B> + ConditionalGenerator<B>,
    D: AutodiffModule<B> + ConditionalDiscriminator<B>,
    OG: Optimizer<G, B>,
    OD: Optimizer<D, B>,
    I: IntoIterator<Item = ImageBatch<B>>,
    S: MetricSink + ?Sized,
{
    let batches = batches.into_iter();
    let (expected_batches, _) = batches.size_hint();
    let bar = progress_bar(expected_batches, epoch, config.epochs);
    let mut losses = LossAccumulator::new();

    for (batch_idx, batch) in batches.enumerate() {
        let images = batch.images.to_device(device);
        let labels = batch.labels.to_device(device);
        let [batch_size, ..] = images.dims();
        let noise = latent_noise::<B>(batch_size, config.model.latent_dim, device);

        let step = train_step(generator, discriminator, images, labels, noise);
        losses.update(step.g_loss, step.d_loss);

        bar.set_message(format!("g_loss: {:.4}, d_loss: {:.4}", step.g_loss, step.d_loss));
        bar.inc(1);

        if let Some(interval) = config.log_interval {
            if batch_idx % interval == 0 {
                let mut metrics = Metrics::new();
                metrics.insert("batch_g_loss".into(), step.g_loss.into());
                metrics.insert("batch_d_loss".into(), step.d_loss.into());
                metrics.insert("epoch".into(), epoch.into());
                metrics.insert("batch".into(), batch_idx.into());
                sink.log_scalars(&metrics, global_step)?;
                debug!(
                    "Epoch {epoch} batch {batch_idx}: g_loss={:.4}, d_loss={:.4}",
                    step.g_loss, step.d_loss
                );
            }
        }

        global_step += 1;
    }

    bar.finish_and_clear();

    if losses.num_batches() == 0 {
        return Err(TrainingError::EmptyEpoch { epoch });
    }

    let summary = EpochSummary {
        global_step,
        avg_g_loss: losses.avg_g_loss(),
        avg_d_loss: losses.avg_d_loss(),
        num_batches: losses.num_batches(),
    };

    let mut metrics = Metrics::new();
    metrics.insert("epoch_avg_g_loss".into(), summary.avg_g_loss.into());
    metrics.insert("epoch_avg_d_loss".into(), summary.avg_d_loss.into());
    metrics.insert("epoch".into(), epoch.into());
    sink.log_scalars(&metrics, global_step)?;

    info!(
        "Epoch {epoch} finished: avg_g_loss={:.4}, avg_d_loss={:.4}",
        summary.avg_g_loss, summary.avg_d_loss
    );

    Ok(summary)
}
