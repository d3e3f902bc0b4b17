use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{bail, Context, Result};
use burn::{
    config::Config,
    data::dataloader::DataLoaderBuilder,
    tensor::backend::AutodiffBackend,
};
use tracing::{info, warn};

use crate::{
    data::{load_image_folder, EpochBatches, ImageBatcher, ImageDataset},
    model::{Discriminator, Generator},
    tracking::JsonlSink,
    training::{
        checkpoint::{latest_checkpoint, load_checkpoint, save_checkpoint, CheckpointState},
        config::TrainingConfig,
        evaluate::evaluate,
        metrics::{EpochMetrics, TrainingHistory},
        trainer::{train_epoch, Learner},
    },
};

/// Synthetic images generated per class when no data directory is given
const SYNTHETIC_PER_CLASS: usize = 64;
const HISTORY_FILE: &str = "history.csv";

/// RNG seed for a run that starts after `epoch` finished epochs.
///
/// A resumed run draws a different noise and shuffle sequence from the one
/// epoch 1 started with.
fn resume_seed(seed: u64, epoch: usize) -> u64 {
    seed.wrapping_add(epoch as u64)
}

/// Where a run reads data from and writes its artifacts to
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    pub data_dir: Option<PathBuf>,
    pub resume: bool,
}

fn load_dataset(config: &TrainingConfig, data_dir: Option<&Path>) -> Result<ImageDataset> {
    let channels = config.model.channels;
    let dataset = match data_dir {
        Some(dir) => load_image_folder(dir, channels)
            .with_context(|| format!("failed to load images from {}", dir.display()))?,
        None => {
            warn!("No data directory given, training on synthetic stripe images");
            ImageDataset::synthetic(
                config.model.num_classes,
                SYNTHETIC_PER_CLASS,
                channels,
                config.seed,
            )
        }
    };

    if dataset.num_classes() > config.model.num_classes {
        bail!(
            "dataset has {} classes but the model is configured for {}",
            dataset.num_classes(),
            config.model.num_classes
        );
    }
    Ok(dataset)
}

/// Trains a conditional GAN from scratch or from the newest checkpoint.
///
/// Everything the run produces lands under `options.output_dir`: the resolved
/// config, `metrics.jsonl`, rendered grids, checkpoints and `history.csv`.
pub fn train<B: AutodiffBackend>(
    config: &TrainingConfig,
    options: &RunOptions,
    device: B::Device,
) -> Result<TrainingHistory> {
    config.validate().context("invalid training configuration")?;

    let run_dir = options.output_dir.as_path();
    fs::create_dir_all(run_dir)
        .with_context(|| format!("failed to create {}", run_dir.display()))?;
    config
        .save(run_dir.join("config.json"))
        .context("failed to save config.json")?;

    B::seed(&device, config.seed);

    let dataset = load_dataset(config, options.data_dir.as_deref())?;
    let num_items = dataset.len();
    let num_batches = num_items.div_ceil(config.batch_size);
    let channels = dataset.channels();

    let mut generator = Learner::new(
        config.model.init_generator::<B>(&device),
        config.optimizer.init::<B, Generator<B>>(),
        config.learning_rate,
    );
    let mut discriminator = Learner::new(
        config.model.init_discriminator::<B>(&device),
        config.optimizer.init::<B, Discriminator<B>>(),
        config.learning_rate,
    );

    let history_path = run_dir.join(HISTORY_FILE);
    let mut history = TrainingHistory::new();
    let mut state = CheckpointState {
        epoch: 0,
        global_step: 0,
    };
    if options.resume {
        match latest_checkpoint(run_dir)? {
            Some(dir) => {
                state = load_checkpoint(&dir, &mut generator, &mut discriminator, &device)
                    .with_context(|| format!("failed to resume from {}", dir.display()))?;
                if history_path.exists() {
                    history = TrainingHistory::load_csv(&history_path)
                        .with_context(|| format!("failed to read {}", history_path.display()))?;
                    history.truncate_after(state.epoch);
                }
                B::seed(&device, resume_seed(config.seed, state.epoch));
            }
            None => warn!("No checkpoint under {}, starting fresh", run_dir.display()),
        }
    }
    if state.epoch >= config.epochs {
        warn!(
            "Checkpoint is already at epoch {} of {}, nothing left to train",
            state.epoch, config.epochs
        );
    }

    let (generator_params, discriminator_params) = config.model.count_parameters();
    info!("=== Starting Training ===");
    info!("Epochs:        {} (starting at {})", config.epochs, state.epoch + 1);
    info!("Batch size:    {}", config.batch_size);
    info!("Learning rate: {}", generator.learning_rate());
    info!("Train items:   {} ({} batches per epoch)", num_items, num_batches);
    info!("Parameters:    generator {}, discriminator {}", generator_params, discriminator_params);

    let loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(channels))
        .batch_size(config.batch_size)
        .shuffle(resume_seed(config.seed, state.epoch))
        .num_workers(1)
        .build(dataset);

    let mut sink = JsonlSink::create(run_dir)?;
    let mut global_step = state.global_step;

    for epoch in state.epoch + 1..=config.epochs {
        let epoch_start = Instant::now();

        let summary = train_epoch(
            &mut generator,
            &mut discriminator,
            EpochBatches::new(loader.iter(), num_batches),
            &device,
            config,
            epoch,
            global_step,
            &mut sink,
        )?;
        global_step = summary.global_step;

        if epoch % config.eval_every == 0 {
            evaluate::<B, _, _>(generator.model(), &device, config, global_step, &mut sink)?;
        }

        if epoch % config.checkpoint_every == 0 || epoch == config.epochs {
            let state = CheckpointState { epoch, global_step };
            save_checkpoint(run_dir, &generator, &discriminator, state)?;
        }

        history.push(EpochMetrics {
            epoch,
            global_step,
            avg_g_loss: summary.avg_g_loss,
            avg_d_loss: summary.avg_d_loss,
            duration_secs: epoch_start.elapsed().as_secs_f64(),
        });
    }

    info!("=== Training Complete ===");
    if let Some(best) = history.best_g_loss() {
        info!("Lowest generator loss: {:.4} (epoch {})", best.avg_g_loss, best.epoch);
    }
    history
        .save_csv(&history_path)
        .context("failed to save history.csv")?;

    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::ModelConfig,
        tracking::{LogRecord, METRICS_FILE},
        training::checkpoint::checkpoint_dir,
    };
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn tiny_config() -> TrainingConfig {
        TrainingConfig::new(ModelConfig::new(8, 3).with_features(4))
            .with_epochs(2)
            .with_batch_size(32)
            .with_log_interval(Some(2))
            .with_num_eval_samples(4)
            .with_checkpoint_every(1)
    }

    fn read_records(run_dir: &Path) -> Vec<LogRecord> {
        fs::read_to_string(run_dir.join(METRICS_FILE))
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn synthetic_run_writes_all_artifacts() {
        let run = tempfile::tempdir().unwrap();
        let options = RunOptions {
            output_dir: run.path().to_path_buf(),
            data_dir: None,
            resume: false,
        };

        let history = train::<TestBackend>(&tiny_config(), &options, NdArrayDevice::default()).unwrap();

        // 3 classes * 64 images in batches of 32
        assert_eq!(history.epochs.len(), 2);
        assert_eq!(history.epochs[1].global_step, 12);
        assert!(run.path().join("config.json").exists());
        assert!(run.path().join(HISTORY_FILE).exists());
        assert!(checkpoint_dir(run.path(), 2).join("state.json").exists());

        let records = read_records(run.path());
        let images = records
            .iter()
            .filter(|record| matches!(record, LogRecord::Image { .. }))
            .count();
        assert_eq!(images, 2);
        assert!(records.windows(2).all(|pair| pair[0].step() <= pair[1].step()));
    }

    #[test]
    fn resume_continues_from_latest_checkpoint() {
        let run = tempfile::tempdir().unwrap();
        let options = RunOptions {
            output_dir: run.path().to_path_buf(),
            data_dir: None,
            resume: true,
        };

        train::<TestBackend>(&tiny_config().with_epochs(1), &options, NdArrayDevice::default()).unwrap();
        let history = train::<TestBackend>(&tiny_config().with_epochs(2), &options, NdArrayDevice::default()).unwrap();

        assert_eq!(history.epochs.iter().map(|m| m.epoch).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(history.epochs[1].global_step, 12);

        let saved = TrainingHistory::load_csv(&run.path().join(HISTORY_FILE)).unwrap();
        assert_eq!(saved.epochs.iter().map(|m| m.epoch).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(saved.epochs[0].global_step, 6);
    }

    #[test]
    fn resume_with_no_epochs_left_keeps_history() {
        let run = tempfile::tempdir().unwrap();
        let options = RunOptions {
            output_dir: run.path().to_path_buf(),
            data_dir: None,
            resume: true,
        };

        train::<TestBackend>(&tiny_config(), &options, NdArrayDevice::default()).unwrap();
        let history = train::<TestBackend>(&tiny_config(), &options, NdArrayDevice::default()).unwrap();

        assert_eq!(history.epochs.len(), 2);
        let saved = TrainingHistory::load_csv(&run.path().join(HISTORY_FILE)).unwrap();
        assert_eq!(saved.epochs.iter().map(|m| m.global_step).collect::<Vec<_>>(), vec![6, 12]);
    }

    #[test]
    fn resumed_runs_get_a_fresh_seed() {
        assert_eq!(resume_seed(42, 0), 42);
        assert_ne!(resume_seed(42, 3), resume_seed(42, 0));
        assert_ne!(resume_seed(42, 3), resume_seed(42, 4));
        assert_eq!(resume_seed(u64::MAX, 1), 0);
    }

    #[test]
    fn invalid_config_is_rejected_before_writing() {
        let run = tempfile::tempdir().unwrap();
        let options = RunOptions {
            output_dir: run.path().join("out"),
            data_dir: None,
            resume: false,
        };

        let result = train::<TestBackend>(
            &tiny_config().with_log_interval(Some(0)),
            &options,
            NdArrayDevice::default(),
        );

        assert!(result.is_err());
        assert!(!run.path().join("out").exists());
    }
}
