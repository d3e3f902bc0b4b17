use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    config::Config,
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use conditional_gan::{
    inference::Sampler,
    training::{
        checkpoint::{checkpoint_dir, latest_checkpoint},
        evaluate::GRID_COLUMNS,
        train, RunOptions, TrainingConfig,
    },
};

type TrainBackend = Autodiff<NdArray<f32>>;
type InferBackend = NdArray<f32>;

/// Train a conditional GAN on labeled 28x28 images and sample from it
#[derive(Parser)]
#[command(name = "conditional-gan", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train the generator and discriminator
    Train {
        /// Image folder with one sub-directory per class; synthetic data if omitted
        #[arg(long)]
        data: Option<PathBuf>,

        /// JSON training config; MNIST-shaped defaults if omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run directory for metrics, samples and checkpoints
        #[arg(short, long, default_value = "runs/cgan")]
        output: PathBuf,

        #[arg(long)]
        epochs: Option<usize>,

        #[arg(long)]
        batch_size: Option<usize>,

        /// Log per-batch losses every N batches
        #[arg(long)]
        log_interval: Option<usize>,

        /// Continue from the newest checkpoint in the run directory
        #[arg(long)]
        resume: bool,

        /// Tiny model and few epochs, for smoke tests
        #[arg(long, conflicts_with = "config")]
        quick: bool,
    },
    /// Render a grid of samples from a trained run
    Sample {
        /// Run directory written by `train`
        #[arg(long)]
        run: PathBuf,

        /// Checkpoint epoch; the newest one if omitted
        #[arg(long)]
        epoch: Option<usize>,

        /// Class to sample; random classes if omitted
        #[arg(long)]
        label: Option<usize>,

        #[arg(long, default_value_t = 16)]
        count: usize,

        #[arg(short, long, default_value = "samples.png")]
        output: PathBuf,
    },
}

fn load_config(path: &Path) -> Result<TrainingConfig> {
    TrainingConfig::load(path).map_err(|err| anyhow!("failed to load {}: {err:?}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let device = NdArrayDevice::default();

    match cli.command {
        Command::Train {
            data,
            config,
            output,
            epochs,
            batch_size,
            log_interval,
            resume,
            quick,
        } => {
            let mut config = match config {
                Some(path) => load_config(&path)?,
                None if quick => TrainingConfig::quick_test(),
                None => TrainingConfig::mnist(),
            };
            if let Some(epochs) = epochs {
                config.epochs = epochs;
            }
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            if log_interval.is_some() {
                config.log_interval = log_interval;
            }

            let options = RunOptions {
                output_dir: output,
                data_dir: data,
                resume,
            };
            let history = train::<TrainBackend>(&config, &options, device)?;
            info!(
                "Finished {} epochs, results in {}",
                history.epochs.len(),
                options.output_dir.display()
            );
        }
        Command::Sample {
            run,
            epoch,
            label,
            count,
            output,
        } => {
            let config = load_config(&run.join("config.json"))?;
            let dir = match epoch {
                Some(epoch) => checkpoint_dir(&run, epoch),
                None => latest_checkpoint(&run)?
                    .with_context(|| format!("no checkpoint found under {}", run.display()))?,
            };

            let sampler = Sampler::<InferBackend>::load(&dir, &config.model, device)?;
            let labels = match label {
                Some(label) => vec![label; count],
                None => sampler.random_labels(count),
            };
            let grid = sampler.sample_grid(&labels, GRID_COLUMNS)?;
            grid.save(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!("Saved {} samples to {}", count, output.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_and_config_cannot_be_combined() {
        let result = Cli::try_parse_from(["conditional-gan", "train", "--quick", "--config", "run.json"]);

        assert_eq!(
            result.err().map(|err| err.kind()),
            Some(clap::error::ErrorKind::ArgumentConflict)
        );
    }

    #[test]
    fn quick_alone_parses() {
        let cli = Cli::try_parse_from(["conditional-gan", "train", "--quick", "--epochs", "3"]).unwrap();

        assert!(matches!(
            cli.command,
            Command::Train { quick: true, config: None, epochs: Some(3), .. }
        ));
    }
}
