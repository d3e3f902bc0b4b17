use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    module::Module,
    optim::Optimizer,
    record::{CompactRecorder, Recorder, RecorderError},
    tensor::backend::{AutodiffBackend, Backend},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    model::{Discriminator, Generator, ModelConfig},
    training::trainer::Learner,
};

const CHECKPOINTS_DIR: &str = "checkpoints";
const STATE_FILE: &str = "state.json";

/// Where training stopped when a checkpoint was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub epoch: usize,
    pub global_step: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to record checkpoint: {0:?}")]
    Recorder(#[from] RecorderError),
    #[error("invalid checkpoint state: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no checkpoint found under {0}")]
    NotFound(PathBuf),
}

/// `<run>/checkpoints/epoch_NNN`
pub fn checkpoint_dir(run_dir: &Path, epoch: usize) -> PathBuf {
    run_dir.join(CHECKPOINTS_DIR).join(format!("epoch_{:03}", epoch))
}

/// Saves both networks, their optimizer states and the loop position.
pub fn save_checkpoint<B, OG, OD>(
    run_dir: &Path,
    generator: &Learner<Generator<B>, OG>,
    discriminator: &Learner<Discriminator<B>, OD>,
    state: CheckpointState,
) -> Result<PathBuf, CheckpointError>
where
    B: AutodiffBackend,
    OG: Optimizer<Generator<B>, B>,
    OD: Optimizer<Discriminator<B>, B>,
{
    let dir = checkpoint_dir(run_dir, state.epoch);
    fs::create_dir_all(&dir)?;

    let recorder = CompactRecorder::new();
    generator
        .model()
        .clone()
        .save_file(dir.join("generator"), &recorder)?;
    discriminator
        .model()
        .clone()
        .save_file(dir.join("discriminator"), &recorder)?;
    recorder.record(generator.optimizer().to_record(), dir.join("optimizer_g"))?;
    recorder.record(discriminator.optimizer().to_record(), dir.join("optimizer_d"))?;
    fs::write(dir.join(STATE_FILE), serde_json::to_string_pretty(&state)?)?;

    info!("Checkpoint saved: {}", dir.display());
    Ok(dir)
}

/// Restores both learners from `dir` and returns the saved loop position.
pub fn load_checkpoint<B, OG, OD>(
    dir: &Path,
    generator: &mut Learner<Generator<B>, OG>,
    discriminator: &mut Learner<Discriminator<B>, OD>,
    device: &B::Device,
) -> Result<CheckpointState, CheckpointError>
where
    B: AutodiffBackend,
    OG: Optimizer<Generator<B>, B>,
    OD: Optimizer<Discriminator<B>, B>,
{
    let state_path = dir.join(STATE_FILE);
    if !state_path.exists() {
        return Err(CheckpointError::NotFound(dir.to_path_buf()));
    }
    let state: CheckpointState = serde_json::from_str(&fs::read_to_string(state_path)?)?;

    let recorder = CompactRecorder::new();
    generator.model = generator
        .model
        .clone()
        .load_file(dir.join("generator"), &recorder, device)?;
    discriminator.model = discriminator
        .model
        .clone()
        .load_file(dir.join("discriminator"), &recorder, device)?;

    let record = recorder.load(dir.join("optimizer_g"), device)?;
    generator.optimizer = generator.optimizer.clone().load_record(record);
    let record = recorder.load(dir.join("optimizer_d"), device)?;
    discriminator.optimizer = discriminator.optimizer.clone().load_record(record);

    info!(
        "Resumed from {} (epoch {}, step {})",
        dir.display(),
        state.epoch,
        state.global_step
    );
    Ok(state)
}

/// Newest complete checkpoint under `run_dir`, if any
pub fn latest_checkpoint(run_dir: &Path) -> Result<Option<PathBuf>, CheckpointError> {
    let root = run_dir.join(CHECKPOINTS_DIR);
    if !root.is_dir() {
        return Ok(None);
    }

    let mut latest: Option<(usize, PathBuf)> = None;
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        let epoch = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix("epoch_"))
            .and_then(|digits| digits.parse::<usize>().ok());
        let Some(epoch) = epoch else { continue };
        if !path.join(STATE_FILE).exists() {
            continue;
        }
        if latest.as_ref().is_none_or(|(best, _)| epoch > *best) {
            latest = Some((epoch, path));
        }
    }
    Ok(latest.map(|(_, path)| path))
}

/// Loads only the generator, on any backend, for sampling
pub fn load_generator<B: Backend>(
    dir: &Path,
    config: &ModelConfig,
    device: &B::Device,
) -> Result<Generator<B>, CheckpointError> {
    let generator = config
        .init_generator::<B>(device)
        .load_file(dir.join("generator"), &CompactRecorder::new(), device)?;
    info!("Generator loaded from {}", dir.display());
    Ok(generator)
}
