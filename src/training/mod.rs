pub mod checkpoint;
pub mod config;
pub mod evaluate;
pub mod loss;
pub mod metrics;
pub mod run;
pub mod trainer;

pub use checkpoint::{load_generator, CheckpointError, CheckpointState};
pub use config::{InvalidConfig, TrainingConfig};
pub use evaluate::{evaluate, EvalSamples};
pub use loss::Targets;
pub use metrics::{EpochMetrics, LossAccumulator, TrainingHistory};
pub use run::{train, RunOptions};
pub use trainer::{train_epoch, train_step, EpochSummary, Learner, StepLosses, TrainingError};
