pub mod grid;
pub mod sampler;

pub use grid::{make_grid, render_grid, GridError};
pub use sampler::{InferenceError, Sampler};
