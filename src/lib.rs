pub mod data;
pub mod inference;
pub mod model;
pub mod tracking;
pub mod training;
