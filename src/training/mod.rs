//! Model training.
//!
//! - [`sequences`]: sliding-window `(window, target)` examples
//! - [`trainer`]: mini-batch Adam loop and the train stage

pub mod sequences;
pub mod trainer;

pub use sequences::{one_hot, SequenceDataset};
pub use trainer::{train_from_artifacts, train_model, TrainingSummary};
