//! Next-symbol model components.
//!
//! This module contains the LSTM and everything around it:
//! - [`LstmModel`](lstm::LstmModel): forward pass and backpropagation through time
//! - [`Adam`](optimizer::Adam): optimiser and gradient clipping
//! - [`Probabilities`](logits::Probabilities): temperature scaling and sampling
//! - [`ModelArtifact`](loader::ModelArtifact): model file persistence

pub mod loader;
pub mod logits;
pub mod lstm;
pub mod optimizer;

use ndarray::Array1;

use crate::error::Result;

// Re-export commonly used types
pub use loader::{
    check_artifacts, load_model, LoadedModel, ModelArtifact, MODEL_FORMAT_VERSION,
    REQUIRED_GENERATION_FILES,
};
pub use logits::{validate_temperature, Probabilities};
pub use lstm::{LstmModel, LstmParams};
pub use optimizer::{clip_by_global_norm, Adam, AdamConfig};

/// A model that predicts the distribution of the symbol following a window.
pub trait NextSymbolModel {
    /// Number of symbols the model predicts over.
    fn vocab_size(&self) -> usize;

    /// Probability of each symbol id following `window`.
    fn predict(&self, window: &[usize]) -> Result<Array1<f32>>;
}
