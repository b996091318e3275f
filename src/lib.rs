//! melody-lstm: folk melody generation with an LSTM.
//!
//! This library preprocesses Humdrum `**kern` folk songs into a time-step
//! symbol corpus, trains a single-layer LSTM to predict the next symbol, and
//! samples new melodies from it with temperature scaling.
//!
//! # Modules
//!
//! - [`types`]: Core data types (Score, Symbol, ModelConfig)
//! - [`notation`]: Kern reading/writing, key estimation, MIDI export
//! - [`preprocess`]: Filter, transposition, encoding, corpus building
//! - [`vocabulary`]: Symbol to id mapping
//! - [`training`]: Sequence windows and the training loop
//! - [`models`]: LSTM, optimiser, sampling, model files
//! - [`generation`]: Sampling state machine and generation pipeline
//! - [`audio`]: Sine rendering and WAV output
//! - [`config`]: Runtime configuration (PipelineConfig)
//! - [`error`]: Error types and codes (MelodyError, ErrorCode)
//!
//! # Example
//!
//! ```rust,ignore
//! use melody_lstm::{
//!     config::PipelineConfig,
//!     generation::{generate_melody, GenerationRequest},
//!     notation::KernEngine,
//!     preprocess::preprocess_dataset,
//!     training::train_from_artifacts,
//! };
//!
//! let config = PipelineConfig::from_env();
//! let engine = KernEngine::default();
//!
//! preprocess_dataset(&engine, "deutschl/erk".as_ref(), &config, true)?;
//! train_from_artifacts(&config, true)?;
//!
//! let request = GenerationRequest::from_config(&config, "melody.mid".into());
//! generate_melody(&config, &engine, &request)?;
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod models;
pub mod notation;
pub mod preprocess;
pub mod training;
pub mod types;
pub mod vocabulary;

// Re-export commonly used types at crate root for convenience
pub use config::PipelineConfig;
pub use error::{ErrorCode, MelodyError, Result};
pub use types::{Event, EventKind, Key, Mode, ModelConfig, Score, Symbol};
pub use vocabulary::Vocabulary;
