//! Melody generation module.
//!
//! Provides the sampling state machine and the generation pipeline.

pub mod generator;
pub mod pipeline;

// Re-export commonly used items
pub use generator::{
    GeneratedMelody, GeneratorState, MelodyGenerator, SamplingOptions, TerminationReason,
};
pub use pipeline::{generate_melody, GenerationOutcome, GenerationRequest};
