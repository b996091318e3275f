//! Core types for melody-lstm.
//!
//! This module re-exports all the core data types used throughout the pipeline:
//! - [`Score`]: A monophonic melody of notes and rests
//! - [`Symbol`]: One encoded time step
//! - [`ModelConfig`]: Shape parameters of the LSTM

mod config;
mod score;
mod symbol;

// Re-export all types at the module level
pub use config::ModelConfig;
pub use score::{Event, EventKind, Key, Mode, Score};
pub use symbol::{
    join_symbols, parse_symbols, ParseSymbolError, Symbol, DELIMITER_TOKEN, HOLD_TOKEN,
    REST_TOKEN,
};
