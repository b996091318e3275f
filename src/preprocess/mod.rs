//! Dataset preprocessing.
//!
//! Turns a directory of folk song scores into the training corpus:
//! - [`loader`]: dataset scan and parsing
//! - [`filter`]: acceptable-duration filter
//! - [`transpose`]: transposition to C major / A minor
//! - [`encoder`]: time-step symbol encoding and decoding
//! - [`corpus`]: encoded song files and the delimited corpus
//! - [`pipeline`]: the whole stage end to end

pub mod corpus;
pub mod encoder;
pub mod filter;
pub mod loader;
pub mod pipeline;
pub mod transpose;

pub use corpus::{load_encoded_songs, save_encoded_song, Corpus};
pub use encoder::{decode_song, encode_song, DEFAULT_TIME_STEP};
pub use filter::{has_acceptable_durations, ACCEPTABLE_DURATIONS};
pub use loader::{find_score_files, load_songs, LoadedDataset, LoadedScore};
pub use pipeline::{preprocess_dataset, PreprocessOutput, PreprocessSummary};
pub use transpose::{interval_to_canonical, transpose_to_canonical};
