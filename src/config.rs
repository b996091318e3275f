//! Pipeline configuration module.
//!
//! Contains the runtime configuration for melody-lstm: artifact locations,
//! preprocessing grid, training hyperparameters and generation defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MelodyError, Result};
use crate::preprocess::{ACCEPTABLE_DURATIONS, DEFAULT_TIME_STEP};

/// Encoded songs directory name inside the data directory.
pub const ENCODED_DIR_NAME: &str = "encoded";

/// Corpus file name inside the data directory.
pub const CORPUS_FILE_NAME: &str = "corpus.txt";

/// Vocabulary mapping file name inside the data directory.
pub const MAPPING_FILE_NAME: &str = "mapping.json";

/// Model weights file name inside the data directory.
pub const MODEL_FILE_NAME: &str = "model.json";

/// Runtime configuration for the pipeline.
///
/// Loaded from defaults, an optional JSON file and `MELODY_*` environment
/// variables; command-line flags override individual values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding encoded songs, corpus, mapping and model.
    /// If None, uses the platform-specific default data location.
    pub data_dir: Option<PathBuf>,

    /// Directory of raw score files to preprocess.
    pub dataset_path: Option<PathBuf>,

    /// Preprocessing options.
    pub preprocess: PreprocessConfig,

    /// Training hyperparameters.
    pub training: TrainingConfig,

    /// Generation defaults.
    pub generation: GenerationConfig,
}

/// Preprocessing options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Encoding grid in quarter lengths (0.25 = sixteenth note).
    pub time_step: f64,

    /// Training window length; also the delimiter run between songs.
    pub sequence_length: usize,

    /// Durations a score may use to be included.
    pub acceptable_durations: Vec<f64>,

    /// File extensions read from the dataset directory.
    pub extensions: Vec<String>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            time_step: DEFAULT_TIME_STEP,
            sequence_length: 64,
            acceptable_durations: ACCEPTABLE_DURATIONS.to_vec(),
            extensions: vec!["krn".to_string()],
        }
    }
}

/// Training hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of LSTM units.
    pub hidden_size: usize,

    /// Dropout applied to the final hidden state.
    pub dropout: f32,

    /// Adam learning rate.
    pub learning_rate: f32,

    /// Passes over the training examples.
    pub epochs: usize,

    /// Examples per optimiser step.
    pub batch_size: usize,

    /// Global gradient-norm clip; None disables clipping.
    pub clip_norm: Option<f32>,

    /// Seed for initialisation, shuffling and dropout.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_size: 256,
            dropout: 0.2,
            learning_rate: 0.001,
            epochs: 50,
            batch_size: 64,
            clip_norm: Some(5.0),
            seed: 42,
        }
    }
}

/// Generation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum number of sampled symbols.
    pub max_steps: usize,

    /// Seed melody used when none is given on the command line.
    pub seed_melody: String,

    /// Playback tempo for exported files, quarter notes per minute.
    pub tempo_bpm: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_steps: 500,
            seed_melody: "67 _ 67 _ 67 _ _ 65 64 _ 64 _ 64 _ _".to_string(),
            tempo_bpm: 120,
        }
    }
}

impl PipelineConfig {
    /// Creates a new PipelineConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a JSON configuration file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MelodyError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            MelodyError::invalid_config(format!("{}: {}", path.display(), e))
        })
    }

    /// Creates a PipelineConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `MELODY_DATA_DIR` - Artifact directory
    /// - `MELODY_DATASET` - Raw dataset directory
    /// - `MELODY_SEQUENCE_LENGTH` - Training window length
    /// - `MELODY_TIME_STEP` - Encoding grid in quarter lengths
    /// - `MELODY_HIDDEN_SIZE` - LSTM units
    /// - `MELODY_EPOCHS` - Training epochs
    /// - `MELODY_BATCH_SIZE` - Training batch size
    /// - `MELODY_LEARNING_RATE` - Adam learning rate
    /// - `MELODY_TEMPERATURE` - Sampling temperature
    /// - `MELODY_MAX_STEPS` - Maximum generated symbols
    ///
    /// Falls back to defaults for unset or unparsable variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overrides fields from `MELODY_*` environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("MELODY_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("MELODY_DATASET") {
            self.dataset_path = Some(PathBuf::from(path));
        }

        if let Some(n) = env_parse::<usize>("MELODY_SEQUENCE_LENGTH").filter(|n| *n > 0) {
            self.preprocess.sequence_length = n;
        }

        if let Some(step) = env_parse::<f64>("MELODY_TIME_STEP").filter(|s| *s > 0.0) {
            self.preprocess.time_step = step;
        }

        if let Some(n) = env_parse::<usize>("MELODY_HIDDEN_SIZE").filter(|n| *n > 0) {
            self.training.hidden_size = n;
        }

        if let Some(n) = env_parse::<usize>("MELODY_EPOCHS").filter(|n| *n > 0) {
            self.training.epochs = n;
        }

        if let Some(n) = env_parse::<usize>("MELODY_BATCH_SIZE").filter(|n| *n > 0) {
            self.training.batch_size = n;
        }

        if let Some(lr) = env_parse::<f32>("MELODY_LEARNING_RATE").filter(|lr| *lr > 0.0) {
            self.training.learning_rate = lr;
        }

        // Not range-checked here; the generator reports bad temperatures.
        if let Some(t) = env_parse::<f32>("MELODY_TEMPERATURE") {
            self.generation.temperature = t;
        }

        if let Some(n) = env_parse::<usize>("MELODY_MAX_STEPS") {
            self.generation.max_steps = n;
        }
    }

    /// Returns the effective data directory, using platform defaults if not specified.
    pub fn effective_data_dir(&self) -> PathBuf {
        if let Some(ref path) = self.data_dir {
            path.clone()
        } else {
            default_data_dir()
        }
    }

    pub fn encoded_dir(&self) -> PathBuf {
        self.effective_data_dir().join(ENCODED_DIR_NAME)
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.effective_data_dir().join(CORPUS_FILE_NAME)
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.effective_data_dir().join(MAPPING_FILE_NAME)
    }

    pub fn model_path(&self) -> PathBuf {
        self.effective_data_dir().join(MODEL_FILE_NAME)
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        let p = &self.preprocess;
        if !(p.time_step > 0.0 && p.time_step.is_finite()) {
            return Some(format!("time_step must be > 0, got {}", p.time_step));
        }
        if p.sequence_length == 0 {
            return Some("sequence_length must be > 0".to_string());
        }
        if p.acceptable_durations.is_empty() {
            return Some("acceptable_durations cannot be empty".to_string());
        }
        if p.extensions.is_empty() {
            return Some("extensions cannot be empty".to_string());
        }

        let t = &self.training;
        if t.hidden_size == 0 {
            return Some("hidden_size must be > 0".to_string());
        }
        if t.batch_size == 0 {
            return Some("batch_size must be > 0".to_string());
        }
        if t.epochs == 0 {
            return Some("epochs must be > 0".to_string());
        }
        if !(t.learning_rate > 0.0 && t.learning_rate.is_finite()) {
            return Some(format!("learning_rate must be > 0, got {}", t.learning_rate));
        }
        if !(0.0..1.0).contains(&t.dropout) {
            return Some(format!("dropout must be in [0, 1), got {}", t.dropout));
        }
        if let Some(clip) = t.clip_norm {
            if clip <= 0.0 {
                return Some(format!("clip_norm must be > 0, got {}", clip));
            }
        }

        if self.generation.tempo_bpm == 0 {
            return Some("tempo_bpm must be > 0".to_string());
        }

        None
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            dataset_path: None,
            preprocess: PreprocessConfig::default(),
            training: TrainingConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Returns the platform-specific default data path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Application Support/melody-lstm
/// - Linux: ~/.local/share/melody-lstm
/// - Windows: C:\Users\<user>\AppData\Roaming\melody-lstm\data
fn default_data_dir() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "melody-lstm") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        // Fallback to current directory
        PathBuf::from("./data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_setup() {
        let config = PipelineConfig::new();
        assert_eq!(config.preprocess.sequence_length, 64);
        assert_eq!(config.preprocess.time_step, 0.25);
        assert_eq!(config.preprocess.acceptable_durations.len(), 8);
        assert_eq!(config.training.hidden_size, 256);
        assert_eq!(config.training.batch_size, 64);
        assert_eq!(config.training.epochs, 50);
        assert_eq!(config.generation.max_steps, 500);
        assert!(config.validate().is_none());
    }

    #[test]
    fn config_validation() {
        let mut config = PipelineConfig::new();
        config.preprocess.time_step = 0.0;
        assert!(config.validate().is_some());

        let mut config = PipelineConfig::new();
        config.training.dropout = 1.5;
        assert!(config.validate().is_some());

        let mut config = PipelineConfig::new();
        config.training.clip_norm = Some(0.0);
        assert!(config.validate().is_some());

        let mut config = PipelineConfig::new();
        config.training.clip_norm = None;
        assert!(config.validate().is_none());
    }

    #[test]
    fn artifact_paths_share_data_dir() {
        let config = PipelineConfig {
            data_dir: Some(PathBuf::from("/tmp/melody")),
            ..Default::default()
        };
        assert_eq!(config.corpus_path(), PathBuf::from("/tmp/melody/corpus.txt"));
        assert_eq!(config.mapping_path(), PathBuf::from("/tmp/melody/mapping.json"));
        assert_eq!(config.model_path(), PathBuf::from("/tmp/melody/model.json"));
        assert_eq!(config.encoded_dir(), PathBuf::from("/tmp/melody/encoded"));
    }

    #[test]
    fn default_data_dir_is_valid() {
        let config = PipelineConfig::new();
        assert!(!config.effective_data_dir().as_os_str().is_empty());
    }

    #[test]
    fn partial_json_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "preprocess": { "sequence_length": 32 }, "training": { "epochs": 3 } }"#,
        )
        .unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.preprocess.sequence_length, 32);
        assert_eq!(config.preprocess.time_step, 0.25);
        assert_eq!(config.training.epochs, 3);
        assert_eq!(config.training.hidden_size, 256);
    }

    #[test]
    fn malformed_json_file_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = PipelineConfig::from_file(&path).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidConfig);
    }
}
