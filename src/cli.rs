//! CLI argument parser.
//!
//! One subcommand per pipeline stage: `preprocess`, `train`, `generate`.
//! Flags override values from the config file and environment.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::PipelineConfig;
use crate::error::Result;

/// melody-lstm: folk melody generation with an LSTM
#[derive(Parser, Debug)]
#[command(name = "melody-lstm")]
#[command(about = "Preprocess kern folk songs, train an LSTM and sample new melodies")]
#[command(version)]
pub struct Cli {
    /// Directory for encoded songs, corpus, mapping and model
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Hide progress bars
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Encode a dataset of kern files into corpus and mapping
    Preprocess {
        /// Directory of score files
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Window length; also the delimiter run between songs
        #[arg(long)]
        sequence_length: Option<usize>,
    },

    /// Train the LSTM on the corpus
    Train {
        /// Training epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Examples per batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// LSTM units
        #[arg(long)]
        hidden_size: Option<usize>,

        /// Adam learning rate
        #[arg(long)]
        learning_rate: Option<f32>,

        /// Seed for initialisation and shuffling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Sample a melody from the trained model
    Generate {
        /// Space-separated seed tokens, e.g. "67 _ 65 _"
        #[arg(short, long)]
        seed: Option<String>,

        /// Sampling temperature (> 0)
        #[arg(short, long)]
        temperature: Option<f32>,

        /// Maximum number of sampled symbols
        #[arg(short, long)]
        max_steps: Option<usize>,

        /// Output score file (.mid or .krn)
        #[arg(short, long, default_value = "melody.mid")]
        output: PathBuf,

        /// Also render the melody to a WAV file
        #[arg(long)]
        wav: Option<PathBuf>,

        /// Random seed for reproducible sampling
        #[arg(long)]
        rng_seed: Option<u64>,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Builds the effective configuration: defaults, then the config file,
    /// then `MELODY_*` variables, then flags.
    pub fn resolve_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = PipelineConfig::from_file(path)?;
                config.apply_env();
                config
            }
            None => PipelineConfig::from_env(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Applies flag values on top of `config`.
    pub fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }

        match &self.command {
            Command::Preprocess {
                dataset,
                sequence_length,
            } => {
                if let Some(path) = dataset {
                    config.dataset_path = Some(path.clone());
                }
                if let Some(n) = sequence_length {
                    config.preprocess.sequence_length = *n;
                }
            }
            Command::Train {
                epochs,
                batch_size,
                hidden_size,
                learning_rate,
                seed,
            } => {
                let t = &mut config.training;
                t.epochs = epochs.unwrap_or(t.epochs);
                t.batch_size = batch_size.unwrap_or(t.batch_size);
                t.hidden_size = hidden_size.unwrap_or(t.hidden_size);
                t.learning_rate = learning_rate.unwrap_or(t.learning_rate);
                t.seed = seed.unwrap_or(t.seed);
            }
            Command::Generate {
                seed,
                temperature,
                max_steps,
                ..
            } => {
                let g = &mut config.generation;
                if let Some(seed) = seed {
                    g.seed_melody = seed.clone();
                }
                g.temperature = temperature.unwrap_or(g.temperature);
                g.max_steps = max_steps.unwrap_or(g.max_steps);
            }
        }
    }

    /// Whether progress bars should be drawn.
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}
