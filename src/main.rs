//! melody-lstm: folk melody generation with an LSTM.
//!
//! Subcommands:
//! - `melody-lstm preprocess --dataset <dir>` - encode scores into corpus and mapping
//! - `melody-lstm train` - train the model on the corpus
//! - `melody-lstm generate --seed "<tokens>"` - sample and export a melody

use std::time::Instant;

use anyhow::{Context, Result};

use melody_lstm::cli::{Cli, Command};
use melody_lstm::config::PipelineConfig;
use melody_lstm::generation::{generate_melody, GenerationRequest};
use melody_lstm::notation::{KernEngine, MidiParams};
use melody_lstm::preprocess::preprocess_dataset;
use melody_lstm::training::train_from_artifacts;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    let config = cli.resolve_config().context("failed to load configuration")?;
    if let Some(msg) = config.validate() {
        anyhow::bail!("invalid configuration: {}", msg);
    }

    let engine = KernEngine::new(MidiParams {
        tempo_bpm: config.generation.tempo_bpm,
        ..Default::default()
    });

    match &cli.command {
        Command::Preprocess { .. } => run_preprocess(&cli, &config, &engine),
        Command::Train { .. } => run_train(&cli, &config),
        Command::Generate {
            output,
            wav,
            rng_seed,
            ..
        } => {
            let request = GenerationRequest {
                wav: wav.clone(),
                rng_seed: *rng_seed,
                ..GenerationRequest::from_config(&config, output.clone())
            };
            run_generate(&config, &engine, &request)
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_preprocess(cli: &Cli, config: &PipelineConfig, engine: &KernEngine) -> Result<()> {
    let dataset = config
        .dataset_path
        .clone()
        .context("no dataset given; pass --dataset or set MELODY_DATASET")?;
    let data_dir = config.effective_data_dir();

    eprintln!("=== melody-lstm preprocess ===");
    eprintln!("Dataset: {}", dataset.display());
    eprintln!("Data directory: {}", data_dir.display());
    eprintln!("Sequence length: {}", config.preprocess.sequence_length);
    eprintln!("Time step: {}", config.preprocess.time_step);
    eprintln!();

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("cannot create {}", data_dir.display()))?;

    let start_time = Instant::now();
    let output = preprocess_dataset(engine, &dataset, config, cli.show_progress())?;
    let summary = &output.summary;

    eprintln!();
    eprintln!("Preprocessing complete!");
    eprintln!("  Time: {:.2}s", start_time.elapsed().as_secs_f32());
    eprintln!("  Files: {}", summary.files_found);
    eprintln!("  Encoded songs: {}", summary.songs_encoded);
    eprintln!("  Rejected (durations): {}", summary.rejected_durations);
    eprintln!("  Skipped (unreadable): {}", summary.unreadable);
    eprintln!("  Skipped (key): {}", summary.transpose_failed);
    eprintln!("  Corpus length: {}", summary.corpus_length);
    eprintln!("  Vocabulary size: {}", summary.vocabulary_size);

    Ok(())
}

fn run_train(cli: &Cli, config: &PipelineConfig) -> Result<()> {
    let t = &config.training;

    eprintln!("=== melody-lstm train ===");
    eprintln!("Data directory: {}", config.effective_data_dir().display());
    eprintln!("Hidden size: {}", t.hidden_size);
    eprintln!("Epochs: {}", t.epochs);
    eprintln!("Batch size: {}", t.batch_size);
    eprintln!("Learning rate: {}", t.learning_rate);
    eprintln!("Seed: {}", t.seed);
    eprintln!();

    let start_time = Instant::now();
    let (_, summary) = train_from_artifacts(config, cli.show_progress())?;

    eprintln!();
    eprintln!("Training complete!");
    eprintln!("  Time: {:.2}s", start_time.elapsed().as_secs_f32());
    eprintln!("  Examples: {}", summary.examples);
    eprintln!("  Final loss: {:.4}", summary.final_loss);
    eprintln!("Saved to: {}", config.model_path().display());

    Ok(())
}

fn run_generate(
    config: &PipelineConfig,
    engine: &KernEngine,
    request: &GenerationRequest,
) -> Result<()> {
    eprintln!("=== melody-lstm generate ===");
    eprintln!("Seed: \"{}\"", request.seed);
    eprintln!("Temperature: {}", request.temperature);
    eprintln!("Max steps: {}", request.max_steps);
    eprintln!("Output: {}", request.output.display());
    eprintln!();

    let outcome = generate_melody(config, engine, request)?;

    eprintln!("Generation complete!");
    eprintln!("  Symbols: {}", outcome.melody.symbols.len());
    eprintln!("  Notes: {}", outcome.score.note_count());
    eprintln!("  Quarter lengths: {}", outcome.score.total_duration());
    eprintln!("  Stopped: {:?}", outcome.melody.reason);
    eprintln!("  RNG seed: {}", outcome.rng_seed);
    eprintln!("Saved to: {}", request.output.display());
    if let Some(wav) = &request.wav {
        eprintln!("Audio: {}", wav.display());
    }

    Ok(())
}
