//! Generation pipeline.
//!
//! Loads the mapping and model from the data directory, samples a melody
//! from a seed, decodes it and exports it through the notation engine.

use std::path::PathBuf;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::audio::{render_score, samples_to_duration, write_wav, SAMPLE_RATE};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{check_artifacts, load_model, validate_temperature, NextSymbolModel};
use crate::notation::NotationEngine;
use crate::types::Score;

use super::generator::{GeneratedMelody, MelodyGenerator, SamplingOptions};

/// One generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Space-separated seed tokens, e.g. `"67 _ 65 _"`.
    pub seed: String,
    pub temperature: f32,
    pub max_steps: usize,
    /// Score file to write; the extension selects the format.
    pub output: PathBuf,
    /// Optional rendered audio.
    pub wav: Option<PathBuf>,
    /// Random seed; None draws one from the OS.
    pub rng_seed: Option<u64>,
}

impl GenerationRequest {
    /// Request using the configured seed, temperature and length.
    pub fn from_config(config: &PipelineConfig, output: PathBuf) -> Self {
        Self {
            seed: config.generation.seed_melody.clone(),
            temperature: config.generation.temperature,
            max_steps: config.generation.max_steps,
            output,
            wav: None,
            rng_seed: None,
        }
    }
}

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub melody: GeneratedMelody,
    pub score: Score,
    /// Random seed actually used.
    pub rng_seed: u64,
}

/// Generates a melody with the model and mapping in the data directory.
pub fn generate_melody(
    config: &PipelineConfig,
    engine: &dyn NotationEngine,
    request: &GenerationRequest,
) -> Result<GenerationOutcome> {
    validate_temperature(request.temperature)?;

    let data_dir = config.effective_data_dir();
    check_artifacts(&data_dir)?;
    let loaded = load_model(&config.model_path(), &config.mapping_path())?;

    let options = SamplingOptions {
        sequence_length: loaded.model.config().sequence_length,
        temperature: request.temperature,
        max_steps: request.max_steps,
    };
    let generator =
        MelodyGenerator::new(&loaded.model, &loaded.vocabulary, &request.seed, options)?;

    let rng_seed = request.rng_seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(rng_seed);
    tracing::info!(
        vocab_size = loaded.model.vocab_size(),
        temperature = request.temperature,
        max_steps = request.max_steps,
        rng_seed,
        "generating melody"
    );

    let melody = generator.run(&mut rng)?;
    let mut score = melody.to_score(loaded.time_step)?;
    score.title = Some("Generated melody".to_string());

    engine.export_score(&score, &request.output)?;
    tracing::info!(
        path = %request.output.display(),
        symbols = melody.symbols.len(),
        notes = score.note_count(),
        reason = ?melody.reason,
        "melody exported"
    );

    if let Some(wav_path) = &request.wav {
        let samples = render_score(&score, config.generation.tempo_bpm, SAMPLE_RATE);
        write_wav(&samples, wav_path, SAMPLE_RATE)?;
        tracing::info!(
            path = %wav_path.display(),
            seconds = samples_to_duration(samples.len(), SAMPLE_RATE),
            "audio rendered"
        );
    }

    Ok(GenerationOutcome {
        melody,
        score,
        rng_seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::notation::KernEngine;

    fn request(dir: &std::path::Path, temperature: f32) -> GenerationRequest {
        GenerationRequest {
            seed: "60 _".to_string(),
            temperature,
            max_steps: 10,
            output: dir.join("out.mid"),
            wav: None,
            rng_seed: Some(1),
        }
    }

    #[test]
    fn invalid_temperature_checked_before_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let engine = KernEngine::default();
        let err = generate_melody(&config, &engine, &request(dir.path(), 0.0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTemperature);
    }

    #[test]
    fn missing_model_is_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let engine = KernEngine::default();
        let err = generate_melody(&config, &engine, &request(dir.path(), 1.0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingArtifact);
    }

    #[test]
    fn request_defaults_come_from_config() {
        let config = PipelineConfig::default();
        let req = GenerationRequest::from_config(&config, PathBuf::from("x.mid"));
        assert_eq!(req.temperature, config.generation.temperature);
        assert_eq!(req.max_steps, 500);
        assert!(req.seed.starts_with("67"));
    }
}
