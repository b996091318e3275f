//! Model file persistence.
//!
//! The weights are stored as one JSON document together with the
//! architecture, the fingerprint of the vocabulary they were trained
//! against, the encoding time step and the training summary.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MelodyError, Result};
use crate::training::TrainingSummary;
use crate::types::ModelConfig;
use crate::vocabulary::Vocabulary;

use super::lstm::{LstmModel, LstmParams};

/// Current model file format.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Files that must exist in the data directory before generation.
pub const REQUIRED_GENERATION_FILES: &[&str] = &[
    crate::config::MAPPING_FILE_NAME,
    crate::config::MODEL_FILE_NAME,
];

/// Checks if all files needed for generation exist in the data directory.
///
/// Returns Ok(()) if all files exist, or an error listing missing files.
pub fn check_artifacts(data_dir: &Path) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_GENERATION_FILES
        .iter()
        .copied()
        .filter(|file| !data_dir.join(file).exists())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MelodyError::new(
            crate::error::ErrorCode::MissingArtifact,
            format!(
                "Missing files in {}: {}",
                data_dir.display(),
                missing.join(", ")
            ),
        ))
    }
}

/// Serialized form of a trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub config: ModelConfig,
    pub vocabulary_fingerprint: String,
    /// Time step of the encoding the model was trained on.
    pub time_step: f64,
    pub summary: TrainingSummary,
    pub params: LstmParams,
}

impl ModelArtifact {
    pub fn new(
        model: LstmModel,
        vocabulary: &Vocabulary,
        time_step: f64,
        summary: TrainingSummary,
    ) -> Self {
        let (config, params) = model.into_parts();
        Self {
            format_version: MODEL_FORMAT_VERSION,
            config,
            vocabulary_fingerprint: vocabulary.fingerprint(),
            time_step,
            summary,
            params,
        }
    }

    /// Writes the artifact as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self).map_err(|e| {
            MelodyError::invalid_artifact(format!("cannot serialize model: {}", e))
        })?;
        std::fs::write(path, json).map_err(|e| MelodyError::io(path, e))
    }

    /// Reads an artifact, checking the format version and weight shapes.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MelodyError::missing_artifact(path));
        }
        let content = std::fs::read_to_string(path).map_err(|e| MelodyError::io(path, e))?;
        let artifact: Self = serde_json::from_str(&content).map_err(|e| {
            MelodyError::invalid_artifact(format!("{}: {}", path.display(), e))
        })?;

        if artifact.format_version != MODEL_FORMAT_VERSION {
            return Err(MelodyError::invalid_artifact(format!(
                "{}: format version {} is not supported (expected {})",
                path.display(),
                artifact.format_version,
                MODEL_FORMAT_VERSION
            )));
        }
        if !(artifact.time_step > 0.0 && artifact.time_step.is_finite()) {
            return Err(MelodyError::invalid_artifact(format!(
                "{}: invalid time step {}",
                path.display(),
                artifact.time_step
            )));
        }
        artifact.params.check_shapes(&artifact.config)?;

        Ok(artifact)
    }

    /// Builds the model, checking it was trained against `vocabulary`.
    pub fn into_model(self, vocabulary: &Vocabulary) -> Result<LstmModel> {
        let fingerprint = vocabulary.fingerprint();
        if self.vocabulary_fingerprint != fingerprint {
            return Err(MelodyError::invalid_artifact(format!(
                "model was trained on vocabulary {} but mapping is {}",
                self.vocabulary_fingerprint, fingerprint
            )));
        }
        if self.config.vocab_size != vocabulary.len() {
            return Err(MelodyError::invalid_artifact(format!(
                "model expects {} symbols but mapping has {}",
                self.config.vocab_size,
                vocabulary.len()
            )));
        }
        LstmModel::new(self.config, self.params)
    }
}

/// Loaded model together with its vocabulary and encoding time step.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub model: LstmModel,
    pub vocabulary: Vocabulary,
    pub time_step: f64,
}

/// Loads the mapping and model file and checks they belong together.
pub fn load_model(model_path: &Path, mapping_path: &Path) -> Result<LoadedModel> {
    let vocabulary = Vocabulary::load(mapping_path)?;
    let artifact = ModelArtifact::load(model_path)?;
    let time_step = artifact.time_step;
    tracing::debug!(
        path = %model_path.display(),
        vocab_size = artifact.config.vocab_size,
        hidden_size = artifact.config.hidden_size,
        final_loss = artifact.summary.final_loss,
        "model loaded"
    );
    let model = artifact.into_model(&vocabulary)?;
    Ok(LoadedModel {
        model,
        vocabulary,
        time_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::NextSymbolModel;
    use crate::types::parse_symbols;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fixture() -> (LstmModel, Vocabulary) {
        let vocabulary = Vocabulary::from_symbols(&parse_symbols("60 _ r /").unwrap());
        let config = ModelConfig {
            vocab_size: vocabulary.len(),
            hidden_size: 5,
            sequence_length: 3,
            dropout: 0.1,
        };
        let model = LstmModel::init(config, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        (model, vocabulary)
    }

    fn summary() -> TrainingSummary {
        TrainingSummary {
            epochs: 1,
            examples: 10,
            batch_size: 4,
            seed: 0,
            final_loss: 1.2,
            loss_history: vec![1.2],
        }
    }

    #[test]
    fn save_load_preserves_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let (model, vocabulary) = fixture();
        let before = model.predict(&[0, 1, 2]).unwrap();

        let model_path = dir.path().join("model.json");
        let mapping_path = dir.path().join("mapping.json");
        vocabulary.save(&mapping_path).unwrap();
        ModelArtifact::new(model, &vocabulary, 0.25, summary())
            .save(&model_path)
            .unwrap();

        let loaded = load_model(&model_path, &mapping_path).unwrap();
        assert_eq!(loaded.time_step, 0.25);
        let after = loaded.model.predict(&[0, 1, 2]).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn fingerprint_mismatch_is_rejected() {
        let (model, vocabulary) = fixture();
        let artifact = ModelArtifact::new(model, &vocabulary, 0.25, summary());
        let other = Vocabulary::from_symbols(&parse_symbols("_ 60 r /").unwrap());
        let err = artifact.into_model(&other).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArtifact);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let (model, vocabulary) = fixture();
        let mut artifact = ModelArtifact::new(model, &vocabulary, 0.25, summary());
        artifact.format_version = 99;
        artifact.save(&path).unwrap();
        assert_eq!(
            ModelArtifact::load(&path).unwrap_err().code,
            ErrorCode::InvalidArtifact
        );

        std::fs::write(&path, "{}").unwrap();
        assert_eq!(
            ModelArtifact::load(&path).unwrap_err().code,
            ErrorCode::InvalidArtifact
        );
    }

    #[test]
    fn missing_files_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_artifacts(dir.path()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingArtifact);
        assert!(err.message.contains("mapping.json"));
        assert!(err.message.contains("model.json"));

        assert_eq!(
            ModelArtifact::load(&dir.path().join("model.json")).unwrap_err().code,
            ErrorCode::MissingArtifact
        );
    }
}
