//! Mini-batch training loop.
//!
//! Each epoch shuffles the examples with the seeded RNG, then walks them in
//! batches: forward pass with dropout, mean cross-entropy, backpropagation
//! through time, optional global-norm clipping and an Adam step.

use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{PipelineConfig, TrainingConfig};
use crate::error::{MelodyError, Result};
use crate::models::{clip_by_global_norm, Adam, AdamConfig, LstmModel, ModelArtifact};
use crate::preprocess::Corpus;
use crate::types::ModelConfig;
use crate::vocabulary::Vocabulary;

use super::sequences::SequenceDataset;

/// What a training run did, persisted with the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub epochs: usize,
    pub examples: usize,
    pub batch_size: usize,
    pub seed: u64,
    /// Mean loss of the last epoch.
    pub final_loss: f32,
    /// Mean loss of every epoch.
    pub loss_history: Vec<f32>,
}

/// Trains a fresh model on an id sequence.
pub fn train_model(
    ids: &[usize],
    vocab_size: usize,
    sequence_length: usize,
    config: &TrainingConfig,
    show_progress: bool,
) -> Result<(LstmModel, TrainingSummary)> {
    let dataset = SequenceDataset::new(ids, sequence_length)?;
    if dataset.is_empty() {
        return Err(MelodyError::training_failed(format!(
            "corpus has {} symbols; at least {} are needed for one example",
            ids.len(),
            sequence_length + 1
        )));
    }
    if config.batch_size == 0 || config.epochs == 0 {
        return Err(MelodyError::invalid_config("batch_size and epochs must be > 0"));
    }

    let model_config = ModelConfig {
        vocab_size,
        hidden_size: config.hidden_size,
        sequence_length,
        dropout: config.dropout,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut model = LstmModel::init(model_config, &mut rng)?;
    let mut optimizer = Adam::new(
        AdamConfig {
            learning_rate: config.learning_rate,
            ..Default::default()
        },
        model.params(),
    );

    let examples = dataset.len();
    let batches_per_epoch = examples.div_ceil(config.batch_size);
    tracing::info!(
        examples,
        vocab_size,
        hidden_size = config.hidden_size,
        parameters = model.config().parameter_count(),
        epochs = config.epochs,
        batch_size = config.batch_size,
        "training started"
    );

    let progress = if show_progress {
        let pb = ProgressBar::new((config.epochs * batches_per_epoch) as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] epoch {msg} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut order: Vec<usize> = (0..examples).collect();
    let mut loss_history = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        order.shuffle(&mut rng);
        progress.set_message(format!("{}/{}", epoch, config.epochs));

        let mut total_loss = 0.0f64;
        for batch in order.chunks(config.batch_size) {
            let mut windows = Vec::with_capacity(batch.len());
            let mut targets = Vec::with_capacity(batch.len());
            for &i in batch {
                if let Some((window, target)) = dataset.get(i) {
                    windows.push(window);
                    targets.push(target);
                }
            }

            let mask = model.dropout_mask(windows.len(), &mut rng)?;
            let (loss, mut grads) = model.loss_and_gradients(&windows, &targets, Some(&mask))?;
            if !loss.is_finite() {
                return Err(MelodyError::training_failed(format!(
                    "loss became {} in epoch {}",
                    loss, epoch
                )));
            }

            if let Some(max_norm) = config.clip_norm {
                clip_by_global_norm(&mut grads, max_norm);
            }
            optimizer.update(model.params_mut(), &grads);

            total_loss += loss as f64 * windows.len() as f64;
            progress.inc(1);
        }

        let epoch_loss = (total_loss / examples as f64) as f32;
        loss_history.push(epoch_loss);
        tracing::info!(epoch, loss = epoch_loss, "epoch complete");
    }
    progress.finish_and_clear();

    if !model.params().is_finite() {
        return Err(MelodyError::training_failed("weights diverged to non-finite values"));
    }

    let summary = TrainingSummary {
        epochs: config.epochs,
        examples,
        batch_size: config.batch_size,
        seed: config.seed,
        final_loss: loss_history.last().copied().unwrap_or(f32::NAN),
        loss_history,
    };
    tracing::info!(
        final_loss = summary.final_loss,
        steps = optimizer.steps(),
        "training complete"
    );

    Ok((model, summary))
}

/// Loads the corpus and mapping from the data directory, trains, and writes
/// the model file.
pub fn train_from_artifacts(
    config: &PipelineConfig,
    show_progress: bool,
) -> Result<(ModelArtifact, TrainingSummary)> {
    if let Some(msg) = config.validate() {
        return Err(MelodyError::invalid_config(msg));
    }

    let corpus = Corpus::load(&config.corpus_path())?;
    let vocabulary = Vocabulary::load(&config.mapping_path())?;
    let ids = corpus.to_ids(&vocabulary).map_err(|e| {
        MelodyError::invalid_artifact(format!("corpus does not match mapping: {}", e))
    })?;

    let (model, summary) = train_model(
        &ids,
        vocabulary.len(),
        config.preprocess.sequence_length,
        &config.training,
        show_progress,
    )?;

    let artifact = ModelArtifact::new(
        model,
        &vocabulary,
        config.preprocess.time_step,
        summary.clone(),
    );
    let model_path = config.model_path();
    artifact.save(&model_path)?;
    tracing::info!(path = %model_path.display(), "model saved");

    Ok((artifact, summary))
}
