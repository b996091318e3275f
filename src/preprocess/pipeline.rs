//! Preprocessing orchestration.
//!
//! ```text
//! dataset/*.krn -> parse -> duration filter -> transpose -> encode
//!               -> encoded/00000.txt ... -> corpus.txt -> mapping.json
//! ```

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::{MelodyError, Result};
use crate::notation::NotationEngine;
use crate::preprocess::corpus::{
    load_encoded_songs, save_encoded_song, Corpus, ENCODED_SONG_EXTENSION,
};
use crate::preprocess::encoder::encode_song;
use crate::preprocess::filter::has_acceptable_durations;
use crate::preprocess::loader::{load_songs, LoadedScore};
use crate::preprocess::transpose::transpose_to_canonical;
use crate::vocabulary::Vocabulary;

/// Counts collected while preprocessing a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreprocessSummary {
    /// Score files found in the dataset.
    pub files_found: usize,
    /// Files that could not be parsed.
    pub unreadable: usize,
    /// Scores excluded by the duration filter.
    pub rejected_durations: usize,
    /// Scores whose key could not be determined or transposed.
    pub transpose_failed: usize,
    /// Songs written to the encoded directory.
    pub songs_encoded: usize,
    /// Symbols in the corpus, delimiters included.
    pub corpus_length: usize,
    /// Distinct symbols in the corpus.
    pub vocabulary_size: usize,
}

/// Result of a preprocessing run.
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    pub corpus: Corpus,
    pub vocabulary: Vocabulary,
    pub summary: PreprocessSummary,
}

/// Runs the full preprocessing stage over `dataset`.
///
/// Writes encoded songs, the corpus and the vocabulary mapping into the
/// configured data directory. Individual scores that cannot be read or
/// transposed are logged and skipped.
pub fn preprocess_dataset(
    engine: &dyn NotationEngine,
    dataset: &Path,
    config: &PipelineConfig,
    show_progress: bool,
) -> Result<PreprocessOutput> {
    if let Some(msg) = config.validate() {
        return Err(MelodyError::invalid_config(msg));
    }

    let options = &config.preprocess;

    let progress = if show_progress {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };
    let loaded = load_songs(engine, dataset, &options.extensions, &progress)?;

    let encoded_dir = config.encoded_dir();
    prepare_encoded_dir(&encoded_dir)?;

    let mut summary = PreprocessSummary {
        files_found: loaded.files_found,
        unreadable: loaded.unreadable,
        ..Default::default()
    };

    for LoadedScore { path, score } in &loaded.songs {
        if !has_acceptable_durations(score, &options.acceptable_durations) {
            tracing::debug!(path = %path.display(), "score has unacceptable durations");
            summary.rejected_durations += 1;
            continue;
        }

        let transposed = match transpose_to_canonical(engine, score) {
            Ok(score) => score,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping score");
                summary.transpose_failed += 1;
                continue;
            }
        };

        let song = encode_song(&transposed, options.time_step);
        if song.is_empty() {
            summary.rejected_durations += 1;
            continue;
        }
        save_encoded_song(&encoded_dir, summary.songs_encoded, &song)?;
        summary.songs_encoded += 1;
    }

    let songs = load_encoded_songs(&encoded_dir)?;
    let corpus = Corpus::from_songs(&songs, options.sequence_length);
    let corpus_path = config.corpus_path();
    corpus.save(&corpus_path)?;

    let vocabulary = corpus.vocabulary();
    let mapping_path = config.mapping_path();
    vocabulary.save(&mapping_path)?;

    summary.corpus_length = corpus.len();
    summary.vocabulary_size = vocabulary.len();

    tracing::info!(
        songs = summary.songs_encoded,
        rejected = summary.rejected_durations,
        unreadable = summary.unreadable,
        corpus_length = summary.corpus_length,
        vocabulary_size = summary.vocabulary_size,
        corpus = %corpus_path.display(),
        mapping = %mapping_path.display(),
        "preprocessing complete"
    );

    Ok(PreprocessOutput {
        corpus,
        vocabulary,
        summary,
    })
}

/// Creates the encoded directory and removes songs from a previous run.
fn prepare_encoded_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| MelodyError::io(dir, e))?;

    for entry in std::fs::read_dir(dir).map_err(|e| MelodyError::io(dir, e))? {
        let path = entry.map_err(|e| MelodyError::io(dir, e))?.path();
        let encoded = path.extension().and_then(|e| e.to_str()) == Some(ENCODED_SONG_EXTENSION);
        if path.is_file() && encoded {
            std::fs::remove_file(&path).map_err(|e| MelodyError::io(&path, e))?;
        }
    }
    Ok(())
}
