//! Dataset scan.

use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use walkdir::WalkDir;

use crate::error::{ErrorCode, MelodyError, Result};
use crate::notation::NotationEngine;
use crate::types::Score;

/// A parsed score and the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedScore {
    pub path: PathBuf,
    pub score: Score,
}

/// Parsed scores of a dataset, with the files that were skipped.
#[derive(Debug, Clone, Default)]
pub struct LoadedDataset {
    /// Score files found in the dataset.
    pub files_found: usize,
    /// Files that could not be parsed.
    pub unreadable: usize,
    pub songs: Vec<LoadedScore>,
}

/// Lists score files under `dataset`, recursively, in path order.
///
/// Only files whose extension matches one of `extensions`
/// (case-insensitive) are returned.
pub fn find_score_files(dataset: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !dataset.is_dir() {
        return Err(MelodyError::missing_artifact(dataset));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dataset).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dataset).to_path_buf();
            match e.into_io_error() {
                Some(io) => MelodyError::io(&path, io),
                None => MelodyError::new(
                    ErrorCode::Io,
                    format!("filesystem loop at {}", path.display()),
                ),
            }
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);

        if matches {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Parses every score file under `dataset`, advancing `progress` per file.
///
/// Files that fail to parse are logged, counted and skipped; only I/O
/// failures on the directory itself abort the load.
pub fn load_songs(
    engine: &dyn NotationEngine,
    dataset: &Path,
    extensions: &[String],
    progress: &ProgressBar,
) -> Result<LoadedDataset> {
    let files = find_score_files(dataset, extensions)?;
    tracing::info!(dataset = %dataset.display(), files = files.len(), "scanning dataset");
    progress.set_length(files.len() as u64);

    let mut loaded = LoadedDataset {
        files_found: files.len(),
        ..Default::default()
    };
    for path in files {
        progress.inc(1);
        match engine.parse_score(&path) {
            Ok(score) => loaded.songs.push(LoadedScore { path, score }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable score");
                loaded.unreadable += 1;
            }
        }
    }
    progress.finish_and_clear();

    tracing::debug!(
        loaded = loaded.songs.len(),
        unreadable = loaded.unreadable,
        "dataset loaded"
    );
    Ok(loaded)
}
