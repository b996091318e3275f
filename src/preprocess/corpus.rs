//! Corpus building.
//!
//! Encoded songs are stored one per file, then concatenated into a single
//! corpus where every song is followed by a run of delimiters as long as
//! the training window. A window can therefore never span two songs
//! without containing the whole delimiter run.

use std::path::{Path, PathBuf};

use crate::error::{MelodyError, Result};
use crate::types::{join_symbols, parse_symbols, Symbol};
use crate::vocabulary::Vocabulary;

/// Extension of encoded song files.
pub const ENCODED_SONG_EXTENSION: &str = "txt";

/// Path of the `index`-th encoded song inside `dir`.
pub fn encoded_song_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("{:05}.{}", index, ENCODED_SONG_EXTENSION))
}

/// Writes one encoded song as space-separated tokens.
pub fn save_encoded_song(dir: &Path, index: usize, song: &[Symbol]) -> Result<PathBuf> {
    let path = encoded_song_path(dir, index);
    std::fs::write(&path, join_symbols(song)).map_err(|e| MelodyError::io(&path, e))?;
    Ok(path)
}

/// Reads every encoded song in `dir`, in file-name order.
pub fn load_encoded_songs(dir: &Path) -> Result<Vec<Vec<Symbol>>> {
    if !dir.is_dir() {
        return Err(MelodyError::missing_artifact(dir));
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| MelodyError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension().and_then(|e| e.to_str()) == Some(ENCODED_SONG_EXTENSION)
        })
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let text = std::fs::read_to_string(path).map_err(|e| MelodyError::io(path, e))?;
            parse_symbols(&text).map_err(|e| {
                MelodyError::invalid_artifact(format!("{}: {}", path.display(), e))
            })
        })
        .collect()
}

/// The concatenated, delimiter-separated symbol sequence of all songs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    symbols: Vec<Symbol>,
}

impl Corpus {
    /// Concatenates songs, following each with `sequence_length` delimiters.
    pub fn from_songs(songs: &[Vec<Symbol>], sequence_length: usize) -> Self {
        let mut symbols = Vec::with_capacity(
            songs.iter().map(|s| s.len() + sequence_length).sum(),
        );
        for song in songs {
            symbols.extend_from_slice(song);
            symbols.extend(std::iter::repeat(Symbol::Delimiter).take(sequence_length));
        }
        Self { symbols }
    }

    /// Wraps an existing symbol sequence.
    pub fn from_symbols(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Space-separated text form.
    pub fn to_text(&self) -> String {
        join_symbols(&self.symbols)
    }

    /// Derives the vocabulary in order of first appearance.
    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::from_symbols(&self.symbols)
    }

    /// Maps the corpus to ids.
    pub fn to_ids(&self, vocabulary: &Vocabulary) -> Result<Vec<usize>> {
        vocabulary.encode(&self.symbols)
    }

    /// Writes the corpus file.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_text()).map_err(|e| MelodyError::io(path, e))
    }

    /// Reads a corpus file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MelodyError::missing_artifact(path));
        }
        let text = std::fs::read_to_string(path).map_err(|e| MelodyError::io(path, e))?;
        let symbols = parse_symbols(&text).map_err(|e| {
            MelodyError::invalid_artifact(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self { symbols })
    }
}
