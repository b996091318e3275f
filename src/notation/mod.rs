//! Score I/O, key finding and transposition.
//!
//! The preprocessing and generation stages only talk to scores through the
//! [`NotationEngine`] trait, so tests can substitute an in-memory engine.
//! [`KernEngine`] is the file-backed implementation:
//! - [`kern`]: Humdrum `**kern` reader and writer
//! - [`key`]: Krumhansl-Schmuckler key estimation
//! - [`midi`]: Standard MIDI File export

pub mod kern;
pub mod key;
pub mod midi;

use std::path::Path;

use crate::error::{MelodyError, Result};
use crate::types::{Event, EventKind, Key, Score};

pub use kern::{parse_kern, write_kern, KernParseError};
pub use key::{estimate_key, pitch_class_histogram, rank_keys, KeyCandidate};
pub use midi::{score_to_midi, write_midi, MidiParams};

/// Narrow interface to a music-notation backend.
pub trait NotationEngine {
    /// Reads a score from a file.
    fn parse_score(&self, path: &Path) -> Result<Score>;

    /// Returns the annotated key, or an estimate when the score has none.
    fn detect_key(&self, score: &Score) -> Result<Key>;

    /// Returns a copy of the score shifted by `semitones`.
    fn transpose(&self, score: &Score, semitones: i32) -> Result<Score>;

    /// Writes a score to a file.
    fn export_score(&self, score: &Score, path: &Path) -> Result<()>;
}

/// Kern-reading, MIDI/kern-writing notation engine.
#[derive(Debug, Clone, Default)]
pub struct KernEngine {
    /// Parameters used when exporting `.mid` files.
    pub midi: MidiParams,
}

impl KernEngine {
    pub fn new(midi: MidiParams) -> Self {
        Self { midi }
    }
}

impl NotationEngine for KernEngine {
    fn parse_score(&self, path: &Path) -> Result<Score> {
        let bytes = std::fs::read(path).map_err(|e| MelodyError::io(path, e))?;
        // Older collections are Latin-1; lossy decoding keeps the music intact.
        let text = String::from_utf8_lossy(&bytes);
        parse_kern(&text).map_err(|e| MelodyError::input_format(path, e.to_string()))
    }

    fn detect_key(&self, score: &Score) -> Result<Key> {
        match score.key {
            Some(key) => Ok(key),
            None => estimate_key(score),
        }
    }

    fn transpose(&self, score: &Score, semitones: i32) -> Result<Score> {
        transpose_score(score, semitones)
    }

    fn export_score(&self, score: &Score, path: &Path) -> Result<()> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("mid") | Some("midi") => write_midi(score, path, &self.midi),
            Some("krn") => {
                std::fs::write(path, write_kern(score)).map_err(|e| MelodyError::io(path, e))
            }
            _ => Err(MelodyError::export_failed(format!(
                "unsupported output format: {}",
                path.display()
            ))),
        }
    }
}

/// Shifts every note of a score by `semitones`, carrying the key along.
pub fn transpose_score(score: &Score, semitones: i32) -> Result<Score> {
    let events = score
        .events
        .iter()
        .map(|event| match event.kind {
            EventKind::Rest => Ok(*event),
            EventKind::Note(pitch) => {
                let shifted = pitch as i32 + semitones;
                if !(0..=127).contains(&shifted) {
                    return Err(MelodyError::new(
                        crate::error::ErrorCode::InputFormat,
                        format!(
                            "transposing pitch {} by {} leaves the MIDI range",
                            pitch, semitones
                        ),
                    ));
                }
                Ok(Event::note(shifted as u8, event.duration))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Score {
        title: score.title.clone(),
        meter: score.meter.clone(),
        key: score.key.map(|k| k.transposed(semitones)),
        events,
    })
}
