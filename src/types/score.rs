//! Score, event and key types.
//!
//! A Score is a monophonic sequence of notes and rests with durations in
//! quarter lengths (a quarter note is 1.0). Scores are produced by the
//! notation engine, transposed into new values, and consumed by the encoder.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pitch-class names used for display, sharps only.
const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Mode of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    /// Returns the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Minor => "minor",
        }
    }
}

/// A key: tonic pitch class (0 = C .. 11 = B) and mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    pub tonic: u8,
    pub mode: Mode,
}

impl Key {
    /// C major, the canonical major key.
    pub const C_MAJOR: Key = Key {
        tonic: 0,
        mode: Mode::Major,
    };

    /// A minor, the canonical minor key.
    pub const A_MINOR: Key = Key {
        tonic: 9,
        mode: Mode::Minor,
    };

    /// Creates a key, reducing the tonic modulo 12.
    pub fn new(tonic: i32, mode: Mode) -> Self {
        Self {
            tonic: tonic.rem_euclid(12) as u8,
            mode,
        }
    }

    /// Returns true for C major and A minor.
    pub fn is_canonical(&self) -> bool {
        *self == Key::C_MAJOR || *self == Key::A_MINOR
    }

    /// Returns the key shifted by `semitones`.
    pub fn transposed(&self, semitones: i32) -> Self {
        Self::new(self.tonic as i32 + semitones, self.mode)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            PITCH_CLASS_NAMES[self.tonic as usize % 12],
            self.mode.as_str()
        )
    }
}

/// What sounds during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A note with its MIDI pitch number.
    Note(u8),
    Rest,
}

/// A note or rest with a duration in quarter lengths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub duration: f64,
}

impl Event {
    pub fn note(pitch: u8, duration: f64) -> Self {
        Self {
            kind: EventKind::Note(pitch),
            duration,
        }
    }

    pub fn rest(duration: f64) -> Self {
        Self {
            kind: EventKind::Rest,
            duration,
        }
    }

    /// Returns the MIDI pitch, or None for rests.
    pub fn pitch(&self) -> Option<u8> {
        match self.kind {
            EventKind::Note(p) => Some(p),
            EventKind::Rest => None,
        }
    }
}

/// A monophonic score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Title from the file's reference records, if any.
    pub title: Option<String>,
    /// Meter signature as written, e.g. "3/4".
    pub meter: Option<String>,
    /// Key annotated in the file (or set by transposition).
    pub key: Option<Key>,
    /// Notes and rests in score order.
    pub events: Vec<Event>,
}

impl Score {
    /// Creates an unannotated score from events.
    pub fn from_events(events: Vec<Event>) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    /// Total duration in quarter lengths.
    pub fn total_duration(&self) -> f64 {
        self.events.iter().map(|e| e.duration).sum()
    }

    /// Iterates over the pitches of all notes, skipping rests.
    pub fn pitches(&self) -> impl Iterator<Item = u8> + '_ {
        self.events.iter().filter_map(Event::pitch)
    }

    /// Returns the number of notes (rests excluded).
    pub fn note_count(&self) -> usize {
        self.pitches().count()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
