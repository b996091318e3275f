//! MIDI output for generated melodies.
//!
//! Converts a Score into a single-track Standard MIDI File. Durations in
//! quarter lengths map to ticks at a fixed resolution; rests only advance
//! the running delta.

use std::path::Path;

use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
};

use crate::error::{MelodyError, Result};
use crate::types::{EventKind, Score};

/// Parameters for MIDI generation.
#[derive(Debug, Clone)]
pub struct MidiParams {
    /// MIDI velocity for notes (1-127).
    pub velocity: u8,
    /// Ticks per quarter note.
    pub ticks_per_quarter: u16,
    /// Tempo in quarter notes per minute.
    pub tempo_bpm: u32,
    /// General MIDI program (0 = acoustic grand piano).
    pub program: u8,
    /// MIDI channel (0-15).
    pub channel: u8,
}

impl Default for MidiParams {
    fn default() -> Self {
        Self {
            velocity: 80,
            ticks_per_quarter: 480,
            tempo_bpm: 120,
            program: 0,
            channel: 0,
        }
    }
}

/// Converts a Score to SMF bytes (format 0).
pub fn score_to_midi(score: &Score, params: &MidiParams) -> Result<Vec<u8>> {
    if params.tempo_bpm == 0 {
        return Err(MelodyError::export_failed("tempo must be > 0"));
    }

    let ticks_per_quarter = params.ticks_per_quarter as f64;
    let channel = u4::new(params.channel.min(15));
    let velocity = u7::new(params.velocity.min(127));

    let mut track: Vec<TrackEvent> = Vec::new();
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(
            60_000_000 / params.tempo_bpm,
        ))),
    });
    if let Some(title) = &score.title {
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(title.as_bytes())),
        });
    }
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange {
                program: u7::new(params.program.min(127)),
            },
        },
    });

    let mut pending_delta: u32 = 0;
    for event in &score.events {
        let ticks = (event.duration * ticks_per_quarter).round() as u32;
        match event.kind {
            EventKind::Rest => pending_delta += ticks,
            EventKind::Note(pitch) => {
                if pitch > 127 {
                    return Err(MelodyError::export_failed(format!(
                        "pitch {} outside MIDI range",
                        pitch
                    )));
                }
                let key = u7::new(pitch);
                track.push(TrackEvent {
                    delta: u28::new(pending_delta),
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOn { key, vel: velocity },
                    },
                });
                track.push(TrackEvent {
                    delta: u28::new(ticks),
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOff {
                            key,
                            vel: u7::new(0),
                        },
                    },
                });
                pending_delta = 0;
            }
        }
    }

    track.push(TrackEvent {
        delta: u28::new(pending_delta),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(params.ticks_per_quarter)),
    ));
    smf.tracks.push(track);

    let mut buf = Vec::new();
    smf.write(&mut buf)
        .map_err(|e| MelodyError::export_failed(format!("cannot encode MIDI: {}", e)))?;
    Ok(buf)
}

/// Converts a Score to MIDI and writes it to a file.
pub fn write_midi(score: &Score, path: &Path, params: &MidiParams) -> Result<()> {
    let bytes = score_to_midi(score, params)?;
    std::fs::write(path, bytes).map_err(|e| MelodyError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;

    fn note_ons(bytes: &[u8]) -> Vec<(u32, u8)> {
        let smf = Smf::parse(bytes).unwrap();
        let mut tick = 0u32;
        let mut result = Vec::new();
        for event in &smf.tracks[0] {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, .. },
                ..
            } = event.kind
            {
                result.push((tick, key.as_int()));
            }
        }
        result
    }

    #[test]
    fn notes_and_rests_map_to_ticks() {
        let score = Score::from_events(vec![
            Event::note(60, 1.0),
            Event::rest(0.5),
            Event::note(62, 0.25),
            Event::note(64, 2.0),
        ]);
        let bytes = score_to_midi(&score, &MidiParams::default()).unwrap();
        assert_eq!(&bytes[0..4], b"MThd");
        assert_eq!(note_ons(&bytes), vec![(0, 60), (720, 62), (840, 64)]);
    }

    #[test]
    fn leading_rest_delays_first_note() {
        let score = Score::from_events(vec![Event::rest(1.0), Event::note(67, 1.0)]);
        let bytes = score_to_midi(&score, &MidiParams::default()).unwrap();
        assert_eq!(note_ons(&bytes), vec![(480, 67)]);
    }

    #[test]
    fn zero_tempo_is_rejected() {
        let params = MidiParams {
            tempo_bpm: 0,
            ..Default::default()
        };
        assert!(score_to_midi(&Score::default(), &params).is_err());
    }

    #[test]
    fn write_midi_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mel.mid");
        let score = Score::from_events(vec![Event::note(60, 1.0)]);
        write_midi(&score, &path, &MidiParams::default()).unwrap();
        assert!(path.exists());
    }
}
