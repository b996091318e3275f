//! Time-step encoding of scores.
//!
//! A song becomes one symbol per time step: the onset symbol (MIDI pitch or
//! rest) followed by holds for the remaining steps of the event.
//!
//! ```text
//! pitch 60, 1.0 quarter, step 0.25  ->  60 _ _ _
//! ```

use crate::error::{MelodyError, Result};
use crate::types::{Event, EventKind, Score, Symbol};

/// Default time step: a sixteenth note.
pub const DEFAULT_TIME_STEP: f64 = 0.25;

/// Encodes a score at the given time step.
///
/// Durations are rounded to the nearest number of steps; events that round
/// to zero steps are dropped.
pub fn encode_song(score: &Score, time_step: f64) -> Vec<Symbol> {
    let mut encoded = Vec::new();
    for event in &score.events {
        let steps = (event.duration / time_step).round() as usize;
        if steps == 0 {
            tracing::debug!(duration = event.duration, "event shorter than one time step dropped");
            continue;
        }
        encoded.push(match event.kind {
            EventKind::Note(pitch) => Symbol::Pitch(pitch),
            EventKind::Rest => Symbol::Rest,
        });
        encoded.extend(std::iter::repeat(Symbol::Hold).take(steps - 1));
    }
    encoded
}

/// Decodes a symbol sequence back into a score.
///
/// Each onset starts an event lasting one step; each hold extends the
/// current event by one step. Holds before the first onset form a leading
/// rest. Delimiters cannot appear inside a song.
pub fn decode_song(symbols: &[Symbol], time_step: f64) -> Result<Score> {
    let mut events: Vec<(EventKind, usize)> = Vec::new();

    for symbol in symbols {
        match symbol {
            Symbol::Pitch(p) => events.push((EventKind::Note(*p), 1)),
            Symbol::Rest => events.push((EventKind::Rest, 1)),
            Symbol::Hold => match events.last_mut() {
                Some((_, steps)) => *steps += 1,
                None => events.push((EventKind::Rest, 1)),
            },
            Symbol::Delimiter => {
                return Err(MelodyError::invalid_artifact(
                    "song delimiter inside an encoded song",
                ))
            }
        }
    }

    Ok(Score::from_events(
        events
            .into_iter()
            .map(|(kind, steps)| Event {
                kind,
                duration: steps as f64 * time_step,
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{join_symbols, parse_symbols};

    #[test]
    fn encodes_holds() {
        let score = Score::from_events(vec![
            Event::note(60, 1.0),
            Event::rest(0.5),
            Event::note(62, 0.25),
        ]);
        let encoded = encode_song(&score, DEFAULT_TIME_STEP);
        assert_eq!(join_symbols(&encoded), "60 _ _ _ r _ 62");
    }

    #[test]
    fn length_matches_total_duration() {
        let score = Score::from_events(vec![
            Event::note(67, 1.5),
            Event::note(65, 0.75),
            Event::rest(3.0),
        ]);
        let encoded = encode_song(&score, DEFAULT_TIME_STEP);
        assert_eq!(encoded.len(), (score.total_duration() / DEFAULT_TIME_STEP) as usize);
    }

    #[test]
    fn rounds_to_nearest_step() {
        let score = Score::from_events(vec![Event::note(60, 0.3), Event::note(62, 0.1)]);
        let encoded = encode_song(&score, DEFAULT_TIME_STEP);
        assert_eq!(encoded, vec![Symbol::Pitch(60)]);
    }

    #[test]
    fn round_trip_on_grid() {
        let score = Score::from_events(vec![
            Event::note(60, 0.5),
            Event::note(64, 1.5),
            Event::rest(0.25),
            Event::note(67, 4.0),
            Event::rest(1.0),
        ]);
        let decoded = decode_song(&encode_song(&score, DEFAULT_TIME_STEP), DEFAULT_TIME_STEP)
            .unwrap();
        assert_eq!(decoded.events, score.events);
    }

    #[test]
    fn leading_holds_become_rest() {
        let symbols = parse_symbols("_ _ 60 _").unwrap();
        let decoded = decode_song(&symbols, DEFAULT_TIME_STEP).unwrap();
        assert_eq!(decoded.events, vec![Event::rest(0.5), Event::note(60, 0.5)]);
    }

    #[test]
    fn delimiter_inside_song_is_rejected() {
        let symbols = parse_symbols("60 _ / 62").unwrap();
        assert!(decode_song(&symbols, DEFAULT_TIME_STEP).is_err());
    }
}
