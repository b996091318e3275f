//! Transposition to C major / A minor.

use crate::error::Result;
use crate::notation::NotationEngine;
use crate::types::{Key, Mode, Score};

/// Semitone shift that moves `key` to C major (major keys) or A minor
/// (minor keys).
///
/// The tonic is taken in octave 4 and moved to C4 or A4, so major keys
/// always go down (−11..=0) and minor keys land in −2..=9.
pub fn interval_to_canonical(key: &Key) -> i32 {
    let tonic = key.tonic as i32;
    match key.mode {
        Mode::Major => -tonic,
        Mode::Minor => 9 - tonic,
    }
}

/// Detects the key of `score` and returns it transposed to C major or
/// A minor, with its key annotation set accordingly.
pub fn transpose_to_canonical(engine: &dyn NotationEngine, score: &Score) -> Result<Score> {
    let key = engine.detect_key(score)?;
    let interval = interval_to_canonical(&key);
    let mut transposed = engine.transpose(score, interval)?;
    transposed.key = Some(key.transposed(interval));
    tracing::debug!(from = %key, semitones = interval, "transposed score");
    Ok(transposed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::{estimate_key, KernEngine};
    use crate::types::Event;

    #[test]
    fn intervals() {
        assert_eq!(interval_to_canonical(&Key::new(7, Mode::Major)), -7);
        assert_eq!(interval_to_canonical(&Key::new(10, Mode::Major)), -10);
        assert_eq!(interval_to_canonical(&Key::C_MAJOR), 0);
        assert_eq!(interval_to_canonical(&Key::new(4, Mode::Minor)), 5);
        assert_eq!(interval_to_canonical(&Key::new(11, Mode::Minor)), -2);
        assert_eq!(interval_to_canonical(&Key::A_MINOR), 0);
    }

    #[test]
    fn every_key_lands_on_canonical() {
        for tonic in 0..12 {
            for mode in [Mode::Major, Mode::Minor] {
                let key = Key::new(tonic, mode);
                assert!(key.transposed(interval_to_canonical(&key)).is_canonical());
            }
        }
    }

    #[test]
    fn annotated_key_is_used() {
        let engine = KernEngine::default();
        let score = Score {
            key: Some(Key::new(2, Mode::Major)),
            events: vec![Event::note(62, 1.0), Event::note(66, 1.0), Event::note(69, 2.0)],
            ..Default::default()
        };
        let out = transpose_to_canonical(&engine, &score).unwrap();
        assert_eq!(out.key, Some(Key::C_MAJOR));
        assert_eq!(out.pitches().collect::<Vec<_>>(), vec![60, 64, 67]);
    }

    #[test]
    fn estimated_keys_become_canonical() {
        let engine = KernEngine::default();
        // E minor: e f# g a b c d# e, tonic lengthened.
        let e_minor = Score::from_events(
            [64u8, 66, 67, 69, 71, 72, 75, 76]
                .iter()
                .map(|&p| Event::note(p, if p % 12 == 4 { 2.0 } else { 1.0 }))
                .collect(),
        );
        // F major: f g a b- c d e f, tonic lengthened.
        let f_major = Score::from_events(
            [65u8, 67, 69, 70, 72, 74, 76, 77]
                .iter()
                .map(|&p| Event::note(p, if p % 12 == 5 { 2.0 } else { 1.0 }))
                .collect(),
        );

        for score in [e_minor, f_major] {
            let out = transpose_to_canonical(&engine, &score).unwrap();
            assert!(out.key.unwrap().is_canonical());

            let mut unannotated = out.clone();
            unannotated.key = None;
            assert!(estimate_key(&unannotated).unwrap().is_canonical());
        }
    }
}
