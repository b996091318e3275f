//! Key estimation by profile correlation.
//!
//! Implements the Krumhansl-Schmuckler algorithm: a duration-weighted
//! pitch-class histogram is correlated against the Krumhansl-Kessler major
//! and minor profiles rotated to each of the 12 tonics, and the best match
//! wins. Inputs that give no clear winner are reported as errors instead of
//! falling back to a default key.

use crate::error::{MelodyError, Result};
use crate::types::{Key, Mode, Score};

/// Krumhansl-Kessler probe-tone ratings for major keys, tonic first.
const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Kessler probe-tone ratings for minor keys, tonic first.
const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Correlations closer than this are treated as a tie.
const TIE_TOLERANCE: f64 = 1e-9;

/// A candidate key with its correlation coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyCandidate {
    pub key: Key,
    pub correlation: f64,
}

/// Builds the duration-weighted pitch-class histogram of a score.
pub fn pitch_class_histogram(score: &Score) -> [f64; 12] {
    let mut histogram = [0.0; 12];
    for event in &score.events {
        if let Some(pitch) = event.pitch() {
            histogram[(pitch % 12) as usize] += event.duration;
        }
    }
    histogram
}

/// Correlates a histogram with all 24 keys, best first.
pub fn rank_keys(histogram: &[f64; 12]) -> Vec<KeyCandidate> {
    let mut candidates = Vec::with_capacity(24);
    for (mode, profile) in [(Mode::Major, &MAJOR_PROFILE), (Mode::Minor, &MINOR_PROFILE)] {
        for tonic in 0..12 {
            let rotated: [f64; 12] =
                std::array::from_fn(|pc| profile[(pc + 12 - tonic) % 12]);
            candidates.push(KeyCandidate {
                key: Key::new(tonic as i32, mode),
                correlation: pearson(histogram, &rotated),
            });
        }
    }
    candidates.sort_by(|a, b| b.correlation.total_cmp(&a.correlation));
    candidates
}

/// Estimates the key of a score.
pub fn estimate_key(score: &Score) -> Result<Key> {
    let histogram = pitch_class_histogram(score);
    if histogram.iter().sum::<f64>() <= 0.0 {
        return Err(MelodyError::key_ambiguous("score has no pitched notes"));
    }

    let ranked = rank_keys(&histogram);
    let best = ranked[0];
    let runner_up = ranked[1];

    if !best.correlation.is_finite() {
        return Err(MelodyError::key_ambiguous(
            "pitch-class distribution is flat",
        ));
    }
    if best.correlation - runner_up.correlation < TIE_TOLERANCE {
        return Err(MelodyError::key_ambiguous(format!(
            "{} and {} fit equally well",
            best.key, runner_up.key
        )));
    }

    Ok(best.key)
}

fn pearson(x: &[f64; 12], y: &[f64; 12]) -> f64 {
    let mean_x = x.iter().sum::<f64>() / 12.0;
    let mean_y = y.iter().sum::<f64>() / 12.0;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    cov / (var_x * var_y).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::Event;

    fn melody(pitches: &[u8], tonic_weight: f64) -> Score {
        let tonic = pitches[0];
        Score::from_events(
            pitches
                .iter()
                .map(|&p| {
                    let d = if p % 12 == tonic % 12 { tonic_weight } else { 1.0 };
                    Event::note(p, d)
                })
                .collect(),
        )
    }

    #[test]
    fn c_major_scale() {
        let score = melody(&[60, 62, 64, 65, 67, 69, 71, 72], 2.0);
        assert_eq!(estimate_key(&score).unwrap(), Key::C_MAJOR);
    }

    #[test]
    fn a_harmonic_minor_scale() {
        let score = melody(&[57, 59, 60, 62, 64, 65, 68, 69], 2.0);
        assert_eq!(estimate_key(&score).unwrap(), Key::A_MINOR);
    }

    #[test]
    fn estimation_follows_transposition() {
        let base = melody(&[60, 64, 67, 65, 62, 71, 72, 67], 3.0);
        let expected = estimate_key(&base).unwrap();
        for shift in 1..12u8 {
            let shifted = Score::from_events(
                base.events
                    .iter()
                    .map(|e| Event::note(e.pitch().unwrap() + shift, e.duration))
                    .collect(),
            );
            assert_eq!(
                estimate_key(&shifted).unwrap(),
                expected.transposed(shift as i32)
            );
        }
    }

    #[test]
    fn rests_only_is_ambiguous() {
        let score = Score::from_events(vec![Event::rest(1.0), Event::rest(2.0)]);
        let err = estimate_key(&score).unwrap_err();
        assert_eq!(err.code, ErrorCode::KeyDetectionAmbiguous);
    }

    #[test]
    fn chromatic_cluster_is_ambiguous() {
        let score = Score::from_events((60..72).map(|p| Event::note(p, 1.0)).collect());
        let err = estimate_key(&score).unwrap_err();
        assert_eq!(err.code, ErrorCode::KeyDetectionAmbiguous);
    }

    #[test]
    fn ranking_covers_all_keys() {
        let histogram = pitch_class_histogram(&melody(&[60, 64, 67], 1.0));
        let ranked = rank_keys(&histogram);
        assert_eq!(ranked.len(), 24);
        assert!(ranked[0].correlation >= ranked[23].correlation);
    }
}
