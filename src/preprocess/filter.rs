//! Duration filter.
//!
//! Scores whose rhythms fall off the encoder's grid are excluded from the
//! corpus. Rejection is a filtering decision, not an error.

use crate::types::Score;

/// Acceptable durations in quarter lengths, sixteenth through whole note.
pub const ACCEPTABLE_DURATIONS: &[f64] = &[0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 4.0];

const DURATION_TOLERANCE: f64 = 1e-9;

/// Returns true if every event's duration is in `acceptable`.
pub fn has_acceptable_durations(score: &Score, acceptable: &[f64]) -> bool {
    score.events.iter().all(|event| {
        acceptable
            .iter()
            .any(|d| (event.duration - d).abs() < DURATION_TOLERANCE)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;

    #[test]
    fn accepts_grid_durations() {
        let score = Score::from_events(vec![
            Event::note(60, 0.25),
            Event::note(62, 0.75),
            Event::rest(1.5),
            Event::note(64, 4.0),
        ]);
        assert!(has_acceptable_durations(&score, ACCEPTABLE_DURATIONS));
    }

    #[test]
    fn rejects_triplets_and_odd_lengths() {
        let triplet = Score::from_events(vec![Event::note(60, 1.0 / 3.0)]);
        assert!(!has_acceptable_durations(&triplet, ACCEPTABLE_DURATIONS));

        let five_eighths = Score::from_events(vec![Event::note(60, 1.0), Event::rest(1.25)]);
        assert!(!has_acceptable_durations(&five_eighths, ACCEPTABLE_DURATIONS));
    }

    #[test]
    fn accepted_scores_only_use_listed_durations() {
        let allowed = [0.5, 1.0];
        let scores = [
            Score::from_events(vec![Event::note(60, 0.5), Event::note(62, 1.0)]),
            Score::from_events(vec![Event::note(60, 0.5), Event::note(62, 2.0)]),
            Score::from_events(vec![]),
        ];
        for score in scores.iter().filter(|s| has_acceptable_durations(s, &allowed)) {
            for event in &score.events {
                assert!(allowed.contains(&event.duration));
            }
        }
    }
}
