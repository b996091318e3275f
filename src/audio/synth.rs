//! Sine-voice rendering of a melody.

use std::f32::consts::TAU;

use crate::types::{EventKind, Score};

/// Peak amplitude of a rendered note.
const AMPLITUDE: f32 = 0.3;

/// Attack and release ramp, in seconds.
const RAMP_SECONDS: f32 = 0.005;

/// Frequency of a MIDI pitch in equal temperament (A4 = 440 Hz).
pub fn pitch_to_frequency(pitch: u8) -> f32 {
    440.0 * 2f32.powf((pitch as f32 - 69.0) / 12.0)
}

/// Number of samples an event of `quarter_length` lasts.
fn event_samples(quarter_length: f64, tempo_bpm: u32, sample_rate: u32) -> usize {
    let seconds = quarter_length * 60.0 / tempo_bpm.max(1) as f64;
    (seconds * sample_rate as f64).round() as usize
}

/// Renders a score as mono samples: one sine tone per note, silence for
/// rests, with short linear ramps at note boundaries.
pub fn render_score(score: &Score, tempo_bpm: u32, sample_rate: u32) -> Vec<f32> {
    let total: usize = score
        .events
        .iter()
        .map(|e| event_samples(e.duration, tempo_bpm, sample_rate))
        .sum();
    let mut samples = Vec::with_capacity(total);
    let ramp = ((RAMP_SECONDS * sample_rate as f32) as usize).max(1);

    for event in &score.events {
        let n = event_samples(event.duration, tempo_bpm, sample_rate);
        match event.kind {
            EventKind::Rest => samples.extend(std::iter::repeat(0.0).take(n)),
            EventKind::Note(pitch) => {
                let step = TAU * pitch_to_frequency(pitch) / sample_rate as f32;
                let ramp = ramp.min(n / 2).max(1);
                samples.extend((0..n).map(|i| {
                    let envelope = (i.min(n - 1 - i) as f32 / ramp as f32).min(1.0);
                    AMPLITUDE * envelope * (step * i as f32).sin()
                }));
            }
        }
    }

    samples
}
