//! Audio output module.
//!
//! Renders melodies with a sine voice and writes them as WAV files.

pub mod synth;
pub mod wav;

// Re-export commonly used items
pub use synth::{pitch_to_frequency, render_score};
pub use wav::{samples_to_duration, write_wav, CHANNELS, SAMPLE_RATE};
