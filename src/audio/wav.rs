//! WAV file writer for rendered melodies.
//!
//! Writes audio samples to WAV format using the hound crate.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::{MelodyError, Result};

/// Audio sample rate for rendered melodies (32kHz).
pub const SAMPLE_RATE: u32 = 32000;

/// Number of audio channels (stereo).
pub const CHANNELS: u16 = 2;

/// Writes mono samples to a stereo float WAV file.
///
/// # Arguments
///
/// * `samples` - Audio samples as f32 values
/// * `path` - Output file path
/// * `sample_rate` - Sample rate in Hz
pub fn write_wav(samples: &[f32], path: &Path, sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| {
        MelodyError::export_failed(format!("cannot create {}: {}", path.display(), e))
    })?;

    for sample in samples {
        // Same sample on left and right
        for _ in 0..CHANNELS {
            writer.write_sample(*sample).map_err(|e| {
                MelodyError::export_failed(format!("cannot write sample: {}", e))
            })?;
        }
    }

    writer.finalize().map_err(|e| {
        MelodyError::export_failed(format!("cannot finalize {}: {}", path.display(), e))
    })?;

    Ok(())
}

/// Calculates the duration of audio in seconds from sample count.
pub fn samples_to_duration(sample_count: usize, sample_rate: u32) -> f32 {
    sample_count as f32 / sample_rate as f32
}
