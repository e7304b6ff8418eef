//! Display-only amplitude summary of a decoded track.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::{Decoder, Source};

use super::error::DecodeError;

pub const DEFAULT_POINTS: usize = 150;

const RMS_GAIN: f64 = 1000.0;
const MIN_AMPLITUDE: f64 = 5.0;
const MAX_AMPLITUDE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformPoint {
    /// Seconds from the start of the track.
    pub time: f64,
    /// Normalized loudness, 0..=100.
    pub amplitude: f64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Reduce mono `samples` to at most `points` RMS buckets.
///
/// Bucket `i` starts at `i / n * duration`; its amplitude is `rms * 1000`
/// clamped to `[5, 100]`. Both are rounded to two decimals.
pub fn summarize(samples: &[f32], sample_rate: u32, points: usize) -> Vec<WaveformPoint> {
    if samples.is_empty() || sample_rate == 0 || points == 0 {
        return Vec::new();
    }

    let count = points.min(samples.len());
    let per_point = samples.len() / count;
    let duration = samples.len() as f64 / f64::from(sample_rate);

    (0..count)
        .map(|i| {
            let start = i * per_point;
            let end = (start + per_point).min(samples.len());
            let segment = &samples[start..end];
            let mean_square = segment
                .iter()
                .map(|&s| f64::from(s) * f64::from(s))
                .sum::<f64>()
                / segment.len() as f64;
            let amplitude = (mean_square.sqrt() * RMS_GAIN).clamp(MIN_AMPLITUDE, MAX_AMPLITUDE);

            WaveformPoint {
                time: round2(i as f64 / count as f64 * duration),
                amplitude: round2(amplitude),
            }
        })
        .collect()
}

/// Average interleaved frames down to one channel.
pub fn downmix(interleaved: impl Iterator<Item = f32>, channels: usize) -> Vec<f32> {
    let channels = channels.max(1);
    let mut mono = Vec::new();
    let mut acc = 0.0f32;
    let mut n = 0usize;
    for s in interleaved {
        acc += s;
        n += 1;
        if n == channels {
            mono.push(acc / channels as f32);
            acc = 0.0;
            n = 0;
        }
    }
    mono
}

/// Decode `path` and summarize it. Blocking; run it off the event loop.
pub fn summarize_file(path: &Path, points: usize) -> Result<Vec<WaveformPoint>, DecodeError> {
    let file = File::open(path).map_err(|e| DecodeError::Open {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| DecodeError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let channels = usize::from(decoder.channels());
    let sample_rate = decoder.sample_rate();
    let mono = downmix(decoder, channels);
    if mono.is_empty() {
        return Err(DecodeError::Empty(path.to_path_buf()));
    }

    Ok(summarize(&mono, sample_rate, points))
}
