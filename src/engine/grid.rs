//! Beat and measure positions derived from tempo and meter.

use super::source::{DEFAULT_BPM, DEFAULT_TIME_SIGNATURE};
use super::viewport::Viewport;

/// Tolerance for classifying a beat as a measure boundary. Beat times are
/// products of a float interval, so `t % measure` lands near 0 or near
/// `measure` rather than on it.
pub const MEASURE_EPSILON: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub time: f64,
    pub measure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatGrid {
    beat: f64,
    measure: f64,
}

impl BeatGrid {
    pub fn new(bpm: f64, time_signature: u32) -> Self {
        let bpm = if bpm.is_finite() && bpm > 0.0 {
            bpm
        } else {
            DEFAULT_BPM
        };
        let numerator = if time_signature >= 1 {
            time_signature
        } else {
            DEFAULT_TIME_SIGNATURE
        };
        let beat = 60.0 / bpm;
        Self {
            beat,
            measure: beat * f64::from(numerator),
        }
    }

    pub fn beat_interval(&self) -> f64 {
        self.beat
    }

    pub fn measure_interval(&self) -> f64 {
        self.measure
    }

    pub fn is_measure_boundary(&self, time: f64) -> bool {
        let r = time % self.measure;
        r < MEASURE_EPSILON || (self.measure - r) < MEASURE_EPSILON
    }

    /// Beats falling inside `window`, inclusive on both ends.
    pub fn lines(&self, window: Viewport) -> Vec<GridLine> {
        if window.span() <= 0.0 {
            return Vec::new();
        }
        let first = (window.start / self.beat).ceil().max(0.0) as u64;
        let mut lines = Vec::new();
        let mut i = first;
        loop {
            let time = i as f64 * self.beat;
            if time > window.end + MEASURE_EPSILON {
                break;
            }
            lines.push(GridLine {
                time,
                measure: self.is_measure_boundary(time),
            });
            i += 1;
        }
        lines
    }
}
