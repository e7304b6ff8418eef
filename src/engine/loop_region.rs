//! User-defined `[start, end)` loop over the track.

/// Smallest span the setters will produce, in seconds.
pub const MIN_LOOP_SPAN: f64 = 1.0;

/// Loop interval. `0 <= start < end <= duration` holds whenever the track is
/// at least [`MIN_LOOP_SPAN`] long; shorter tracks loop as a whole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopRegion {
    enabled: bool,
    start: f64,
    end: f64,
    duration: f64,
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

impl LoopRegion {
    /// A disabled region covering the whole track.
    pub fn new(duration: f64) -> Self {
        let duration = finite_or_zero(duration).max(0.0);
        Self {
            enabled: false,
            start: 0.0,
            end: duration,
            duration,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Enabled and non-empty.
    pub fn is_active(&self) -> bool {
        self.enabled && self.end > self.start
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled && self.duration > 0.0;
    }

    /// Move the in-point to `position`, keeping at least a second before the out-point.
    pub fn set_in(&mut self, position: f64) {
        let position = finite_or_zero(position);
        self.start = position.min(self.end - MIN_LOOP_SPAN).max(0.0);
        if self.end - self.start < MIN_LOOP_SPAN {
            self.end = (self.start + MIN_LOOP_SPAN).min(self.duration);
        }
        self.enabled = self.duration > 0.0;
    }

    /// Move the out-point to `position`, keeping at least a second after the in-point.
    pub fn set_out(&mut self, position: f64) {
        let position = finite_or_zero(position);
        self.end = position.max(self.start + MIN_LOOP_SPAN).min(self.duration);
        if self.end - self.start < MIN_LOOP_SPAN {
            self.start = (self.end - MIN_LOOP_SPAN).max(0.0);
        }
        self.enabled = self.duration > 0.0;
    }

    /// Adopt a corrected track duration (e.g. once the decoder reports it).
    pub fn set_duration(&mut self, duration: f64) {
        let duration = finite_or_zero(duration).max(0.0);
        let untouched = !self.enabled && self.start == 0.0 && self.end == self.duration;
        self.duration = duration;
        if untouched || self.end > duration {
            self.end = duration;
        }
        if self.end - self.start < MIN_LOOP_SPAN {
            self.start = (self.end - MIN_LOOP_SPAN).max(0.0);
        }
        if duration == 0.0 {
            self.enabled = false;
        }
    }

    /// Where a position sample should be published: the loop start when the
    /// loop is active and the sample is at or past the out-point.
    pub fn redirect(&self, position: f64) -> Option<f64> {
        (self.is_active() && position >= self.end).then_some(self.start)
    }
}
