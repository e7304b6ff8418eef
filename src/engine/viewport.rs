//! Zoom level and the visible time window derived from it.

pub const ZOOM_STEP: f64 = 1.5;
pub const MAX_ZOOM: f64 = 8.0;
pub const MIN_ZOOM: f64 = 1.0;

/// Multiplicative zoom, always within `[1, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom {
    level: f64,
    step: f64,
    max: f64,
}

impl Default for Zoom {
    fn default() -> Self {
        Self::new(ZOOM_STEP, MAX_ZOOM)
    }
}

impl Zoom {
    pub fn new(step: f64, max: f64) -> Self {
        Self {
            level: MIN_ZOOM,
            step: if step > 1.0 { step } else { ZOOM_STEP },
            max: max.max(MIN_ZOOM),
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn zoom_in(&mut self) {
        self.level = (self.level * self.step).min(self.max);
    }

    pub fn zoom_out(&mut self) {
        self.level = (self.level / self.step).max(MIN_ZOOM);
    }

    pub fn reset(&mut self) {
        self.level = MIN_ZOOM;
    }
}

/// The visible `[start, end]` time window, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub start: f64,
    pub end: f64,
}

impl Viewport {
    /// Window of `duration / zoom` seconds centered on `position`, shifted
    /// (never shrunk) to stay inside `[0, duration]`.
    pub fn compute(zoom: f64, position: f64, duration: f64) -> Self {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        if !(zoom > MIN_ZOOM) || duration == 0.0 {
            return Self {
                start: 0.0,
                end: duration,
            };
        }

        let span = duration / zoom;
        let position = if position.is_finite() {
            position.clamp(0.0, duration)
        } else {
            0.0
        };

        let mut start = position - span / 2.0;
        if start < 0.0 {
            start = 0.0;
        }
        let mut end = start + span;
        if end > duration {
            end = duration;
            start = duration - span;
        }
        Self { start, end }
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    /// Pixel column (fractional) of `time` on a surface `width` pixels wide.
    pub fn x_of(&self, time: f64, width: f64) -> f64 {
        if self.span() <= 0.0 {
            return 0.0;
        }
        (time - self.start) / self.span() * width
    }

    /// Inverse mapping: time under pixel `x`, clamped into the window.
    pub fn time_at(&self, x: f64, width: f64) -> f64 {
        if !(width > 0.0) || !x.is_finite() {
            return self.start;
        }
        (self.start + (x / width) * self.span()).clamp(self.start, self.end)
    }
}
