//! Active-chord tracking and smooth auto-scroll of the chord strip.

use crate::catalog::ChordPrediction;

/// Index of the chord sounding at `position`: the last one whose timestamp is
/// `<= position`. Positions before the first chord clamp to index 0.
pub fn active_index(chords: &[ChordPrediction], position: f64) -> Option<usize> {
    if chords.is_empty() {
        return None;
    }
    let after = chords.partition_point(|c| c.timestamp <= position);
    Some(after.saturating_sub(1))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn of(confidence: f64) -> Self {
        if confidence >= 90.0 {
            Self::High
        } else if confidence >= 80.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Default fraction of the remaining distance covered per tick.
pub const DEFAULT_SMOOTHING: f64 = 0.35;
const SNAP_DISTANCE: f64 = 0.01;

/// Chord strip state: which entry is active and where the strip is scrolled.
///
/// Offsets are measured in entries, so the strip can be drawn at any entry width.
#[derive(Debug, Clone)]
pub struct ChordTimeline {
    chords: Vec<ChordPrediction>,
    active: Option<usize>,
    visible: f64,
    offset: f64,
    target: f64,
    smoothing: f64,
}

impl ChordTimeline {
    pub fn new(smoothing: f64) -> Self {
        Self {
            chords: Vec::new(),
            active: None,
            visible: 0.0,
            offset: 0.0,
            target: 0.0,
            smoothing: if smoothing > 0.0 && smoothing <= 1.0 {
                smoothing
            } else {
                DEFAULT_SMOOTHING
            },
        }
    }

    /// Replace the sequence for a newly selected track and jump back to the top.
    pub fn set_chords(&mut self, chords: Vec<ChordPrediction>) {
        self.chords = chords;
        self.active = None;
        self.offset = 0.0;
        self.target = 0.0;
    }

    pub fn chords(&self) -> &[ChordPrediction] {
        &self.chords
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Follow a published position. Returns true when the active entry changed.
    pub fn sync(&mut self, position: f64) -> bool {
        let next = active_index(&self.chords, position);
        if next == self.active {
            return false;
        }
        self.active = next;
        self.retarget();
        true
    }

    /// Re-measure how many entries fit in the strip.
    pub fn set_visible_entries(&mut self, visible: f64) {
        if (visible - self.visible).abs() > f64::EPSILON {
            self.visible = visible.max(0.0);
            self.retarget();
        }
    }

    fn retarget(&mut self) {
        let Some(active) = self.active else {
            self.target = 0.0;
            return;
        };
        let max_offset = (self.chords.len() as f64 - self.visible).max(0.0);
        self.target = (active as f64 + 0.5 - self.visible / 2.0).clamp(0.0, max_offset);
    }

    /// Advance the scroll animation one tick. Returns true while still moving.
    pub fn step(&mut self) -> bool {
        let remaining = self.target - self.offset;
        if remaining.abs() <= SNAP_DISTANCE {
            self.offset = self.target;
            return false;
        }
        self.offset += remaining * self.smoothing;
        true
    }

    pub fn is_scrolling(&self) -> bool {
        (self.target - self.offset).abs() > SNAP_DISTANCE
    }

    /// Entry drawn at fractional strip position `entries_from_left`.
    pub fn entry_at(&self, entries_from_left: f64) -> Option<&ChordPrediction> {
        let index = (self.offset + entries_from_left).floor();
        if index < 0.0 {
            return None;
        }
        self.chords.get(index as usize)
    }

    /// Neighbouring chord timestamp relative to the active entry.
    pub fn neighbour_timestamp(&self, forward: bool) -> Option<f64> {
        let active = self.active?;
        let index = if forward {
            active.checked_add(1)?
        } else {
            active.checked_sub(1)?
        };
        self.chords.get(index).map(|c| c.timestamp)
    }
}
