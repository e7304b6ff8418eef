use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::catalog::{Track, TrackId};

use super::error::ResolveError;

/// How long the catalog promises a resolved source stays valid.
pub const AUTHORITY_EXPIRY: Duration = Duration::from_secs(60 * 60);

/// How long the engine trusts a resolved source. Shorter than
/// [`AUTHORITY_EXPIRY`] so a handle is never used right at its deadline.
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(55 * 60);

pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_TIME_SIGNATURE: u32 = 4;

/// A resolved, time-limited reference to decodable audio.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayableSource {
    pub path: PathBuf,
    pub resolved_at: Instant,
    pub expires_at: Instant,
}

impl PlayableSource {
    pub fn is_fresh(&self, validity: Duration, now: Instant) -> bool {
        now < self.expires_at && now.duration_since(self.resolved_at) < validity
    }
}

/// Resolves track identifiers to playable sources. Called off the event loop.
pub trait SourceResolver: Send + Sync {
    fn resolve_playable_source(&self, id: &TrackId) -> Result<PlayableSource, ResolveError>;
}

/// Musical timing supplied once per track selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackTiming {
    pub duration: f64,
    pub bpm: f64,
    pub time_signature: u32,
}

impl TrackTiming {
    pub fn new(duration: f64, bpm: Option<f64>, time_signature: Option<u32>) -> Self {
        Self {
            duration: if duration.is_finite() && duration > 0.0 {
                duration
            } else {
                0.0
            },
            bpm: bpm
                .filter(|b| b.is_finite() && *b > 0.0)
                .unwrap_or(DEFAULT_BPM),
            time_signature: time_signature
                .filter(|n| *n >= 1)
                .unwrap_or(DEFAULT_TIME_SIGNATURE),
        }
    }
}

impl From<&Track> for TrackTiming {
    fn from(track: &Track) -> Self {
        Self::new(track.duration_seconds, track.bpm, track.time_signature)
    }
}
