//! Commands and shared state of the audio thread.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Commands understood by the audio thread.
///
/// Commands that move the playback cursor carry the epoch assigned by the
/// player; position reports are only trusted once the thread has applied
/// the latest of them.
#[derive(Debug)]
pub enum AudioCmd {
    /// Decode `path` into a fresh, paused sink.
    Load {
        epoch: u64,
        generation: u64,
        path: PathBuf,
        volume: f32,
    },
    Play,
    Pause,
    /// Rebuild the sink starting `position` into the file.
    Seek { epoch: u64, position: Duration },
    SetVolume(f32),
    /// Stop and drop the sink.
    Release { epoch: u64 },
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

/// Runtime playback information published by the audio thread.
#[derive(Debug, Clone, Default)]
pub struct PlaybackInfo {
    /// Epoch of the last cursor-moving command applied.
    pub epoch: u64,
    /// Whether a sink exists.
    pub loaded: bool,
    pub playing: bool,
    /// Device position within the current file.
    pub position: Duration,
}

impl PlaybackInfo {
    /// Position in seconds, if it reflects every command up to `epoch`.
    pub fn position_for(&self, epoch: u64) -> Option<f64> {
        (self.loaded && self.epoch == epoch).then(|| self.position.as_secs_f64())
    }
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;
