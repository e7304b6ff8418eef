use std::path::PathBuf;

use thiserror::Error;

/// A playable source could not be obtained for a track.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("no track is selected")]
    NoTrack,
    #[error("track {0} is not in the catalog")]
    UnknownTrack(String),
    #[error("media for {id} is unavailable at {path}: {reason}")]
    Unavailable {
        id: String,
        path: PathBuf,
        reason: String,
    },
}

/// The audio device or decoder rejected a playback request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    #[error("no audio output device: {0}")]
    NoDevice(String),
    #[error("failed to open {path}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("nothing is loaded")]
    NotLoaded,
    #[error("audio thread stopped")]
    Disconnected,
}

/// The display summary could not be computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("failed to open {path}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("{0} contains no audio")]
    Empty(PathBuf),
}

/// Every failure the engine reports through its error callback.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("could not resolve audio: {0}")]
    Resolution(#[from] ResolveError),
    #[error("playback failed: {0}")]
    Playback(#[from] PlaybackError),
    #[error("waveform unavailable: {0}")]
    Decode(#[from] DecodeError),
}

impl EngineError {
    /// Decode failures never interrupt playback.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decode(_))
    }
}
