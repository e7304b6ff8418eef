use super::error::PlaybackError;
use super::source::PlayableSource;

/// Completion reports from a playback backend. Each carries the generation
/// of the `load` it belongs to so the engine can drop reports for a track
/// that is no longer selected.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Loaded {
        generation: u64,
        duration: Option<f64>,
    },
    LoadFailed {
        generation: u64,
        error: PlaybackError,
    },
    PlayFailed {
        generation: u64,
        error: PlaybackError,
    },
    /// The decoder ran out of audio while playing.
    Finished { generation: u64 },
}

/// The decoding/transport primitive. Commands are fire-and-forget; results
/// come back through [`PlaybackBackend::poll_events`].
pub trait PlaybackBackend {
    /// Decode `source` into a paused handle.
    fn load(&mut self, generation: u64, source: &PlayableSource, volume: f32);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64);
    fn set_volume(&mut self, volume: f32);
    /// Stop and drop the current handle. Takes effect before any later command.
    fn release(&mut self);
    /// Latest device position, or `None` while a seek/load is still in flight.
    fn position(&self) -> Option<f64>;
    fn poll_events(&mut self) -> Vec<BackendEvent>;
}
