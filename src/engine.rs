//! Synchronized playback and visualization engine.
//!
//! Everything here is driven from the event loop: [`Transport`] owns the
//! playback session, loop region and waveform summary; the remaining
//! modules are pure helpers the renderer and chord strip call per frame.

mod backend;
mod chords;
mod error;
mod grid;
mod loop_region;
mod resource;
mod source;
mod transport;
mod viewport;
mod waveform;

pub use backend::{BackendEvent, PlaybackBackend};
pub use chords::{ChordTimeline, ConfidenceTier};
pub use error::{PlaybackError, ResolveError};
pub use grid::BeatGrid;
pub use loop_region::LoopRegion;
pub use resource::ResourceSettings;
pub use source::{AUTHORITY_EXPIRY, PlayableSource, SourceResolver, TrackTiming};
pub use transport::{
    Transport, TransportEvent, TransportSettings, TransportState, WaveformStatus,
};
pub use viewport::{Viewport, Zoom};
pub use waveform::WaveformPoint;
