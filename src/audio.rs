//! Audio output on a dedicated thread.
//!
//! [`AudioPlayer`] is the engine's [`PlaybackBackend`](crate::engine::PlaybackBackend):
//! it forwards commands to the audio thread and reads back the position the
//! thread publishes through a shared handle.

mod player;
mod sink;
mod thread;
mod types;

pub use player::AudioPlayer;

#[cfg(test)]
mod tests;
