//! Utilities for creating `rodio` sinks from audio files.
//!
//! The helper here encapsulates opening/decoding a file and preparing a
//! paused `Sink` at the requested start position.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

use crate::engine::PlaybackError;

pub(super) struct OpenedSink {
    pub sink: Sink,
    /// Length reported by the decoder, when the container knows it.
    pub duration: Option<Duration>,
}

/// Keep a requested start inside the file.
pub(super) fn clamp_start(start_at: Duration, total: Option<Duration>) -> Duration {
    match total {
        Some(total) => start_at.min(total),
        None => start_at,
    }
}

/// Create a paused `Sink` for `path` that starts playback at `start_at`.
pub(super) fn create_sink_at(
    stream: &OutputStream,
    path: &Path,
    start_at: Duration,
    volume: f32,
) -> Result<OpenedSink, PlaybackError> {
    let file = File::open(path).map_err(|e| PlaybackError::Open {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let duration = decoder.total_duration();

    // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
    let source = decoder.skip_duration(clamp_start(start_at, duration));

    let sink = Sink::connect_new(stream.mixer());
    sink.set_volume(volume);
    sink.append(source);
    sink.pause();
    Ok(OpenedSink { sink, duration })
}
