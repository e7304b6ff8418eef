use std::time::Duration;

use crate::app::{App, ViewOptions};
use crate::config;
use crate::engine::{PlaybackBackend, ResourceSettings, TransportSettings};

pub fn transport_settings(settings: &config::Settings) -> TransportSettings {
    TransportSettings {
        resource: ResourceSettings {
            validity: Duration::from_secs(settings.audio.source_validity_secs),
            waveform_points: settings.waveform.points,
            volume: settings.audio.volume.clamp(0.0, 1.0),
        },
        preload_on_select: settings.audio.preload_on_select,
    }
}

pub fn view_options(settings: &config::Settings) -> ViewOptions {
    ViewOptions {
        zoom_step: settings.waveform.zoom_step,
        max_zoom: settings.waveform.max_zoom,
        scroll_smoothing: settings.ui.scroll_smoothing,
        skip_seconds: settings.controls.skip_seconds as f64,
    }
}

/// Make the first track active without playing it, so its chords are on
/// screen (and, with preloading, its waveform) before the first keypress.
pub fn activate_first_track<B: PlaybackBackend>(app: &mut App<B>) {
    if app.has_tracks() {
        app.activate(0, false);
    }
}
