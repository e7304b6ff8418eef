use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/chordsync/config.toml` or `~/.config/chordsync/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `CHORDSYNC__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub waveform: WaveformSettings,
    pub ui: UiSettings,
    pub controls: ControlsSettings,
    pub catalog: CatalogSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Output volume applied to every new sink (0.0 - 1.0).
    pub volume: f32,
    /// How long a resolved source is reused before it is resolved again (seconds).
    pub source_validity_secs: u64,
    /// Resolve and decode a track as soon as it is selected.
    pub preload_on_select: bool,
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            source_validity_secs: 55 * 60,
            preload_on_select: true,
            quit_fade_out_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WaveformSettings {
    /// Number of summary points computed per track.
    pub points: usize,
    /// Factor applied per zoom step.
    pub zoom_step: f64,
    pub max_zoom: f64,
}

impl Default for WaveformSettings {
    fn default() -> Self {
        Self {
            points: 150,
            zoom_step: 1.5,
            max_zoom: 8.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
    /// Frame interval while playing or animating (milliseconds).
    pub tick_ms: u64,
    /// Input poll interval while nothing moves (milliseconds).
    pub idle_poll_ms: u64,
    /// Fraction of the remaining distance the chord strip scrolls per frame.
    pub scroll_smoothing: f64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ chordsync ~ ".to_string(),
            tick_ms: 33,
            idle_poll_ms: 100,
            scroll_smoothing: 0.35,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to skip when pressing `H` / `L`.
    pub skip_seconds: u64,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self { skip_seconds: 5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
    /// Suffix replacing the audio extension to find a track's analysis file.
    ///
    /// Example: `song.mp3` -> `song.chords.json`
    pub sidecar_suffix: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            extensions: ["mp3", "flac", "wav", "ogg", "m4a"]
                .into_iter()
                .map(String::from)
                .collect(),
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
            sidecar_suffix: ".chords.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Log file. Defaults to `$XDG_STATE_HOME/chordsync/chordsync.log`.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
