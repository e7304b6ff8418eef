//! Per-track analysis sidecars.
//!
//! The chord recognizer writes one JSON document next to each audio file,
//! e.g. `song.mp3` -> `song.chords.json`:
//!
//! ```json
//! { "bpm": 120, "time_signature": 4, "status": "completed",
//!   "chords": [ { "timestamp": 0.0, "formatted_time": "0:00", "chord": "C", "confidence": 93.1 } ] }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::format::format_mmss;
use super::model::{ChordPrediction, TrackStatus};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}: chord {index} is not after the previous one")]
    UnsortedChords { path: PathBuf, index: usize },
    #[error("{path}: chord {index} has invalid timestamp or confidence")]
    InvalidChord { path: PathBuf, index: usize },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Sidecar {
    pub bpm: Option<f64>,
    pub time_signature: Option<u32>,
    pub status: Option<TrackStatus>,
    pub chords: Vec<ChordPrediction>,
}

/// Sidecar path for an audio file: the file stem plus `suffix`, in the same directory.
pub fn sidecar_path(audio: &Path, suffix: &str) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    audio.with_file_name(format!("{stem}{suffix}"))
}

/// Read and validate a sidecar. Returns `Ok(None)` when there is none.
pub fn load_sidecar(path: &Path) -> Result<Option<Sidecar>, CatalogError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CatalogError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut sidecar: Sidecar = serde_json::from_str(&raw).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    validate_chords(path, &sidecar.chords)?;

    for chord in &mut sidecar.chords {
        if chord.formatted_time.trim().is_empty() {
            chord.formatted_time = format_mmss(chord.timestamp);
        }
    }
    sidecar.bpm = sidecar.bpm.filter(|b| b.is_finite() && *b > 0.0);
    sidecar.time_signature = sidecar.time_signature.filter(|n| *n >= 1);

    Ok(Some(sidecar))
}

/// Timestamps must be non-negative and strictly increasing; confidence in [0, 100].
pub(super) fn validate_chords(path: &Path, chords: &[ChordPrediction]) -> Result<(), CatalogError> {
    let mut previous: Option<f64> = None;
    for (index, chord) in chords.iter().enumerate() {
        let ts_ok = chord.timestamp.is_finite() && chord.timestamp >= 0.0;
        let conf_ok = (0.0..=100.0).contains(&chord.confidence);
        if !ts_ok || !conf_ok {
            return Err(CatalogError::InvalidChord {
                path: path.to_path_buf(),
                index,
            });
        }
        if previous.is_some_and(|p| chord.timestamp <= p) {
            return Err(CatalogError::UnsortedChords {
                path: path.to_path_buf(),
                index,
            });
        }
        previous = Some(chord.timestamp);
    }
    Ok(())
}
