use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// Opaque track identifier. For the local catalog this is the path of the
/// audio file relative to the scanned root, using `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Analysis status of a track.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    Completed,
    #[default]
    Processing,
    Error,
}

impl TrackStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Processing => "processing",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub path: PathBuf,
    /// Duration formatted as `m:ss`.
    pub duration: String,
    pub duration_seconds: f64,
    /// File size formatted as `x.y MB` / `x.y KB`.
    pub size: String,
    pub status: TrackStatus,
    /// Container type, upper-cased extension (`MP3`, `FLAC`, ...).
    pub kind: String,
    /// Detected tempo, if the analysis produced one.
    pub bpm: Option<f64>,
    /// Detected time signature numerator, if the analysis produced one.
    pub time_signature: Option<u32>,
}

/// One chord label at a point in time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChordPrediction {
    pub timestamp: f64,
    #[serde(default)]
    pub formatted_time: String,
    pub chord: String,
    pub confidence: f64,
}
