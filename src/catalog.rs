//! Local track catalog.
//!
//! Stands in for the prediction/catalog service: it lists tracks found under
//! a directory, serves their chord predictions from analysis sidecars and
//! hands out time-limited playable sources.

mod format;
mod model;
mod scan;
mod sidecar;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::config::CatalogSettings;
use crate::engine::{PlayableSource, ResolveError, SourceResolver, AUTHORITY_EXPIRY};

pub use format::format_mmss;
pub use model::*;

pub struct LocalCatalog {
    tracks: Vec<Track>,
    chords: HashMap<TrackId, Vec<ChordPrediction>>,
}

impl LocalCatalog {
    /// Scan `dir` for audio files and their analysis sidecars.
    pub fn open(dir: &Path, settings: &CatalogSettings) -> Self {
        let scanned = scan::scan(dir, settings);
        Self::from_parts(scanned.into_iter().map(|s| (s.track, s.chords)).collect())
    }

    /// Build a catalog from already-known tracks.
    pub fn from_parts(entries: Vec<(Track, Vec<ChordPrediction>)>) -> Self {
        let mut tracks = Vec::with_capacity(entries.len());
        let mut chords = HashMap::with_capacity(entries.len());
        for (track, c) in entries {
            chords.insert(track.id.clone(), c);
            tracks.push(track);
        }
        Self { tracks, chords }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.id == id)
    }

    /// Chord predictions for `id`, already ordered by timestamp.
    pub fn chord_predictions(&self, id: &TrackId) -> &[ChordPrediction] {
        self.chords.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl SourceResolver for LocalCatalog {
    fn resolve_playable_source(&self, id: &TrackId) -> Result<PlayableSource, ResolveError> {
        let track = self
            .track(id)
            .ok_or_else(|| ResolveError::UnknownTrack(id.to_string()))?;

        fs::File::open(&track.path).map_err(|e| ResolveError::Unavailable {
            id: id.to_string(),
            path: track.path.clone(),
            reason: e.to_string(),
        })?;

        let now = Instant::now();
        Ok(PlayableSource {
            path: track.path.clone(),
            resolved_at: now,
            expires_at: now + AUTHORITY_EXPIRY,
        })
    }
}
