use std::fs;
use std::path::Path;

use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};
use walkdir::WalkDir;

use crate::config::CatalogSettings;

use super::format::{format_mmss, format_size};
use super::model::{ChordPrediction, Track, TrackId, TrackStatus};
use super::sidecar::{load_sidecar, sidecar_path};

/// A scanned track together with its chord predictions.
pub struct ScannedTrack {
    pub track: Track,
    pub chords: Vec<ChordPrediction>,
}

fn is_audio_file(path: &Path, settings: &CatalogSettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn track_id(root: &Path, path: &Path) -> TrackId {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    TrackId::new(parts.join("/"))
}

pub fn scan(dir: &Path, settings: &CatalogSettings) -> Vec<ScannedTrack> {
    let mut scanned: Vec<ScannedTrack> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        let visible = settings.include_hidden || !is_hidden(path);
        if !path.is_file() || !visible || !is_audio_file(path, settings) {
            continue;
        }

        let mut name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string();
        let mut duration_seconds = 0.0;

        if let Ok(tagged) = lofty::read_from_path(path) {
            duration_seconds = tagged.properties().duration().as_secs_f64();

            if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                if let Some(v) = tag.get_string(&ItemKey::TrackTitle) {
                    if !v.trim().is_empty() {
                        name = v.trim().to_string();
                    }
                }
            }
        }

        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let kind = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_uppercase())
            .unwrap_or_default();

        let (status, bpm, time_signature, chords) =
            match load_sidecar(&sidecar_path(path, &settings.sidecar_suffix)) {
                Ok(Some(sidecar)) => (
                    sidecar.status.unwrap_or(TrackStatus::Completed),
                    sidecar.bpm,
                    sidecar.time_signature,
                    sidecar.chords,
                ),
                Ok(None) => (TrackStatus::Processing, None, None, Vec::new()),
                Err(e) => {
                    log::warn!("catalog: ignoring analysis for {}: {e}", path.display());
                    (TrackStatus::Error, None, None, Vec::new())
                }
            };

        scanned.push(ScannedTrack {
            track: Track {
                id: track_id(dir, path),
                name,
                path: path.to_path_buf(),
                duration: format_mmss(duration_seconds),
                duration_seconds,
                size: format_size(size),
                status,
                kind,
                bpm,
                time_signature,
            },
            chords,
        });
    }

    scanned.sort_by(|a, b| {
        a.track
            .name
            .to_lowercase()
            .cmp(&b.track.name.to_lowercase())
    });
    log::info!("catalog: {} tracks under {}", scanned.len(), dir.display());
    scanned
}
