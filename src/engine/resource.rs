//! Ownership of the playback handle for the selected track.
//!
//! Source resolution and waveform summarization run on worker threads. Every
//! request is stamped with the session generation; results for an older
//! generation are dropped without touching state.

use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::catalog::TrackId;

use super::backend::{BackendEvent, PlaybackBackend};
use super::error::{DecodeError, EngineError, ResolveError};
use super::source::{DEFAULT_VALIDITY, PlayableSource, SourceResolver, TrackTiming};
use super::waveform::{DEFAULT_POINTS, WaveformPoint, summarize_file};

pub type Summarizer = fn(&Path, usize) -> Result<Vec<WaveformPoint>, DecodeError>;

#[derive(Debug, Clone, Copy)]
pub struct ResourceSettings {
    pub validity: Duration,
    pub waveform_points: usize,
    pub volume: f32,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            validity: DEFAULT_VALIDITY,
            waveform_points: DEFAULT_POINTS,
            volume: 1.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Pending,
}

/// What changed while draining completions.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEvent {
    Loaded { duration: f64 },
    LoadFailed(EngineError),
    PlayFailed(EngineError),
    Finished,
    Waveform(Result<Vec<WaveformPoint>, DecodeError>),
}

/// Per-track playback state. Dropped wholesale when the selection changes.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub track: TrackId,
    pub timing: TrackTiming,
    source: Option<PlayableSource>,
    handle_ready: bool,
    summarized: bool,
    pub playing: bool,
    pub position: f64,
    pub duration: f64,
    pub loading: bool,
    pub last_error: Option<EngineError>,
}

impl PlaybackSession {
    fn new(track: TrackId, timing: TrackTiming) -> Self {
        Self {
            track,
            timing,
            source: None,
            handle_ready: false,
            summarized: false,
            playing: false,
            position: 0.0,
            duration: timing.duration,
            loading: false,
            last_error: None,
        }
    }
}

struct Resolution {
    generation: u64,
    result: Result<PlayableSource, ResolveError>,
}

struct Summary {
    generation: u64,
    result: Result<Vec<WaveformPoint>, DecodeError>,
}

pub struct ResourceManager<B> {
    backend: B,
    resolver: Arc<dyn SourceResolver>,
    summarizer: Summarizer,
    settings: ResourceSettings,
    generation: u64,
    session: Option<PlaybackSession>,
    resolved_tx: Sender<Resolution>,
    resolved_rx: Receiver<Resolution>,
    summary_tx: Sender<Summary>,
    summary_rx: Receiver<Summary>,
}

impl<B: PlaybackBackend> ResourceManager<B> {
    pub fn new(backend: B, resolver: Arc<dyn SourceResolver>, settings: ResourceSettings) -> Self {
        let (resolved_tx, resolved_rx) = mpsc::channel();
        let (summary_tx, summary_rx) = mpsc::channel();
        Self {
            backend,
            resolver,
            summarizer: summarize_file,
            settings: ResourceSettings {
                volume: settings.volume.clamp(0.0, 1.0),
                ..settings
            },
            generation: 0,
            session: None,
            resolved_tx,
            resolved_rx,
            summary_tx,
            summary_rx,
        }
    }

    /// Replace the function used to compute waveform summaries.
    #[cfg(test)]
    pub(crate) fn with_summarizer(mut self, summarizer: Summarizer) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub fn volume(&self) -> f32 {
        self.settings.volume
    }

    /// Make `track` the active one. Returns false when it already is.
    ///
    /// Any change tears the old session down: playback stops, the handle is
    /// released and in-flight work for the previous generation is abandoned.
    pub fn select(&mut self, track: Option<(TrackId, TrackTiming)>) -> bool {
        let current = self.session.as_ref().map(|s| &s.track);
        if current == track.as_ref().map(|(id, _)| id) {
            return false;
        }

        if self.session.is_some() {
            self.backend.release();
        }
        self.generation += 1;
        self.session = track.map(|(id, timing)| PlaybackSession::new(id, timing));
        log::debug!(
            "resource: generation {} -> {:?}",
            self.generation,
            self.session.as_ref().map(|s| s.track.as_str())
        );
        true
    }

    /// Make sure a playable handle exists for the active track.
    ///
    /// `Ready` when the handle can play now, `Pending` while resolution or
    /// decoding is in flight. A stale source is re-resolved; the position is
    /// restored once the new handle loads.
    pub fn ensure_loaded(&mut self) -> Result<Readiness, EngineError> {
        let generation = self.generation;
        let validity = self.settings.validity;
        let volume = self.settings.volume;
        let Some(session) = self.session.as_mut() else {
            return Err(ResolveError::NoTrack.into());
        };

        let now = Instant::now();
        let fresh = session
            .source
            .as_ref()
            .is_some_and(|s| s.is_fresh(validity, now));

        if session.handle_ready && fresh {
            return Ok(Readiness::Ready);
        }
        if session.loading {
            return Ok(Readiness::Pending);
        }

        session.last_error = None;
        session.loading = true;

        if session.handle_ready {
            // Decoded from a source we no longer trust.
            log::debug!("resource: source for {} expired", session.track);
            session.handle_ready = false;
            session.playing = false;
            session.source = None;
            self.backend.release();
        }

        if let Some(source) = session.source.as_ref().filter(|_| fresh) {
            self.backend.load(generation, source, volume);
            return Ok(Readiness::Pending);
        }

        session.source = None;
        let resolver = Arc::clone(&self.resolver);
        let track = session.track.clone();
        let tx = self.resolved_tx.clone();
        thread::spawn(move || {
            let result = resolver.resolve_playable_source(&track);
            let _ = tx.send(Resolution { generation, result });
        });
        Ok(Readiness::Pending)
    }

    /// Start the loaded handle. Returns false when there is none.
    pub fn play(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.handle_ready {
            return false;
        }
        self.backend.play();
        session.playing = true;
        true
    }

    pub fn pause(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.handle_ready && session.playing {
                self.backend.pause();
            }
            session.playing = false;
        }
    }

    /// Clamp `time` to the track, record it and relocate the device cursor.
    pub fn seek(&mut self, time: f64) -> Option<f64> {
        let session = self.session.as_mut()?;
        let upper = session.duration.max(0.0);
        let time = if time.is_finite() {
            time.clamp(0.0, upper)
        } else {
            session.position
        };
        session.position = time;
        if session.handle_ready {
            self.backend.seek(time);
        }
        Some(time)
    }

    pub fn set_volume(&mut self, volume: f32) -> f32 {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            self.settings.volume
        };
        self.settings.volume = volume;
        self.backend.set_volume(volume);
        volume
    }

    /// Read the device position into the session.
    pub fn sample_position(&mut self) -> Option<f64> {
        let session = self.session.as_mut()?;
        if !session.handle_ready {
            return None;
        }
        let position = self.backend.position()?;
        session.position = position.max(0.0);
        Some(session.position)
    }

    /// Drain completed resolutions, backend reports and summaries.
    pub fn poll(&mut self) -> Vec<ResourceEvent> {
        let mut events = Vec::new();

        while let Ok(resolution) = self.resolved_rx.try_recv() {
            if let Some(event) = self.apply_resolution(resolution) {
                events.push(event);
            }
        }

        for event in self.backend.poll_events() {
            if let Some(event) = self.apply_backend_event(event) {
                events.push(event);
            }
        }

        while let Ok(summary) = self.summary_rx.try_recv() {
            if summary.generation != self.generation || self.session.is_none() {
                log::debug!("resource: dropping waveform for generation {}", summary.generation);
                continue;
            }
            events.push(ResourceEvent::Waveform(summary.result));
        }

        events
    }

    fn apply_resolution(&mut self, resolution: Resolution) -> Option<ResourceEvent> {
        if resolution.generation != self.generation {
            log::debug!(
                "resource: dropping resolution for generation {}",
                resolution.generation
            );
            return None;
        }
        let session = self.session.as_mut()?;

        match resolution.result {
            Ok(source) => {
                log::debug!("resource: resolved {} -> {}", session.track, source.path.display());
                self.backend
                    .load(self.generation, &source, self.settings.volume);
                session.source = Some(source);
                None
            }
            Err(e) => {
                let error = EngineError::from(e);
                session.loading = false;
                session.last_error = Some(error.clone());
                Some(ResourceEvent::LoadFailed(error))
            }
        }
    }

    fn apply_backend_event(&mut self, event: BackendEvent) -> Option<ResourceEvent> {
        let generation = match &event {
            BackendEvent::Loaded { generation, .. }
            | BackendEvent::LoadFailed { generation, .. }
            | BackendEvent::PlayFailed { generation, .. }
            | BackendEvent::Finished { generation } => *generation,
        };
        if generation != self.generation {
            log::debug!("resource: dropping backend report for generation {generation}");
            return None;
        }
        let session = self.session.as_mut()?;

        match event {
            BackendEvent::Loaded { duration, .. } => {
                session.loading = false;
                session.handle_ready = true;
                if let Some(d) = duration.filter(|d| d.is_finite() && *d > 0.0) {
                    session.duration = d;
                }
                if session.position > 0.0 {
                    session.position = session.position.min(session.duration);
                    self.backend.seek(session.position);
                }
                if !session.summarized {
                    session.summarized = true;
                    if let Some(source) = session.source.as_ref() {
                        let path = source.path.clone();
                        let points = self.settings.waveform_points;
                        let summarizer = self.summarizer;
                        let tx = self.summary_tx.clone();
                        let generation = self.generation;
                        thread::spawn(move || {
                            let result = summarizer(&path, points);
                            let _ = tx.send(Summary { generation, result });
                        });
                    }
                }
                Some(ResourceEvent::Loaded {
                    duration: session.duration,
                })
            }
            BackendEvent::LoadFailed { error, .. } => {
                let error = EngineError::from(error);
                session.loading = false;
                session.handle_ready = false;
                session.last_error = Some(error.clone());
                Some(ResourceEvent::LoadFailed(error))
            }
            BackendEvent::PlayFailed { error, .. } => {
                // The device dropped the sink; the next play reloads from the source.
                let error = EngineError::from(error);
                session.playing = false;
                session.handle_ready = false;
                self.backend.release();
                session.last_error = Some(error.clone());
                Some(ResourceEvent::PlayFailed(error))
            }
            BackendEvent::Finished { .. } => Some(ResourceEvent::Finished),
        }
    }

    /// Record a failure raised outside of the resolution/backend paths.
    pub fn record_error(&mut self, error: &EngineError) {
        if let Some(session) = self.session.as_mut() {
            if error.is_fatal() {
                session.playing = false;
            }
            session.last_error = Some(error.clone());
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub(crate) fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[cfg(test)]
    pub(crate) fn inject_resolution(
        &self,
        generation: u64,
        result: Result<PlayableSource, ResolveError>,
    ) {
        let _ = self.resolved_tx.send(Resolution { generation, result });
    }
}
