//! The transport state machine and its observer list.
//!
//! `Transport` is the single owner of engine state. Every command runs on
//! the event loop thread and never returns an error: failures go to the
//! error reporter and to observers as [`TransportEvent::Error`].

use std::sync::Arc;

use crate::catalog::TrackId;

use super::backend::PlaybackBackend;
use super::error::EngineError;
use super::loop_region::LoopRegion;
use super::resource::{Readiness, ResourceEvent, ResourceManager, ResourceSettings};
use super::source::{SourceResolver, TrackTiming};
use super::waveform::WaveformPoint;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
    Errored,
}

impl TransportState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
            Self::Errored => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum WaveformStatus {
    #[default]
    Pending,
    Ready(Vec<WaveformPoint>),
    Unavailable,
}

impl WaveformStatus {
    pub fn points(&self) -> Option<&[WaveformPoint]> {
        match self {
            Self::Ready(points) => Some(points),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    TrackChanged(Option<TrackId>),
    StateChanged(TransportState),
    Position { position: f64, duration: f64 },
    LoopChanged(LoopRegion),
    WaveformChanged,
    VolumeChanged(f32),
    Error(EngineError),
}

pub trait TransportObserver {
    fn on_event(&mut self, event: &TransportEvent);
}

impl<F: FnMut(&TransportEvent)> TransportObserver for F {
    fn on_event(&mut self, event: &TransportEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransportSettings {
    pub resource: ResourceSettings,
    /// Start resolving and decoding as soon as a track is selected.
    pub preload_on_select: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            resource: ResourceSettings::default(),
            preload_on_select: true,
        }
    }
}

pub struct Transport<B> {
    resources: ResourceManager<B>,
    state: TransportState,
    loop_region: LoopRegion,
    waveform: WaveformStatus,
    play_when_ready: bool,
    preload_on_select: bool,
    observers: Vec<Box<dyn TransportObserver>>,
    error_reporter: Option<Box<dyn FnMut(&EngineError)>>,
}

impl<B: PlaybackBackend> Transport<B> {
    pub fn new(backend: B, resolver: Arc<dyn SourceResolver>, settings: TransportSettings) -> Self {
        Self::with_resources(
            ResourceManager::new(backend, resolver, settings.resource),
            settings.preload_on_select,
        )
    }

    pub fn with_resources(resources: ResourceManager<B>, preload_on_select: bool) -> Self {
        Self {
            resources,
            state: TransportState::Idle,
            loop_region: LoopRegion::new(0.0),
            waveform: WaveformStatus::Pending,
            play_when_ready: false,
            preload_on_select,
            observers: Vec::new(),
            error_reporter: None,
        }
    }

    pub fn subscribe(&mut self, observer: impl TransportObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn set_error_reporter(&mut self, reporter: impl FnMut(&EngineError) + 'static) {
        self.error_reporter = Some(Box::new(reporter));
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn track(&self) -> Option<&TrackId> {
        self.resources.session().map(|s| &s.track)
    }

    pub fn timing(&self) -> Option<TrackTiming> {
        self.resources.session().map(|s| s.timing)
    }

    pub fn position(&self) -> f64 {
        self.resources.session().map_or(0.0, |s| s.position)
    }

    pub fn duration(&self) -> f64 {
        self.resources.session().map_or(0.0, |s| s.duration)
    }

    pub fn is_loading(&self) -> bool {
        self.resources.session().is_some_and(|s| s.loading)
    }

    pub fn last_error(&self) -> Option<&EngineError> {
        self.resources.session().and_then(|s| s.last_error.as_ref())
    }

    pub fn loop_region(&self) -> &LoopRegion {
        &self.loop_region
    }

    pub fn waveform(&self) -> &WaveformStatus {
        &self.waveform
    }

    pub fn volume(&self) -> f32 {
        self.resources.volume()
    }

    /// The playback backend, for shutdown hooks the engine does not model.
    pub fn backend(&self) -> &B {
        self.resources.backend()
    }

    /// Activate `track`, tearing down whatever was selected before.
    pub fn select_track(&mut self, track: Option<(TrackId, TrackTiming)>) {
        if !self.resources.select(track) {
            return;
        }
        self.play_when_ready = false;
        self.loop_region = LoopRegion::new(self.duration());
        self.waveform = WaveformStatus::Pending;
        self.set_state(TransportState::Idle);

        let id = self.track().cloned();
        self.publish(TransportEvent::TrackChanged(id));
        self.publish(TransportEvent::LoopChanged(self.loop_region));
        self.publish(TransportEvent::WaveformChanged);
        self.publish_position();

        if self.preload_on_select && self.track().is_some() {
            if let Err(e) = self.resources.ensure_loaded() {
                self.fail(e);
            }
        }
    }

    pub fn play(&mut self) {
        match self.state {
            TransportState::Playing => return,
            TransportState::Loading => {
                self.play_when_ready = true;
                return;
            }
            TransportState::Ended => {
                self.resources.seek(0.0);
                self.publish_position();
            }
            _ => {}
        }

        match self.resources.ensure_loaded() {
            Ok(Readiness::Ready) => self.start(),
            Ok(Readiness::Pending) => {
                self.play_when_ready = true;
                self.set_state(TransportState::Loading);
            }
            Err(e) => self.fail(e),
        }
    }

    pub fn pause(&mut self) {
        match self.state {
            TransportState::Playing => {
                self.resources.pause();
                self.set_state(TransportState::Paused);
            }
            TransportState::Loading => {
                self.play_when_ready = false;
                self.set_state(TransportState::Idle);
            }
            _ => {}
        }
    }

    pub fn toggle(&mut self) {
        match self.state {
            TransportState::Playing | TransportState::Loading => self.pause(),
            _ => self.play(),
        }
    }

    /// Pause and rewind to the start.
    pub fn stop(&mut self) {
        if self.track().is_none() {
            return;
        }
        self.play_when_ready = false;
        self.resources.pause();
        self.resources.seek(0.0);
        if self.state != TransportState::Errored {
            self.set_state(TransportState::Idle);
        }
        self.publish_position();
    }

    pub fn seek(&mut self, time: f64) {
        let Some(position) = self.resources.seek(time) else {
            return;
        };
        log::debug!("transport: seek to {position:.2}");
        if self.state == TransportState::Ended && position < self.duration() {
            self.set_state(TransportState::Paused);
        }
        self.publish_position();
    }

    pub fn skip(&mut self, delta: f64) {
        self.seek(self.position() + delta);
    }

    pub fn set_volume(&mut self, volume: f32) {
        let applied = self.resources.set_volume(volume);
        self.publish(TransportEvent::VolumeChanged(applied));
    }

    pub fn toggle_loop(&mut self) {
        self.loop_region.toggle();
        self.publish(TransportEvent::LoopChanged(self.loop_region));
    }

    pub fn set_loop_in(&mut self) {
        self.loop_region.set_in(self.position());
        self.publish(TransportEvent::LoopChanged(self.loop_region));
    }

    pub fn set_loop_out(&mut self) {
        self.loop_region.set_out(self.position());
        self.publish(TransportEvent::LoopChanged(self.loop_region));
    }

    /// Apply completed background work and, while playing, sample and
    /// publish the position. Called once per frame.
    pub fn tick(&mut self) {
        for event in self.resources.poll() {
            self.apply(event);
        }

        if self.state != TransportState::Playing {
            return;
        }

        let mut position = self
            .resources
            .sample_position()
            .unwrap_or_else(|| self.position());

        if let Some(start) = self.loop_region.redirect(position) {
            log::debug!("transport: loop {position:.2} -> {start:.2}");
            position = self.resources.seek(start).unwrap_or(start);
        } else if self.duration() > 0.0 && position >= self.duration() {
            self.finish();
            return;
        }

        self.publish(TransportEvent::Position {
            position,
            duration: self.duration(),
        });
    }

    fn apply(&mut self, event: ResourceEvent) {
        match event {
            ResourceEvent::Loaded { duration } => {
                self.loop_region.set_duration(duration);
                self.publish(TransportEvent::LoopChanged(self.loop_region));
                if self.play_when_ready {
                    self.start();
                } else {
                    self.publish_position();
                }
            }
            ResourceEvent::LoadFailed(e) | ResourceEvent::PlayFailed(e) => self.fail(e),
            ResourceEvent::Finished => {
                if self.state == TransportState::Playing {
                    self.finish();
                }
            }
            ResourceEvent::Waveform(Ok(points)) => {
                log::debug!("transport: waveform ready ({} points)", points.len());
                self.waveform = WaveformStatus::Ready(points);
                self.publish(TransportEvent::WaveformChanged);
            }
            ResourceEvent::Waveform(Err(e)) => {
                self.waveform = WaveformStatus::Unavailable;
                self.publish(TransportEvent::WaveformChanged);
                self.report(e.into());
            }
        }
    }

    fn start(&mut self) {
        self.play_when_ready = false;
        if self.resources.play() {
            self.set_state(TransportState::Playing);
            self.publish_position();
        }
    }

    /// End of audio: wrap when looping, otherwise park at the end.
    fn finish(&mut self) {
        if self.loop_region.is_active() {
            let start = self.loop_region.start();
            self.resources.seek(start);
            self.resources.play();
            self.publish_position();
            return;
        }
        self.resources.pause();
        self.resources.seek(self.duration());
        self.set_state(TransportState::Ended);
        self.publish_position();
    }

    fn fail(&mut self, error: EngineError) {
        self.play_when_ready = false;
        if error.is_fatal() {
            self.resources.pause();
            self.set_state(TransportState::Errored);
        }
        self.report(error);
    }

    fn report(&mut self, error: EngineError) {
        if error.is_fatal() {
            log::error!("transport: {error}");
        } else {
            log::warn!("transport: {error}");
        }
        self.resources.record_error(&error);
        if let Some(reporter) = self.error_reporter.as_mut() {
            reporter(&error);
        }
        self.publish(TransportEvent::Error(error));
    }

    fn set_state(&mut self, state: TransportState) {
        if self.state == state {
            return;
        }
        log::debug!("transport: {} -> {}", self.state.label(), state.label());
        self.state = state;
        self.publish(TransportEvent::StateChanged(state));
    }

    fn publish_position(&mut self) {
        self.publish(TransportEvent::Position {
            position: self.position(),
            duration: self.duration(),
        });
    }

    fn publish(&mut self, event: TransportEvent) {
        for observer in self.observers.iter_mut() {
            observer.on_event(&event);
        }
    }

    #[cfg(test)]
    pub(crate) fn resources_mut(&mut self) -> &mut ResourceManager<B> {
        &mut self.resources
    }
}

#[cfg(test)]
mod tests;
