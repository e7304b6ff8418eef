use super::*;
use crate::engine::backend::BackendEvent;
use crate::engine::error::{DecodeError, PlaybackError, ResolveError};
use crate::engine::resource::{ResourceManager, ResourceSettings, Summarizer};
use crate::engine::source::{AUTHORITY_EXPIRY, PlayableSource};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

#[derive(Default)]
struct FakeBackend {
    loads: Vec<(u64, PathBuf)>,
    playing: bool,
    position: Option<f64>,
    seeks: Vec<f64>,
    releases: usize,
    volume: f32,
    duration: Option<f64>,
    fail_load: bool,
    events: Vec<BackendEvent>,
}

impl PlaybackBackend for FakeBackend {
    fn load(&mut self, generation: u64, source: &PlayableSource, volume: f32) {
        self.loads.push((generation, source.path.clone()));
        self.volume = volume;
        self.playing = false;
        if self.fail_load {
            self.events.push(BackendEvent::LoadFailed {
                generation,
                error: PlaybackError::Decode {
                    path: source.path.clone(),
                    reason: "unsupported format".into(),
                },
            });
        } else {
            self.position = Some(0.0);
            self.events.push(BackendEvent::Loaded {
                generation,
                duration: self.duration,
            });
        }
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, seconds: f64) {
        self.seeks.push(seconds);
        self.position = Some(seconds);
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn release(&mut self) {
        self.releases += 1;
        self.playing = false;
        self.position = None;
    }

    fn position(&self) -> Option<f64> {
        self.position
    }

    fn poll_events(&mut self) -> Vec<BackendEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Resolves every id to a path of the same name. Ids listed in `missing`
/// fail; ids with a gate block until the gate is opened or dropped.
#[derive(Default)]
struct TestResolver {
    missing: Vec<String>,
    gates: Mutex<HashMap<String, Receiver<()>>>,
}

impl TestResolver {
    fn gate(&self, id: &str) -> Sender<()> {
        let (tx, rx) = mpsc::channel();
        self.gates.lock().unwrap().insert(id.to_string(), rx);
        tx
    }
}

impl SourceResolver for TestResolver {
    fn resolve_playable_source(&self, id: &TrackId) -> Result<PlayableSource, ResolveError> {
        let gate = self.gates.lock().unwrap().remove(id.as_str());
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        if self.missing.iter().any(|m| m == id.as_str()) {
            return Err(ResolveError::Unavailable {
                id: id.to_string(),
                path: PathBuf::from(id.as_str()),
                reason: "No such file or directory".into(),
            });
        }
        let now = Instant::now();
        Ok(PlayableSource {
            path: PathBuf::from(id.as_str()),
            resolved_at: now,
            expires_at: now + AUTHORITY_EXPIRY,
        })
    }
}

fn three_points(_: &Path, points: usize) -> Result<Vec<WaveformPoint>, DecodeError> {
    Ok(vec![
        WaveformPoint {
            time: 0.0,
            amplitude: 50.0,
        };
        points.min(3)
    ])
}

fn undecodable(path: &Path, _: usize) -> Result<Vec<WaveformPoint>, DecodeError> {
    Err(DecodeError::Decode {
        path: path.to_path_buf(),
        reason: "end of stream".into(),
    })
}

fn transport_with(
    resolver: Arc<TestResolver>,
    settings: ResourceSettings,
    preload: bool,
    summarizer: Summarizer,
) -> Transport<FakeBackend> {
    let backend = FakeBackend {
        duration: Some(60.0),
        ..FakeBackend::default()
    };
    let resources = ResourceManager::new(backend, resolver, settings).with_summarizer(summarizer);
    Transport::with_resources(resources, preload)
}

fn transport(resolver: TestResolver) -> Transport<FakeBackend> {
    transport_with(
        Arc::new(resolver),
        ResourceSettings::default(),
        false,
        three_points,
    )
}

fn track(id: &str) -> Option<(TrackId, TrackTiming)> {
    Some((TrackId::new(id), TrackTiming::new(60.0, Some(120.0), Some(4))))
}

fn backend(t: &mut Transport<FakeBackend>) -> &mut FakeBackend {
    t.resources_mut().backend_mut()
}

/// Tick until `done` holds. Resolution and summaries arrive from worker threads.
fn settle(t: &mut Transport<FakeBackend>, done: impl Fn(&Transport<FakeBackend>) -> bool) {
    for _ in 0..1000 {
        t.tick();
        if done(t) {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("transport did not settle; state = {:?}", t.state());
}

fn playing(t: &mut Transport<FakeBackend>, id: &str) {
    t.select_track(track(id));
    t.play();
    settle(t, |t| t.state() == TransportState::Playing);
}

fn record_positions(t: &mut Transport<FakeBackend>) -> Rc<RefCell<Vec<f64>>> {
    let positions = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&positions);
    t.subscribe(move |e: &TransportEvent| {
        if let TransportEvent::Position { position, .. } = e {
            sink.borrow_mut().push(*position);
        }
    });
    positions
}

fn record_errors(t: &mut Transport<FakeBackend>) -> Rc<RefCell<Vec<EngineError>>> {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    t.set_error_reporter(move |e| sink.borrow_mut().push(e.clone()));
    errors
}

#[test]
fn play_resolves_loads_then_plays() {
    let mut t = transport(TestResolver::default());
    t.select_track(track("a.mp3"));
    assert_eq!(t.state(), TransportState::Idle);

    t.play();
    assert_eq!(t.state(), TransportState::Loading);
    assert!(t.is_loading());

    settle(&mut t, |t| t.state() == TransportState::Playing);
    assert!(!t.is_loading());
    assert_eq!(t.duration(), 60.0);
    let b = backend(&mut t);
    assert!(b.playing);
    assert_eq!(b.loads, vec![(1, PathBuf::from("a.mp3"))]);
}

#[test]
fn play_without_a_track_reports_and_errors() {
    let mut t = transport(TestResolver::default());
    let errors = record_errors(&mut t);
    t.play();
    assert_eq!(t.state(), TransportState::Errored);
    assert_eq!(
        errors.borrow().as_slice(),
        &[EngineError::Resolution(ResolveError::NoTrack)]
    );
}

#[test]
fn preload_summarizes_before_first_play() {
    let mut t = transport_with(
        Arc::new(TestResolver::default()),
        ResourceSettings::default(),
        true,
        three_points,
    );
    t.select_track(track("a.mp3"));
    assert!(t.is_loading());

    settle(&mut t, |t| t.waveform().points().is_some());
    assert_eq!(t.state(), TransportState::Idle);
    assert_eq!(t.waveform().points().map(<[_]>::len), Some(3));
    assert!(!backend(&mut t).playing);

    t.play();
    assert_eq!(t.state(), TransportState::Playing);
    assert_eq!(backend(&mut t).loads.len(), 1);
}

#[test]
fn pause_during_load_does_not_start_playback() {
    let resolver = TestResolver::default();
    let gate = resolver.gate("a.mp3");
    let mut t = transport(resolver);
    t.select_track(track("a.mp3"));
    t.play();
    t.pause();
    assert_eq!(t.state(), TransportState::Idle);

    gate.send(()).unwrap();
    settle(&mut t, |t| !t.is_loading());
    assert_eq!(t.state(), TransportState::Idle);
    assert!(!backend(&mut t).playing);
}

#[test]
fn late_resolution_for_previous_track_changes_nothing() {
    let resolver = TestResolver::default();
    let gate = resolver.gate("a.mp3");
    let mut t = transport(resolver);

    t.select_track(track("a.mp3"));
    t.play();
    assert_eq!(t.state(), TransportState::Loading);

    playing(&mut t, "b.mp3");
    let loads_before = backend(&mut t).loads.clone();
    assert_eq!(loads_before, vec![(2, PathBuf::from("b.mp3"))]);

    // A finishes resolving only now, through the worker and directly.
    gate.send(()).unwrap();
    let now = Instant::now();
    t.resources_mut().inject_resolution(
        1,
        Ok(PlayableSource {
            path: PathBuf::from("a.mp3"),
            resolved_at: now,
            expires_at: now + AUTHORITY_EXPIRY,
        }),
    );
    backend(&mut t)
        .events
        .push(BackendEvent::Finished { generation: 1 });
    for _ in 0..20 {
        t.tick();
        std::thread::sleep(Duration::from_millis(2));
    }

    assert_eq!(t.track(), Some(&TrackId::new("b.mp3")));
    assert_eq!(t.state(), TransportState::Playing);
    assert_eq!(backend(&mut t).loads, loads_before);
}

#[test]
fn late_failure_for_previous_track_is_swallowed() {
    let resolver = TestResolver {
        missing: vec!["a.mp3".into()],
        ..TestResolver::default()
    };
    let gate = resolver.gate("a.mp3");
    let mut t = transport(resolver);
    let errors = record_errors(&mut t);

    t.select_track(track("a.mp3"));
    t.play();
    playing(&mut t, "b.mp3");
    gate.send(()).unwrap();
    for _ in 0..20 {
        t.tick();
        std::thread::sleep(Duration::from_millis(2));
    }

    assert!(errors.borrow().is_empty());
    assert_eq!(t.state(), TransportState::Playing);
    assert!(t.last_error().is_none());
}

#[test]
fn switching_tracks_releases_and_resets() {
    let mut t = transport(TestResolver::default());
    playing(&mut t, "a.mp3");
    t.seek(30.0);
    t.set_loop_in();

    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    t.subscribe(move |e: &TransportEvent| {
        if let TransportEvent::TrackChanged(id) = e {
            sink.borrow_mut().push(id.clone());
        }
    });

    t.select_track(track("b.mp3"));
    assert_eq!(t.state(), TransportState::Idle);
    assert_eq!(t.position(), 0.0);
    assert!(!t.loop_region().enabled());
    assert_eq!(t.waveform(), &WaveformStatus::Pending);
    assert_eq!(backend(&mut t).releases, 1);
    assert_eq!(changes.borrow().as_slice(), &[Some(TrackId::new("b.mp3"))]);

    // Reselecting the same track is a no-op.
    t.select_track(track("b.mp3"));
    assert_eq!(backend(&mut t).releases, 1);

    t.select_track(None);
    assert_eq!(t.track(), None);
    assert_eq!(backend(&mut t).releases, 2);
}

#[test]
fn seek_clamps_and_is_idempotent() {
    let mut t = transport(TestResolver::default());
    playing(&mut t, "a.mp3");

    t.seek(30.0);
    let once = (t.position(), t.state());
    t.seek(30.0);
    assert_eq!((t.position(), t.state()), once);
    assert_eq!(t.position(), 30.0);

    t.seek(-5.0);
    assert_eq!(t.position(), 0.0);
    t.seek(1_000.0);
    assert_eq!(t.position(), 60.0);
    t.seek(f64::NAN);
    assert_eq!(t.position(), 60.0);

    t.seek(10.0);
    t.skip(5.0);
    assert_eq!(t.position(), 15.0);
    t.skip(-20.0);
    assert_eq!(t.position(), 0.0);
    assert_eq!(backend(&mut t).seeks.last(), Some(&0.0));
}

#[test]
fn position_is_republished_every_tick_while_playing() {
    let mut t = transport(TestResolver::default());
    playing(&mut t, "a.mp3");
    let positions = record_positions(&mut t);

    backend(&mut t).position = Some(3.0);
    t.tick();
    t.tick();
    assert_eq!(positions.borrow().as_slice(), &[3.0, 3.0]);

    t.pause();
    positions.borrow_mut().clear();
    t.tick();
    assert!(positions.borrow().is_empty());
}

#[test]
fn loop_rewrites_position_past_the_out_point() {
    let mut t = transport(TestResolver::default());
    playing(&mut t, "a.mp3");
    t.seek(10.0);
    t.set_loop_in();
    t.seek(20.0);
    t.set_loop_out();
    assert!(t.loop_region().is_active());

    let positions = record_positions(&mut t);
    backend(&mut t).position = Some(20.1);
    t.tick();

    assert_eq!(positions.borrow().last(), Some(&10.0));
    assert_eq!(t.position(), 10.0);
    assert_eq!(t.state(), TransportState::Playing);
    assert_eq!(backend(&mut t).seeks.last(), Some(&10.0));
}

#[test]
fn end_of_track_parks_at_the_end() {
    let mut t = transport(TestResolver::default());
    playing(&mut t, "a.mp3");
    let generation = t.resources_mut().generation();
    backend(&mut t)
        .events
        .push(BackendEvent::Finished { generation });
    t.tick();

    assert_eq!(t.state(), TransportState::Ended);
    assert_eq!(t.position(), 60.0);
    assert!(!backend(&mut t).playing);

    t.play();
    assert_eq!(t.state(), TransportState::Playing);
    assert_eq!(t.position(), 0.0);
}

#[test]
fn reaching_duration_ends_playback() {
    let mut t = transport(TestResolver::default());
    playing(&mut t, "a.mp3");
    backend(&mut t).position = Some(60.0);
    t.tick();
    assert_eq!(t.state(), TransportState::Ended);

    t.seek(12.0);
    assert_eq!(t.state(), TransportState::Paused);
}

#[test]
fn end_of_track_with_active_loop_wraps() {
    let mut t = transport(TestResolver::default());
    playing(&mut t, "a.mp3");
    t.seek(50.0);
    t.set_loop_in();
    t.toggle_loop();
    t.toggle_loop();
    assert!(t.loop_region().is_active());
    assert_eq!(t.loop_region().end(), 60.0);

    let generation = t.resources_mut().generation();
    backend(&mut t)
        .events
        .push(BackendEvent::Finished { generation });
    t.tick();

    assert_eq!(t.state(), TransportState::Playing);
    assert_eq!(t.position(), 50.0);
    assert!(backend(&mut t).playing);
}

#[test]
fn toggle_alternates_play_and_pause() {
    let mut t = transport(TestResolver::default());
    playing(&mut t, "a.mp3");
    t.toggle();
    assert_eq!(t.state(), TransportState::Paused);
    assert!(!backend(&mut t).playing);
    t.toggle();
    assert_eq!(t.state(), TransportState::Playing);
    assert!(backend(&mut t).playing);
}

#[test]
fn resolution_failure_errors_and_retries_on_play() {
    let resolver = TestResolver {
        missing: vec!["gone.mp3".into()],
        ..TestResolver::default()
    };
    let mut t = transport(resolver);
    let errors = record_errors(&mut t);

    t.select_track(track("gone.mp3"));
    t.play();
    settle(&mut t, |t| t.state() == TransportState::Errored);

    assert!(!t.is_loading());
    assert!(matches!(
        t.last_error(),
        Some(EngineError::Resolution(ResolveError::Unavailable { .. }))
    ));
    assert_eq!(errors.borrow().len(), 1);

    t.play();
    assert_eq!(t.state(), TransportState::Loading);
    settle(&mut t, |t| t.state() == TransportState::Errored);
    assert_eq!(errors.borrow().len(), 2);
}

#[test]
fn backend_load_failure_is_a_playback_failure() {
    let mut t = transport(TestResolver::default());
    backend(&mut t).fail_load = true;
    let errors = record_errors(&mut t);

    t.select_track(track("a.mp3"));
    t.play();
    settle(&mut t, |t| t.state() == TransportState::Errored);

    assert!(!backend(&mut t).playing);
    assert!(matches!(
        errors.borrow().first(),
        Some(EngineError::Playback(PlaybackError::Decode { .. }))
    ));
}

#[test]
fn play_failure_stops_playback() {
    let mut t = transport(TestResolver::default());
    playing(&mut t, "a.mp3");
    let generation = t.resources_mut().generation();
    backend(&mut t).events.push(BackendEvent::PlayFailed {
        generation,
        error: PlaybackError::Disconnected,
    });
    t.tick();
    assert_eq!(t.state(), TransportState::Errored);
    assert_eq!(
        t.last_error(),
        Some(&EngineError::Playback(PlaybackError::Disconnected))
    );
}

#[test]
fn play_after_play_failure_reloads_the_handle() {
    let mut t = transport(TestResolver::default());
    playing(&mut t, "a.mp3");
    backend(&mut t).position = Some(12.0);
    t.tick();
    let generation = t.resources_mut().generation();
    backend(&mut t).events.push(BackendEvent::PlayFailed {
        generation,
        error: PlaybackError::Disconnected,
    });
    t.tick();
    assert_eq!(t.state(), TransportState::Errored);
    assert_eq!(backend(&mut t).releases, 1);

    t.play();
    assert_eq!(t.state(), TransportState::Loading);
    settle(&mut t, |t| t.state() == TransportState::Playing);

    let b = backend(&mut t);
    assert_eq!(b.loads.len(), 2);
    assert!(b.playing);
    assert_eq!(b.seeks.last(), Some(&12.0));
    assert_eq!(t.last_error(), None);
}

#[test]
fn decode_failure_keeps_playing() {
    let mut t = transport_with(
        Arc::new(TestResolver::default()),
        ResourceSettings::default(),
        false,
        undecodable,
    );
    let errors = record_errors(&mut t);
    playing(&mut t, "a.mp3");
    settle(&mut t, |t| t.waveform() == &WaveformStatus::Unavailable);

    assert_eq!(t.state(), TransportState::Playing);
    assert!(matches!(
        errors.borrow().as_slice(),
        [EngineError::Decode(DecodeError::Decode { .. })]
    ));
}

#[test]
fn stale_source_is_resolved_again_at_the_same_position() {
    let settings = ResourceSettings {
        validity: Duration::ZERO,
        ..ResourceSettings::default()
    };
    let mut t = transport_with(
        Arc::new(TestResolver::default()),
        settings,
        false,
        three_points,
    );
    playing(&mut t, "a.mp3");
    t.pause();
    t.seek(12.0);

    t.play();
    assert_eq!(t.state(), TransportState::Loading);
    settle(&mut t, |t| t.state() == TransportState::Playing);

    let b = backend(&mut t);
    assert_eq!(b.releases, 1);
    assert_eq!(b.loads.len(), 2);
    assert_eq!(b.seeks.last(), Some(&12.0));
    assert_eq!(t.position(), 12.0);
}

#[test]
fn volume_is_clamped() {
    let mut t = transport(TestResolver::default());
    t.set_volume(1.7);
    assert_eq!(t.volume(), 1.0);
    t.set_volume(-0.2);
    assert_eq!(t.volume(), 0.0);
    t.set_volume(0.4);
    assert_eq!(backend(&mut t).volume, 0.4);
}
