//! Application model: the catalog, the transport and view state.
//!
//! `App` wires the transport's observer list to the chord timeline and a
//! redraw flag, so the event loop only has to ask whether anything moved.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use crate::catalog::{LocalCatalog, Track, TrackId};
use crate::engine::{
    ChordTimeline, PlaybackBackend, Transport, TransportEvent, TransportState, TrackTiming,
    Viewport, WaveformStatus, Zoom,
};

/// View preferences taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    pub zoom_step: f64,
    pub max_zoom: f64,
    pub scroll_smoothing: f64,
    pub skip_seconds: f64,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            zoom_step: 1.5,
            max_zoom: 8.0,
            scroll_smoothing: 0.35,
            skip_seconds: 5.0,
        }
    }
}

/// The main application model.
pub struct App<B> {
    pub catalog: Arc<LocalCatalog>,
    pub transport: Transport<B>,
    pub zoom: Zoom,
    pub timeline: Rc<RefCell<ChordTimeline>>,
    /// Cursor in the track list.
    pub selected: usize,
    pub metadata_window: bool,
    pub current_dir: Option<String>,
    pub skip_seconds: f64,
    /// Frames rendered so far; drives the placeholder animation.
    pub frame: u64,
    /// A waveform drag is in progress.
    pub dragging: bool,
    dirty: Rc<Cell<bool>>,
    message: Rc<RefCell<Option<String>>>,
}

impl<B: PlaybackBackend> App<B> {
    pub fn new(catalog: Arc<LocalCatalog>, transport: Transport<B>, options: ViewOptions) -> Self {
        let mut app = Self {
            catalog,
            transport,
            zoom: Zoom::new(options.zoom_step, options.max_zoom),
            timeline: Rc::new(RefCell::new(ChordTimeline::new(options.scroll_smoothing))),
            selected: 0,
            metadata_window: false,
            current_dir: None,
            skip_seconds: options.skip_seconds,
            frame: 0,
            dragging: false,
            dirty: Rc::new(Cell::new(true)),
            message: Rc::new(RefCell::new(None)),
        };

        let timeline = Rc::clone(&app.timeline);
        let dirty = Rc::clone(&app.dirty);
        let message = Rc::clone(&app.message);
        app.transport.subscribe(move |event: &TransportEvent| {
            match event {
                TransportEvent::Position { position, .. } => {
                    timeline.borrow_mut().sync(*position);
                }
                TransportEvent::TrackChanged(_) => {
                    message.borrow_mut().take();
                }
                TransportEvent::StateChanged(TransportState::Playing) => {
                    message.borrow_mut().take();
                }
                _ => {}
            }
            dirty.set(true);
        });

        let message = Rc::clone(&app.message);
        app.transport
            .set_error_reporter(move |error| *message.borrow_mut() = Some(error.to_string()));

        app
    }

    /// Record the current directory in the app state.
    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    pub fn tracks(&self) -> &[Track] {
        self.catalog.tracks()
    }

    pub fn has_tracks(&self) -> bool {
        !self.tracks().is_empty()
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.tracks().get(self.selected)
    }

    /// The track the transport is holding, if any.
    pub fn active_track(&self) -> Option<&Track> {
        self.transport.track().and_then(|id| self.catalog.track(id))
    }

    pub fn active_index(&self) -> Option<usize> {
        let id = self.transport.track()?;
        self.tracks().iter().position(|t| &t.id == id)
    }

    /// Latest failure message, cleared when playback (re)starts.
    pub fn message(&self) -> Option<String> {
        self.message.borrow().clone()
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
        self.mark_dirty();
    }

    /// Move the cursor to the next track, wrapping around.
    pub fn next(&mut self) {
        let len = self.tracks().len();
        if len > 0 {
            self.selected = (self.selected + 1) % len;
            self.mark_dirty();
        }
    }

    /// Move the cursor to the previous track, wrapping around.
    pub fn prev(&mut self) {
        let len = self.tracks().len();
        if len > 0 {
            self.selected = (self.selected + len - 1) % len;
            self.mark_dirty();
        }
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.mark_dirty();
    }

    pub fn select_last(&mut self) {
        self.selected = self.tracks().len().saturating_sub(1);
        self.mark_dirty();
    }

    /// Make the track at `index` the active one and optionally start it.
    pub fn activate(&mut self, index: usize, play: bool) {
        let Some(track) = self.tracks().get(index) else {
            return;
        };
        let id = track.id.clone();
        let timing = TrackTiming::from(track);
        self.selected = index;

        if self.transport.track() != Some(&id) {
            self.load_chords(&id);
            self.zoom.reset();
            self.transport.select_track(Some((id, timing)));
        }
        if play {
            self.transport.play();
        }
        self.mark_dirty();
    }

    /// Activate and play the track under the cursor.
    pub fn play_selected(&mut self) {
        if self.active_index() == Some(self.selected) && self.transport.is_playing() {
            return;
        }
        self.activate(self.selected, true);
    }

    /// Step the active track by `delta` positions and play it.
    pub fn play_adjacent(&mut self, delta: isize) {
        let len = self.tracks().len();
        if len == 0 {
            return;
        }
        let current = self.active_index().unwrap_or(self.selected) as isize;
        let next = (current + delta).rem_euclid(len as isize) as usize;
        self.activate(next, true);
    }

    fn load_chords(&mut self, id: &TrackId) {
        let chords = self.catalog.chord_predictions(id).to_vec();
        let mut timeline = self.timeline.borrow_mut();
        timeline.set_chords(chords);
        timeline.sync(0.0);
    }

    /// Play/pause; with nothing active, starts the track under the cursor.
    pub fn toggle_playback(&mut self) {
        if self.transport.track().is_none() {
            self.play_selected();
        } else {
            self.transport.toggle();
        }
    }

    pub fn skip_forward(&mut self) {
        self.transport.skip(self.skip_seconds);
    }

    pub fn skip_backward(&mut self) {
        self.transport.skip(-self.skip_seconds);
    }

    pub fn zoom_in(&mut self) {
        self.zoom.zoom_in();
        self.mark_dirty();
    }

    pub fn zoom_out(&mut self) {
        self.zoom.zoom_out();
        self.mark_dirty();
    }

    /// Seek to the chord after (or before) the active one.
    pub fn jump_chord(&mut self, forward: bool) {
        let target = self.timeline.borrow().neighbour_timestamp(forward);
        if let Some(t) = target {
            self.transport.seek(t);
        }
    }

    /// Seek to the chord drawn `entries_from_left` entries into the strip.
    pub fn click_chord(&mut self, entries_from_left: f64) {
        let target = self
            .timeline
            .borrow()
            .entry_at(entries_from_left)
            .map(|c| c.timestamp);
        if let Some(t) = target {
            self.transport.seek(t);
        }
    }

    /// Visible time window for the current zoom and position.
    pub fn viewport(&self) -> Viewport {
        Viewport::compute(
            self.zoom.level(),
            self.transport.position(),
            self.transport.duration(),
        )
    }

    /// Pointer pressed or moved on the waveform at `x` of `width` columns.
    pub fn drag_to(&mut self, x: f64, width: f64) {
        if self.transport.track().is_none() {
            return;
        }
        self.dragging = true;
        let time = self.viewport().time_at(x, width);
        self.transport.seek(time);
    }

    /// Pointer released anywhere on screen.
    pub fn end_drag(&mut self) {
        if self.dragging {
            self.dragging = false;
            self.mark_dirty();
        }
    }

    /// Advance one frame: drain engine work and step animations.
    pub fn tick(&mut self) {
        self.transport.tick();
        if self.timeline.borrow_mut().step() {
            self.mark_dirty();
        }
        if self.is_animating() {
            self.frame = self.frame.wrapping_add(1);
            self.mark_dirty();
        }
    }

    /// Whether frames must be drawn continuously.
    pub fn is_animating(&self) -> bool {
        let placeholder = self.transport.track().is_some()
            && !matches!(self.transport.waveform(), WaveformStatus::Ready(_));
        matches!(
            self.transport.state(),
            TransportState::Playing | TransportState::Loading
        ) || self.timeline.borrow().is_scrolling()
            || placeholder
    }

    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    /// Return and clear the redraw flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.replace(false)
    }
}
