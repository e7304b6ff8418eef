use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{Terminal, backend::CrosstermBackend, layout::Position};

use crate::app::App;
use crate::config;
use crate::engine::PlaybackBackend;
use crate::mpris::ControlCmd;
use crate::mpris::MprisHandle;
use crate::runtime::mpris_sync::update_mpris;
use crate::ui::{self, UiLayout};

const VOLUME_STEP: f32 = 0.05;

/// State tracked by the runtime event loop across iterations.
#[derive(Debug, Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    /// Where the last frame put the interactive regions.
    pub layout: UiLayout,
}

/// Main terminal event loop: handles input, drives the transport, redraws
/// and keeps MPRIS in sync. Returns `Ok(())` when shutdown is requested.
pub fn run<B: PlaybackBackend>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App<B>,
    mpris: &MprisHandle,
    control_tx: &mpsc::Sender<ControlCmd>,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    let active_interval = Duration::from_millis(settings.ui.tick_ms);
    let idle_interval = Duration::from_millis(settings.ui.idle_poll_ms.max(1));

    loop {
        app.tick();

        while let Ok(cmd) = control_rx.try_recv() {
            if handle_control_cmd(cmd, app) {
                return Ok(());
            }
        }

        update_mpris(mpris, app);

        let animating = app.is_animating();
        if app.take_dirty() || animating {
            let mut layout = state.layout;
            terminal.draw(|f| layout = ui::draw(f, app, &settings.ui))?;
            state.layout = layout;
            app.timeline
                .borrow_mut()
                .set_visible_entries(layout.chord_capacity);
        }

        let timeout = if animating {
            active_interval
        } else {
            idle_interval
        };
        if !event::poll(timeout)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, app, control_tx, state) {
                    break;
                }
            }
            Event::Mouse(mouse) => handle_mouse_event(mouse, app, &state.layout),
            Event::Resize(..) => app.mark_dirty(),
            _ => {}
        }
    }

    Ok(())
}

/// Apply one bus command. Returns true when the app should quit.
pub(crate) fn handle_control_cmd<B: PlaybackBackend>(cmd: ControlCmd, app: &mut App<B>) -> bool {
    log::debug!("control: {cmd:?}");
    match cmd {
        ControlCmd::Quit => return true,
        ControlCmd::Play => {
            if app.transport.track().is_none() {
                app.play_selected();
            } else {
                app.transport.play();
            }
        }
        ControlCmd::Pause => app.transport.pause(),
        ControlCmd::PlayPause => app.toggle_playback(),
        ControlCmd::Stop => app.transport.stop(),
        ControlCmd::Next => app.play_adjacent(1),
        ControlCmd::Prev => app.play_adjacent(-1),
        ControlCmd::Seek(offset) => app.transport.skip(offset as f64 / 1_000_000.0),
        ControlCmd::SetPosition(position) => {
            app.transport.seek(position as f64 / 1_000_000.0);
        }
        ControlCmd::SetVolume(volume) => {
            app.transport.set_volume(volume as f32);
        }
    }
    app.mark_dirty();
    false
}

/// Apply one key press. Returns true when the app should quit.
pub(crate) fn handle_key_event<B: PlaybackBackend>(
    key: KeyEvent,
    app: &mut App<B>,
    control_tx: &mpsc::Sender<ControlCmd>,
    state: &mut EventLoopState,
) -> bool {
    if key.code != KeyCode::Char('g') {
        state.pending_gg = false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                app.select_first();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.prev(),
        KeyCode::Enter => app.play_selected(),
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            let _ = control_tx.send(ControlCmd::PlayPause);
        }
        KeyCode::Char('l') => {
            let _ = control_tx.send(ControlCmd::Next);
        }
        KeyCode::Char('h') => {
            let _ = control_tx.send(ControlCmd::Prev);
        }
        KeyCode::Char('L') | KeyCode::Right => app.skip_forward(),
        KeyCode::Char('H') | KeyCode::Left => app.skip_backward(),
        KeyCode::Char(']') => app.jump_chord(true),
        KeyCode::Char('[') => app.jump_chord(false),
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') => app.zoom_out(),
        KeyCode::Char('i') => app.transport.set_loop_in(),
        KeyCode::Char('o') => app.transport.set_loop_out(),
        KeyCode::Char('r') => app.transport.toggle_loop(),
        KeyCode::Char('9') => {
            let volume = app.transport.volume() - VOLUME_STEP;
            app.transport.set_volume(volume);
        }
        KeyCode::Char('0') => {
            let volume = app.transport.volume() + VOLUME_STEP;
            app.transport.set_volume(volume);
        }
        KeyCode::Char('K') => app.toggle_metadata_window(),
        KeyCode::Esc if app.metadata_window => app.toggle_metadata_window(),
        _ => {}
    }

    false
}

pub(crate) fn handle_mouse_event<B: PlaybackBackend>(
    mouse: MouseEvent,
    app: &mut App<B>,
    layout: &UiLayout,
) {
    let at = Position::new(mouse.column, mouse.row);
    let waveform = layout.waveform;
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if waveform.contains(at) {
                app.drag_to(
                    ui::column_to_x(waveform, mouse.column),
                    f64::from(waveform.width),
                );
            } else if layout.chords.contains(at) {
                app.click_chord(ui::column_to_entries(layout.chords, mouse.column));
            }
        }
        MouseEventKind::Drag(MouseButton::Left) if app.dragging => {
            app.drag_to(
                ui::column_to_x(waveform, mouse.column),
                f64::from(waveform.width),
            );
        }
        MouseEventKind::Up(_) => app.end_drag(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{app_with, settle};
    use crate::engine::TransportState;
    use crossterm::event::KeyModifiers;
    use ratatui::layout::Rect;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn gg_needs_two_presses() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(&dir, &["a", "b", "c"]);
        let (tx, _rx) = mpsc::channel();
        let mut state = EventLoopState::default();

        handle_key_event(press(KeyCode::Char('G')), &mut app, &tx, &mut state);
        assert_eq!(app.selected, 2);
        handle_key_event(press(KeyCode::Char('g')), &mut app, &tx, &mut state);
        assert_eq!(app.selected, 2);
        handle_key_event(press(KeyCode::Char('j')), &mut app, &tx, &mut state);
        handle_key_event(press(KeyCode::Char('g')), &mut app, &tx, &mut state);
        assert_eq!(app.selected, 0);
        handle_key_event(press(KeyCode::Char('k')), &mut app, &tx, &mut state);
        handle_key_event(press(KeyCode::Char('g')), &mut app, &tx, &mut state);
        handle_key_event(press(KeyCode::Char('g')), &mut app, &tx, &mut state);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn play_keys_go_through_the_control_channel() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(&dir, &["a", "b"]);
        let (tx, rx) = mpsc::channel();
        let mut state = EventLoopState::default();

        handle_key_event(press(KeyCode::Char(' ')), &mut app, &tx, &mut state);
        handle_key_event(press(KeyCode::Char('l')), &mut app, &tx, &mut state);
        assert_eq!(rx.try_recv().unwrap(), ControlCmd::PlayPause);
        assert_eq!(rx.try_recv().unwrap(), ControlCmd::Next);
        assert!(handle_key_event(
            press(KeyCode::Char('q')),
            &mut app,
            &tx,
            &mut state
        ));
    }

    #[test]
    fn control_commands_drive_the_transport() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(&dir, &["a", "b"]);

        assert!(!handle_control_cmd(ControlCmd::Play, &mut app));
        settle(&mut app, |a| a.transport.is_playing());
        assert_eq!(app.active_index(), Some(0));

        handle_control_cmd(ControlCmd::SetPosition(6_000_000), &mut app);
        assert_eq!(app.transport.position(), 6.0);
        handle_control_cmd(ControlCmd::Seek(-2_500_000), &mut app);
        assert_eq!(app.transport.position(), 3.5);

        handle_control_cmd(ControlCmd::SetVolume(3.0), &mut app);
        assert_eq!(app.transport.volume(), 1.0);

        handle_control_cmd(ControlCmd::Pause, &mut app);
        assert_eq!(app.transport.state(), TransportState::Paused);

        handle_control_cmd(ControlCmd::Next, &mut app);
        assert_eq!(app.active_index(), Some(1));

        assert!(handle_control_cmd(ControlCmd::Quit, &mut app));
    }

    #[test]
    fn loop_keys_set_and_toggle_the_region() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(&dir, &["a"]);
        let (tx, _rx) = mpsc::channel();
        let mut state = EventLoopState::default();
        app.play_selected();
        settle(&mut app, |a| a.transport.is_playing());

        app.transport.seek(4.0);
        handle_key_event(press(KeyCode::Char('i')), &mut app, &tx, &mut state);
        app.transport.seek(8.0);
        handle_key_event(press(KeyCode::Char('o')), &mut app, &tx, &mut state);
        let region = *app.transport.loop_region();
        assert_eq!((region.start(), region.end()), (4.0, 8.0));
        assert!(region.enabled());

        handle_key_event(press(KeyCode::Char('r')), &mut app, &tx, &mut state);
        assert!(!app.transport.loop_region().enabled());
    }

    #[test]
    fn mouse_seeks_on_waveform_and_chords() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(&dir, &["a"]);
        app.timeline.borrow_mut().set_visible_entries(8.0);
        app.play_selected();
        settle(&mut app, |a| a.transport.is_playing());

        let layout = UiLayout {
            waveform: Rect::new(1, 5, 16, 6),
            chords: Rect::new(1, 12, 72, 3),
            chord_capacity: 8.0,
        };

        handle_mouse_event(
            mouse(MouseEventKind::Down(MouseButton::Left), 9, 7),
            &mut app,
            &layout,
        );
        assert!(app.dragging);
        assert_eq!(app.transport.position(), 8.5);

        // Dragging past the right edge pins to the last column.
        handle_mouse_event(
            mouse(MouseEventKind::Drag(MouseButton::Left), 40, 2),
            &mut app,
            &layout,
        );
        assert_eq!(app.transport.position(), 15.5);

        handle_mouse_event(mouse(MouseEventKind::Up(MouseButton::Left), 40, 2), &mut app, &layout);
        assert!(!app.dragging);

        // Third card of the chord strip.
        handle_mouse_event(
            mouse(MouseEventKind::Down(MouseButton::Left), 1 + 2 * 9 + 3, 13),
            &mut app,
            &layout,
        );
        assert_eq!(app.transport.position(), 8.0);
    }
}
