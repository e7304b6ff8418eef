//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

mod chords;
mod waveform;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, List, ListItem, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock};

use crate::app::App;
use crate::catalog::{Track, format_mmss};
use crate::config::UiSettings;
use crate::engine::{BeatGrid, PlaybackBackend, TransportState, WaveformStatus};

pub use chords::column_to_entries;
pub use waveform::column_to_x;

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "up/down");
    map.insert("gg/G", "top/bottom");
    map.insert("enter", "play selected");
    map.insert("space/p", "play/pause");
    map.insert("h/l", "prev/next track");
    // H/L is filled dynamically from config.
    map.insert("[/]", "prev/next chord");
    map.insert("+/-", "zoom");
    map.insert("i/o", "loop in/out");
    map.insert("r", "loop on/off");
    map.insert("9/0", "volume");
    map.insert("K", "metadata");
    map.insert("q", "quit");
    map
});

/// Render the controls help text, incorporating skip seconds.
fn controls_text(skip_seconds: f64) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = [
        "j/k", "gg/G", "enter", "space/p", "H/L", "h/l", "[/]", "+/-", "i/o", "r", "9/0", "K",
        "q",
    ];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] skip -/+{skip_seconds}s"))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{k}] {v}"))
            }
        })
        .chain(std::iter::once("[mouse] drag waveform / click chord".to_string()))
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Screen regions the event loop needs for mouse hit-testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct UiLayout {
    /// Drawing area of the waveform, inside its border.
    pub waveform: Rect,
    /// Drawing area of the chord strip, inside its border.
    pub chords: Rect,
    /// Number of chord cards that fit in the strip.
    pub chord_capacity: f64,
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    // Keep the popup smaller and avoid covering the entire UI.
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn padded() -> Padding {
    Padding {
        left: 1,
        right: 0,
        top: 0,
        bottom: 0,
    }
}

/// One-based bar and beat counters at `position`.
fn bar_and_beat(grid: &BeatGrid, position: f64) -> (u64, u64) {
    let position = if position.is_finite() { position.max(0.0) } else { 0.0 };
    let (beat, measure) = (grid.beat_interval(), grid.measure_interval());
    let bar = (position / measure).floor();
    let beats_per_bar = (measure / beat).round();
    let beat_in_bar = ((position - bar * measure) / beat)
        .floor()
        .clamp(0.0, beats_per_bar - 1.0);
    (bar as u64 + 1, beat_in_bar as u64 + 1)
}

fn status_text<B: PlaybackBackend>(app: &App<B>) -> String {
    let transport = &app.transport;
    let mut parts: Vec<String> = Vec::new();

    let state = match transport.state() {
        TransportState::Idle if transport.is_loading() => "Loading",
        TransportState::Idle => "Stopped",
        TransportState::Loading => "Loading",
        TransportState::Playing => "Playing",
        TransportState::Paused => "Paused",
        TransportState::Ended => "Ended",
        TransportState::Errored => "Error",
    };
    parts.push(format!(" {state}"));

    match app.active_track() {
        Some(track) => {
            parts.push(format!(
                "Song: {} [{} / {}]",
                track.name,
                format_mmss(transport.position()),
                format_mmss(transport.duration())
            ));
            if let Some(timing) = transport.timing() {
                let grid = BeatGrid::new(timing.bpm, timing.time_signature);
                let (bar, beat) = bar_and_beat(&grid, transport.position());
                parts.push(format!(
                    "{:.0} BPM {}/4 bar {bar}.{beat}",
                    timing.bpm, timing.time_signature
                ));
            }
        }
        None => parts.push("No track".to_string()),
    }

    parts.push(format!("Zoom: x{:.1}", app.zoom.level()));

    let region = transport.loop_region();
    parts.push(format!(
        "Loop: {}-{} {}",
        format_mmss(region.start()),
        format_mmss(region.end()),
        if region.enabled() { "ON" } else { "OFF" }
    ));

    parts.push(format!("Vol: {:.0}%", transport.volume() * 100.0));

    if let Some(dir) = &app.current_dir {
        parts.push(format!("Dir: {dir}"));
    }

    let message = app
        .message()
        .or_else(|| transport.last_error().map(ToString::to_string));
    if let Some(message) = message {
        parts.push(format!("! {message}"));
    }

    parts.join(" • ")
}

fn metadata_text(track: Option<&Track>) -> String {
    let Some(track) = track else {
        return "No track selected".to_string();
    };
    let bpm = track
        .bpm
        .map_or_else(|| "-".to_string(), |b| format!("{b:.0}"));
    let meter = track
        .time_signature
        .map_or_else(|| "-".to_string(), |n| format!("{n}/4"));
    format!(
        "Name: {}\nDuration: {}\nSize: {}\nType: {}\nBPM: {}\nMeter: {}\nStatus: {}\nPath: {}",
        track.name,
        track.duration,
        track.size,
        track.kind,
        bpm,
        meter,
        track.status.label(),
        track.path.display()
    )
}

/// Render the entire UI into the provided `frame` and report where the
/// interactive regions ended up.
pub fn draw<B: PlaybackBackend>(frame: &mut Frame, app: &App<B>, ui_settings: &UiSettings) -> UiLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(6),
            Constraint::Length(5),
            Constraint::Length(8),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" chordsync ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let status_par = Paragraph::new(status_text(app))
        .block(Block::bordered().padding(padded()).title(" status "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Waveform
    let transport = &app.transport;
    let waveform_block = Block::default().borders(Borders::ALL).title(" waveform ");
    let waveform_area = waveform_block.inner(chunks[2]);
    let placeholder = match transport.waveform() {
        _ if transport.track().is_none() => "",
        WaveformStatus::Pending => " analysing audio ",
        WaveformStatus::Unavailable => " waveform unavailable ",
        WaveformStatus::Ready(_) => "",
    };
    let mut view = waveform::WaveformView::new(
        app.viewport(),
        transport.duration(),
        transport.position(),
    )
    .points(transport.waveform().points())
    .loop_region(*transport.loop_region())
    .placeholder(placeholder, app.frame)
    .block(waveform_block);
    if let Some(timing) = transport.timing() {
        view = view.grid(BeatGrid::new(timing.bpm, timing.time_signature));
    }
    frame.render_widget(view, chunks[2]);

    // Chord strip
    let chords_block = Block::default().borders(Borders::ALL).title(" chords ");
    let chords_area = chords_block.inner(chunks[3]);
    {
        let timeline = app.timeline.borrow();
        frame.render_widget(chords::ChordStrip::new(&timeline).block(chords_block), chunks[3]);
    }

    // Track list
    {
        let tracks = app.tracks();
        let active = app.active_index();

        // Center the selected item when possible by creating a visible window.
        // Important: only build ListItems for the visible window (avoid allocating the entire list).
        let total = tracks.len();
        let list_height = chunks[4].height.saturating_sub(2) as usize;
        let sel_pos = app.selected.min(total.saturating_sub(1));
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let visible_items: Vec<ListItem> = tracks[start..end]
            .iter()
            .enumerate()
            .map(|(offset, t)| {
                let marker = if active == Some(start + offset) { "♪ " } else { "  " };
                let text = format!("{marker}{}  {}  [{}]", t.name, t.duration, t.status.label());
                let style = match t.status {
                    crate::catalog::TrackStatus::Error => Style::default().fg(Color::Red),
                    crate::catalog::TrackStatus::Processing => Style::default().fg(Color::DarkGray),
                    crate::catalog::TrackStatus::Completed => Style::default(),
                };
                ListItem::new(text).style(style)
            })
            .collect();

        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(" tracks "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, chunks[4], &mut state);
    }

    // Overlay metadata popup (keeps the waveform visible under it)
    if app.metadata_window {
        let popup_area = centered_rect_sized(72, 10, chunks[2]);
        frame.render_widget(Clear, popup_area);

        let meta_paragraph = Paragraph::new(metadata_text(app.selected_track()))
            .block(
                Block::default()
                    .padding(padded())
                    .borders(Borders::ALL)
                    .title(" metadata (K closes) "),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(meta_paragraph, popup_area);
    }

    let footer = Paragraph::new(controls_text(app.skip_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(padded()),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[5]);

    UiLayout {
        waveform: waveform_area,
        chords: chords_area,
        chord_capacity: chords::capacity(chords_area.width),
    }
}
