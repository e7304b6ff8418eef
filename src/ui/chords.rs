//! Horizontal chord strip with one fixed-width card per prediction.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Widget},
};

use crate::engine::{ChordTimeline, ConfidenceTier};

/// Card width in terminal columns, separator included.
pub const CARD_WIDTH: u16 = 9;

/// How many cards fit in a strip `width` columns wide.
pub fn capacity(width: u16) -> f64 {
    f64::from(width) / f64::from(CARD_WIDTH)
}

/// Fractional entry position of terminal column `column` inside `inner`.
pub fn column_to_entries(inner: Rect, column: u16) -> f64 {
    f64::from(column.saturating_sub(inner.x)) / f64::from(CARD_WIDTH)
}

fn tier_color(tier: ConfidenceTier) -> Color {
    match tier {
        ConfidenceTier::High => Color::Green,
        ConfidenceTier::Medium => Color::Yellow,
        ConfidenceTier::Low => Color::Red,
    }
}

pub struct ChordStrip<'a> {
    timeline: &'a ChordTimeline,
    block: Option<Block<'a>>,
}

impl<'a> ChordStrip<'a> {
    pub fn new(timeline: &'a ChordTimeline) -> Self {
        Self {
            timeline,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for ChordStrip<'_> {
    fn render(mut self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = self.block.take() {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let chords = self.timeline.chords();
        if chords.is_empty() {
            buf.set_stringn(
                inner.x,
                inner.y,
                "no chord predictions",
                inner.width as usize,
                Style::default().fg(Color::DarkGray),
            );
            return;
        }

        let offset = self.timeline.offset();
        let first = offset.floor().max(0.0) as usize;
        let card = f64::from(CARD_WIDTH);

        for (i, chord) in chords.iter().enumerate().skip(first) {
            let x = ((i as f64 - offset) * card).round();
            if x < 0.0 {
                continue;
            }
            if x >= f64::from(inner.width) {
                break;
            }
            let x = inner.x + x as u16;
            let room = (inner.right() - x).min(CARD_WIDTH - 1) as usize;

            let active = self.timeline.active() == Some(i);
            let base = if active {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };

            let rows = [
                (
                    chord.chord.clone(),
                    base.add_modifier(Modifier::BOLD),
                ),
                (chord.formatted_time.clone(), base.fg(Color::Gray)),
                (
                    format!("{:.0}%", chord.confidence),
                    base.fg(tier_color(ConfidenceTier::of(chord.confidence))),
                ),
            ];
            for (dy, (text, style)) in rows.into_iter().enumerate() {
                if dy as u16 >= inner.height {
                    break;
                }
                buf.set_stringn(x, inner.y + dy as u16, format!("{text:^w$}", w = room), room, style);
            }
        }
    }
}
