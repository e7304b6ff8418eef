//! Braille waveform view: beat grid, baseline, amplitude bars and playhead.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Widget},
};

use crate::engine::{BeatGrid, LoopRegion, Viewport, WaveformPoint};

// Braille dot positions per character cell (2 wide x 4 tall):
//   col0: bits 0,1,2,6  (top to bottom)
//   col1: bits 3,4,5,7  (top to bottom)
const BRAILLE_BASE: u32 = 0x2800;
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // left column
    [0x08, 0x10, 0x20, 0x80], // right column
];

const BEAT_COLOR: Color = Color::Indexed(238);
const MEASURE_COLOR: Color = Color::Gray;
const BASELINE_COLOR: Color = Color::DarkGray;
const PLAYED_COLOR: Color = Color::Cyan;
const UNPLAYED_COLOR: Color = Color::Indexed(245);
const PLAYHEAD_COLOR: Color = Color::Yellow;
const LOOP_TINT: Color = Color::Indexed(17);

/// Dot grid with one foreground colour per cell. Later strokes win the
/// colour of any cell they touch, which gives the paint order.
struct DotCanvas {
    cols: usize,
    rows: usize,
    dots: Vec<u8>,
    fg: Vec<Color>,
}

impl DotCanvas {
    fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            dots: vec![0; cols * rows],
            fg: vec![Color::Reset; cols * rows],
        }
    }

    fn px_w(&self) -> usize {
        self.cols * 2
    }

    fn px_h(&self) -> usize {
        self.rows * 4
    }

    fn set(&mut self, px_x: usize, px_y: usize, color: Color) {
        let (cx, cy) = (px_x / 2, px_y / 4);
        if cx < self.cols && cy < self.rows {
            let i = cy * self.cols + cx;
            self.dots[i] |= BRAILLE_DOTS[px_x % 2][px_y % 4];
            self.fg[i] = color;
        }
    }

    fn vline(&mut self, px_x: usize, from: usize, to: usize, step: usize, color: Color) {
        for py in (from..=to.min(self.px_h().saturating_sub(1))).step_by(step.max(1)) {
            self.set(px_x, py, color);
        }
    }

    fn hline(&mut self, px_y: usize, color: Color) {
        for px_x in 0..self.px_w() {
            self.set(px_x, px_y, color);
        }
    }

    fn flush(&self, area: Rect, buf: &mut Buffer) {
        for cy in 0..self.rows {
            for cx in 0..self.cols {
                let i = cy * self.cols + cx;
                let dots = self.dots[i];
                if dots == 0 {
                    continue;
                }
                let ch = char::from_u32(BRAILLE_BASE + u32::from(dots)).unwrap_or(' ');
                let (x, y) = (area.x + cx as u16, area.y + cy as u16);
                buf[(x, y)].set_char(ch).set_fg(self.fg[i]);
            }
        }
    }
}

/// Horizontal offset of the centre of `column` inside `inner`, clamped so a
/// drag that leaves the area keeps tracking its nearest edge.
pub fn column_to_x(inner: Rect, column: u16) -> f64 {
    if inner.width == 0 {
        return 0.0;
    }
    let column = column.clamp(inner.x, inner.right() - 1);
    f64::from(column - inner.x) + 0.5
}

pub struct WaveformView<'a> {
    points: Option<&'a [WaveformPoint]>,
    viewport: Viewport,
    duration: f64,
    position: f64,
    grid: Option<BeatGrid>,
    loop_region: Option<LoopRegion>,
    frame: u64,
    placeholder: &'a str,
    block: Option<Block<'a>>,
}

impl<'a> WaveformView<'a> {
    pub fn new(viewport: Viewport, duration: f64, position: f64) -> Self {
        Self {
            points: None,
            viewport,
            duration,
            position,
            grid: None,
            loop_region: None,
            frame: 0,
            placeholder: "",
            block: None,
        }
    }

    pub fn points(mut self, points: Option<&'a [WaveformPoint]>) -> Self {
        self.points = points;
        self
    }

    pub fn grid(mut self, grid: BeatGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn loop_region(mut self, region: LoopRegion) -> Self {
        self.loop_region = Some(region);
        self
    }

    /// Label and animation phase shown while there is no summary.
    pub fn placeholder(mut self, label: &'a str, frame: u64) -> Self {
        self.placeholder = label;
        self.frame = frame;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    fn px_of(&self, time: f64, px_w: usize) -> Option<usize> {
        let x = self.viewport.x_of(time, px_w as f64);
        (x.is_finite() && x >= 0.0).then(|| (x.floor() as usize).min(px_w.saturating_sub(1)))
    }

    fn tint_loop(&self, inner: Rect, buf: &mut Buffer) {
        let Some(region) = self.loop_region.filter(LoopRegion::is_active) else {
            return;
        };
        let width = f64::from(inner.width);
        let from = self.viewport.x_of(region.start(), width).max(0.0);
        let to = self.viewport.x_of(region.end(), width).min(width);
        if to <= from {
            return;
        }
        for cx in (from.floor() as u16)..(to.ceil() as u16).min(inner.width) {
            for cy in 0..inner.height {
                buf[(inner.x + cx, inner.y + cy)].set_bg(LOOP_TINT);
            }
        }
    }

    fn draw_grid(&self, canvas: &mut DotCanvas) {
        let Some(grid) = self.grid else {
            return;
        };
        let (px_w, px_h) = (canvas.px_w(), canvas.px_h());
        for line in grid.lines(self.viewport) {
            if let Some(px) = self.px_of(line.time, px_w) {
                if line.measure {
                    canvas.vline(px, 0, px_h, 1, MEASURE_COLOR);
                } else {
                    canvas.vline(px, 0, px_h, 3, BEAT_COLOR);
                }
            }
        }
    }

    fn draw_bars(&self, canvas: &mut DotCanvas, points: &[WaveformPoint]) {
        let (px_w, px_h) = (canvas.px_w(), canvas.px_h());
        let mid = px_h / 2;
        let half = (px_h / 2) as f64;

        for (i, p) in points.iter().enumerate() {
            let next = points.get(i + 1).map_or(self.duration, |n| n.time);
            if next < self.viewport.start || p.time > self.viewport.end {
                continue;
            }
            let from = self.px_of(p.time.max(self.viewport.start), px_w).unwrap_or(0);
            let to = self
                .px_of(next.min(self.viewport.end), px_w)
                .unwrap_or(from)
                .max(from + 1);

            let reach = ((p.amplitude / 100.0) * half).round() as usize;
            let color = if p.time < self.position {
                PLAYED_COLOR
            } else {
                UNPLAYED_COLOR
            };
            for px in from..to.min(px_w) {
                canvas.vline(px, mid.saturating_sub(reach), mid + reach, 1, color);
            }
        }
    }

    fn draw_placeholder(&self, canvas: &mut DotCanvas) {
        let (px_w, px_h) = (canvas.px_w(), canvas.px_h());
        let mid = px_h as f64 / 2.0;
        let phase = self.frame as f64 * 0.15;
        for px in 0..px_w {
            let y = mid + (px as f64 * 0.18 + phase).sin() * (px_h as f64 / 6.0);
            canvas.set(px, y.max(0.0) as usize, BASELINE_COLOR);
        }
    }
}

impl Widget for WaveformView<'_> {
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

        self.tint_loop(inner, buf);

        let mut canvas = DotCanvas::new(inner.width as usize, inner.height as usize);
        self.draw_grid(&mut canvas);
        canvas.hline(canvas.px_h() / 2, BASELINE_COLOR);

        let points = self.points.filter(|p| !p.is_empty());
        match points {
            Some(points) => self.draw_bars(&mut canvas, points),
            None => self.draw_placeholder(&mut canvas),
        }

        if self.viewport.contains(self.position) && self.viewport.span() > 0.0 {
            if let Some(px) = self.px_of(self.position, canvas.px_w()) {
                canvas.vline(px, 0, canvas.px_h(), 1, PLAYHEAD_COLOR);
            }
        }

        canvas.flush(inner, buf);

        if points.is_none() && !self.placeholder.is_empty() {
            let label = Line::from(self.placeholder)
                .style(Style::default().fg(Color::Gray))
                .alignment(Alignment::Center);
            let row = Rect {
                y: inner.y + inner.height / 2,
                height: 1,
                ..inner
            };
            label.render(row, buf);
        }
    }
}
