//! Transcript scrollbar.
//!
//! The thumb length is computed once from the content and viewport sizes,
//! so it does not change size as the offset moves, and it touches the
//! bottom of the track exactly at the maximum offset.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

const THUMB: &str = "█";
const TRACK: &str = "│";

#[derive(Debug, Clone, Copy)]
pub struct Scrollbar {
    content_rows: usize,
    viewport_rows: usize,
    offset: usize,
}

impl Scrollbar {
    pub fn new(content_rows: usize, viewport_rows: usize, offset: usize) -> Self {
        Self {
            content_rows,
            viewport_rows,
            offset,
        }
    }

    fn is_needed(&self) -> bool {
        self.content_rows > self.viewport_rows
    }

    /// Start row and length of the thumb on a track of `track` rows.
    fn thumb_span(&self, track: usize) -> Option<(usize, usize)> {
        let max_offset = self.content_rows.saturating_sub(self.viewport_rows);
        if !self.is_needed() || track == 0 || max_offset == 0 {
            return None;
        }

        let visible = self.viewport_rows.min(track);
        let denom = (self.content_rows - 1 + visible) as u64;
        let len = ((track as u64 * visible as u64 + denom / 2) / denom) as usize;
        let len = len.clamp(1, track);

        let room = track - len;
        let start = (self.offset.min(max_offset) as u64 * room as u64 / max_offset as u64) as usize;
        Some((start, len))
    }
}

impl Widget for Scrollbar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some((start, len)) = self.thumb_span(area.height as usize) else {
            return;
        };

        let x = area.x + area.width.saturating_sub(1);
        let style = Style::default().fg(Color::DarkGray);
        for (row, y) in (area.y..area.y + area.height).enumerate() {
            let symbol = if (start..start + len).contains(&row) {
                THUMB
            } else {
                TRACK
            };
            buf.set_string(x, y, symbol, style);
        }
    }
}
