//! Drawing. Reads `AppState`, never mutates it.

use lumo_core::chat::NoticeLevel;
use lumo_core::stream::SessionStatus;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::common::Scrollbar;
use crate::common::text::truncate_with_ellipsis;
use crate::state::AppState;
use crate::transcript::build_lines;

const HEADER_HEIGHT: u16 = 1;
const INPUT_HEIGHT: u16 = 3;
const STATUS_HEIGHT: u16 = 1;
/// Padding on each side of the transcript.
const TRANSCRIPT_MARGIN: u16 = 1;
const SCROLLBAR_WIDTH: u16 = 1;

const HINTS: &str = "Enter send · Esc cancel · Tab reasoning · Ctrl+R reasoning mode · PgUp/PgDn scroll · /quit";

/// Columns and rows available to transcript text in a `width` x `height`
/// terminal.
pub fn transcript_size(width: u16, height: u16) -> (usize, usize) {
    let columns = width.saturating_sub(TRANSCRIPT_MARGIN * 2 + SCROLLBAR_WIDTH);
    let rows = height.saturating_sub(HEADER_HEIGHT + INPUT_HEIGHT + STATUS_HEIGHT);
    (columns as usize, rows as usize)
}

pub fn render(app: &AppState, frame: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(1),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    render_header(app, frame, chunks[0]);
    render_transcript(app, frame, chunks[1]);
    render_input(app, frame, chunks[2]);
    render_status(app, frame, chunks[3]);
}

fn render_header(app: &AppState, frame: &mut Frame, area: Rect) {
    let conversation = app
        .view
        .conversation_id()
        .map_or_else(|| "no conversation".to_string(), |id| format!("conversation #{id}"));
    let reasoning = if app.view.reasoning_mode() {
        "reasoning on"
    } else {
        "reasoning off"
    };
    let status = app.view.session_status();
    let status_color = match status {
        SessionStatus::Errored => Color::Red,
        SessionStatus::Connecting | SessionStatus::Open => Color::Yellow,
        SessionStatus::Idle | SessionStatus::Closed => Color::DarkGray,
    };
    let line = Line::from(vec![
        Span::styled(
            " lumo ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" {conversation} · {reasoning} · ")),
        Span::styled(status.label(), Style::default().fg(status_color)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_transcript(app: &AppState, frame: &mut Frame, area: Rect) {
    let height = area.height as usize;
    let lines = build_lines(&app.view, app.layout.transcript_width, app.spinner_frame);
    let total = lines.len();
    let offset = if app.scroll.is_following() {
        total.saturating_sub(height)
    } else {
        app.scroll.offset().min(total.saturating_sub(height))
    };

    let mut visible: Vec<Line<'static>> = lines.into_iter().skip(offset).take(height).collect();
    // Short transcripts sit at the bottom, next to the input.
    if visible.len() < height {
        let mut padded = vec![Line::default(); height - visible.len()];
        padded.append(&mut visible);
        visible = padded;
    }

    let text_area = Rect {
        x: area.x + TRANSCRIPT_MARGIN,
        width: area.width.saturating_sub(TRANSCRIPT_MARGIN * 2 + SCROLLBAR_WIDTH),
        ..area
    };
    frame.render_widget(Paragraph::new(visible), text_area);
    frame.render_widget(Scrollbar::new(total, height, offset), area);

    if app.view.show_jump() && area.height > 0 {
        let label = " ↓ jump to bottom (End) ";
        let width = (label.chars().count() as u16).min(area.width);
        let jump = Rect {
            x: area.x + area.width.saturating_sub(width + SCROLLBAR_WIDTH + 1),
            y: area.y + area.height - 1,
            width,
            height: 1,
        };
        frame.render_widget(
            Paragraph::new(label).style(Style::default().fg(Color::Black).bg(Color::Yellow)),
            jump,
        );
    }
}

fn render_input(app: &AppState, frame: &mut Frame, area: Rect) {
    let busy = app.view.is_busy();
    let title = if busy { " waiting for reply " } else { " message " };
    let border = if busy { Color::DarkGray } else { Color::Cyan };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(border));
    let inner = block.inner(area);

    // Keep the cursor in view on long input.
    let cursor = app.input.cursor_column();
    let columns = inner.width as usize;
    let skip = cursor.saturating_sub(columns.saturating_sub(1));
    frame.render_widget(
        Paragraph::new(app.input.text()).scroll((0, skip as u16)).block(block),
        area,
    );

    if inner.width > 0 && inner.height > 0 {
        frame.set_cursor_position(Position::new(
            inner.x + (cursor - skip) as u16,
            inner.y,
        ));
    }
}

fn render_status(app: &AppState, frame: &mut Frame, area: Rect) {
    let width = area.width as usize;
    let line = if let Some(notice) = app.notices.current() {
        let color = match notice.level {
            NoticeLevel::Info => Color::Blue,
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Warning => Color::Yellow,
            NoticeLevel::Error => Color::Red,
        };
        Line::from(vec![
            Span::styled(
                format!(" {} ", notice.level.label()),
                Style::default().fg(Color::Black).bg(color),
            ),
            Span::raw(" "),
            Span::raw(truncate_with_ellipsis(
                &notice.text,
                width.saturating_sub(notice.level.label().len() + 3),
            )),
        ])
    } else {
        Line::styled(
            truncate_with_ellipsis(HINTS, width),
            Style::default().fg(Color::DarkGray),
        )
    };
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_size_reserves_chrome() {
        assert_eq!(transcript_size(80, 24), (77, 19));
        assert_eq!(transcript_size(2, 3), (0, 0));
    }
}
