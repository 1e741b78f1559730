//! Transcript lines and scroll position.
//!
//! The transcript is rebuilt from the chat view on every draw. Rows are
//! the scroll unit, so the view's pin/jump/load thresholds are measured in
//! terminal rows.

use lumo_core::chat::{ChatView, Viewport};
use lumo_types::{Message, Role};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::common::text::wrap;

const SPINNER: [&str; 4] = ["⠋", "⠙", "⠹", "⠸"];
const INDENT: &str = "  ";

fn role_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        Role::Assistant => Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    }
}

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Builds every transcript row for a viewport `width` columns wide.
pub fn build_lines(view: &ChatView, width: usize, spinner: usize) -> Vec<Line<'static>> {
    let body_width = width.saturating_sub(INDENT.len()).max(1);
    let mut lines = Vec::new();

    if view.is_loading_history() {
        lines.push(Line::styled("  loading older messages…", dim()));
    } else if view.has_more_history() {
        lines.push(Line::styled("  ↑ scroll up for older messages", dim()));
    }

    if view.conversation_id().is_none() {
        lines.push(Line::styled(
            "  No conversation open. Type /open <id> or /new [title].",
            dim(),
        ));
        return lines;
    }

    for message in view.messages() {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        push_message(&mut lines, view, message, body_width, spinner);
    }
    lines
}

fn push_message(
    lines: &mut Vec<Line<'static>>,
    view: &ChatView,
    message: &Message,
    width: usize,
    spinner: usize,
) {
    let mut header = vec![
        Span::styled(message.role.label().to_string(), role_style(message.role)),
        Span::styled(
            format!("  {}", message.created_at.format("%H:%M")),
            dim(),
        ),
        Span::styled(format!("  #{}", message.id), dim()),
    ];
    if message.is_streaming() {
        header.push(Span::styled(
            format!("  {}", SPINNER[spinner % SPINNER.len()]),
            Style::default().fg(Color::Yellow),
        ));
    }
    lines.push(Line::from(header));

    if message.has_reasoning() {
        if view.is_expanded(message.id) {
            let label = if message.is_streaming() && view.turn().reasoning_active {
                "  ▾ thinking…"
            } else {
                "  ▾ reasoning"
            };
            lines.push(Line::styled(label, dim()));
            let style = dim().add_modifier(Modifier::ITALIC);
            for row in wrap(&message.reasoning_content, width.saturating_sub(2).max(1)) {
                lines.push(Line::styled(format!("{INDENT}│ {row}"), style));
            }
        } else {
            let rows = message.reasoning_content.lines().count().max(1);
            lines.push(Line::styled(
                format!("  ▸ reasoning ({rows} lines, Tab or /expand {})", message.id),
                dim(),
            ));
        }
    }

    if message.content.is_empty() && message.is_streaming() {
        let waiting = if view.turn().reasoning_active {
            "thinking…"
        } else {
            "…"
        };
        lines.push(Line::styled(format!("{INDENT}{waiting}"), dim()));
        return;
    }

    for row in wrap(&message.content, width) {
        lines.push(Line::raw(format!("{INDENT}{row}")));
    }
}

/// Scroll offset of the transcript, in rows from the top.
#[derive(Debug, Clone, Copy)]
pub struct ScrollState {
    offset: usize,
    /// Keeps the last row visible as content grows.
    follow: bool,
    content_rows: usize,
    viewport_rows: usize,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            offset: 0,
            follow: true,
            content_rows: 0,
            viewport_rows: 0,
        }
    }
}

impl ScrollState {
    fn max_offset(&self) -> usize {
        self.content_rows.saturating_sub(self.viewport_rows)
    }

    /// Records the current content and viewport sizes and clamps the
    /// offset to them.
    pub fn resolve(&mut self, content_rows: usize, viewport_rows: usize) {
        self.content_rows = content_rows;
        self.viewport_rows = viewport_rows;
        if self.follow {
            self.offset = self.max_offset();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.offset = self.offset.saturating_sub(rows);
        self.follow = self.offset >= self.max_offset();
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.offset = (self.offset + rows).min(self.max_offset());
        self.follow = self.offset >= self.max_offset();
    }

    pub fn to_bottom(&mut self) {
        self.follow = true;
        self.offset = self.max_offset();
    }

    /// Moves to an absolute offset without following.
    pub fn set_offset(&mut self, offset: usize) {
        self.follow = false;
        self.offset = offset.min(self.max_offset());
        if self.max_offset() == 0 {
            self.follow = true;
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            scroll_top: self.offset,
            client_height: self.viewport_rows,
            scroll_height: self.content_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use lumo_core::api::LoadedPage;
    use lumo_core::chat::ViewConfig;
    use lumo_types::MessageKind;

    use super::*;

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines.iter().map(ToString::to_string).collect()
    }

    fn message(id: i64, role: Role, content: &str, reasoning: &str) -> Message {
        Message {
            id,
            content: content.to_string(),
            reasoning_content: reasoning.to_string(),
            role,
            kind: MessageKind::Final,
            conversation_id: 7,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap(),
        }
    }

    fn view_with(newest_first: Vec<Message>) -> ChatView {
        let mut view = ChatView::new(ViewConfig::default());
        view.open(7);
        view.on_history_loaded(
            7,
            1,
            Ok(LoadedPage {
                messages: newest_first,
                page: 1,
                page_size: 10,
                total: 2,
            }),
            Viewport::default(),
        );
        view
    }

    #[test]
    fn test_lines_show_headers_and_wrapped_content() {
        let view = view_with(vec![
            message(2, Role::Assistant, "hello there friend", ""),
            message(1, Role::User, "hi", ""),
        ]);
        let rows = text(&build_lines(&view, 12, 0));

        assert_eq!(rows[0], "you  09:30  #1");
        assert_eq!(rows[1], "  hi");
        assert_eq!(rows[2], "");
        assert_eq!(rows[3], "assistant  09:30  #2");
        assert_eq!(&rows[4..], ["  hello", "  there", "  friend"]);
    }

    #[test]
    fn test_reasoning_collapsed_until_toggled() {
        let mut view = view_with(vec![message(2, Role::Assistant, "answer", "step one")]);
        let collapsed = text(&build_lines(&view, 40, 0));
        assert!(collapsed[1].starts_with("  ▸ reasoning"));
        assert!(!collapsed.iter().any(|r| r.contains("step one")));

        assert!(view.toggle_reasoning(2));
        let expanded = text(&build_lines(&view, 40, 0));
        assert_eq!(expanded[1], "  ▾ reasoning");
        assert_eq!(expanded[2], "  │ step one");
    }

    #[test]
    fn test_no_conversation_hint() {
        let view = ChatView::new(ViewConfig::default());
        let rows = text(&build_lines(&view, 80, 0));
        assert!(rows[0].contains("No conversation open"));
    }

    #[test]
    fn test_scroll_follows_until_user_scrolls_up() {
        let mut scroll = ScrollState::default();
        scroll.resolve(100, 20);
        assert_eq!(scroll.offset(), 80);

        scroll.scroll_up(30);
        assert!(!scroll.is_following());
        scroll.resolve(120, 20);
        assert_eq!(scroll.offset(), 50);

        scroll.scroll_down(1000);
        assert!(scroll.is_following());
        scroll.resolve(130, 20);
        assert_eq!(scroll.offset(), 110);
    }

    #[test]
    fn test_viewport_reports_rows() {
        let mut scroll = ScrollState::default();
        scroll.resolve(50, 10);
        scroll.set_offset(15);
        let viewport = scroll.viewport();
        assert_eq!(viewport.scroll_top, 15);
        assert_eq!(viewport.distance_from_bottom(), 25);
    }
}
