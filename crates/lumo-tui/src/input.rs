//! Single-line input buffer and slash commands.

use lumo_types::{ConversationId, MessageId};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Text being composed. The cursor is a grapheme index.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    text: String,
    cursor: usize,
}

impl InputState {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn byte_offset(&self, grapheme: usize) -> usize {
        self.text
            .grapheme_indices(true)
            .nth(grapheme)
            .map_or(self.text.len(), |(i, _)| i)
    }

    fn grapheme_count(&self) -> usize {
        self.text.graphemes(true).count()
    }

    /// Display column of the cursor.
    pub fn cursor_column(&self) -> usize {
        self.text[..self.byte_offset(self.cursor)].width()
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
        // A combining mark merges into the previous grapheme.
        self.cursor = self.cursor.min(self.grapheme_count());
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars().filter(|c| !c.is_control()) {
            self.insert(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let start = self.byte_offset(self.cursor - 1);
        let end = self.byte_offset(self.cursor);
        self.text.replace_range(start..end, "");
        self.cursor -= 1;
    }

    pub fn delete(&mut self) {
        if self.cursor >= self.grapheme_count() {
            return;
        }
        let start = self.byte_offset(self.cursor);
        let end = self.byte_offset(self.cursor + 1);
        self.text.replace_range(start..end, "");
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.grapheme_count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.grapheme_count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

/// A slash command typed into the input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(ConversationId),
    New(Option<String>),
    Delete(MessageId),
    Expand(MessageId),
    Quit,
}

pub const COMMAND_HELP: &str = "/open <id>, /new [title], /delete <message-id>, /expand <message-id>, /quit";

/// Parses `line` as a slash command.
///
/// Returns `None` when the line is not a command, and `Some(Err(..))`
/// with a user-facing message when it is malformed.
pub fn parse_command(line: &str) -> Option<Result<Command, String>> {
    let line = line.trim();
    let rest = line.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let id = |what: &str| -> Result<i64, String> {
        arg.parse::<i64>()
            .map_err(|_| format!("/{name} needs a numeric {what}"))
    };

    Some(match name {
        "open" => id("conversation id").map(Command::Open),
        "new" => Ok(Command::New((!arg.is_empty()).then(|| arg.to_string()))),
        "delete" => id("message id").map(Command::Delete),
        "expand" => id("message id").map(Command::Expand),
        "quit" | "q" => Ok(Command::Quit),
        other => Err(format!("Unknown command /{other}. Try {COMMAND_HELP}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editing_moves_by_grapheme() {
        let mut input = InputState::default();
        input.insert_str("héllo");
        input.left();
        input.left();
        input.backspace();
        assert_eq!(input.text(), "hélo");
        input.home();
        input.delete();
        assert_eq!(input.text(), "élo");
        input.end();
        input.insert('!');
        assert_eq!(input.text(), "élo!");
    }

    #[test]
    fn test_cursor_column_counts_wide_chars() {
        let mut input = InputState::default();
        input.insert_str("你好");
        assert_eq!(input.cursor_column(), 4);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/open 42"), Some(Ok(Command::Open(42))));
        assert_eq!(
            parse_command("/new  Trip plans "),
            Some(Ok(Command::New(Some("Trip plans".to_string()))))
        );
        assert_eq!(parse_command("/new"), Some(Ok(Command::New(None))));
        assert_eq!(parse_command("/delete 7"), Some(Ok(Command::Delete(7))));
        assert_eq!(parse_command("/quit"), Some(Ok(Command::Quit)));
        assert!(matches!(parse_command("/open abc"), Some(Err(_))));
        assert!(matches!(parse_command("/nope"), Some(Err(_))));
    }
}
