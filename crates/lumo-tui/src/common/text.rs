//! Width-aware text helpers.
//!
//! Widths are terminal columns as reported by `unicode-width`; splitting
//! happens on grapheme boundaries so combined characters stay together.

use std::borrow::Cow;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Cuts `text` to `max_width` columns, ending with `…` when shortened.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width <= 1 {
        return "…".to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for g in text.graphemes(true) {
        let w = g.width();
        if used + w + 1 > max_width {
            break;
        }
        out.push_str(g);
        used += w;
    }
    out.push('…');
    out
}

/// Strips escape bytes and expands tabs so server text cannot move the
/// cursor or break column math.
pub fn sanitize_for_display(s: &str) -> Cow<'_, str> {
    if s.contains('\x1b') || s.contains('\t') || s.contains('\r') {
        Cow::Owned(s.replace('\x1b', "").replace('\t', "    ").replace('\r', ""))
    } else {
        Cow::Borrowed(s)
    }
}

/// Wraps `text` to `width` columns.
///
/// Explicit newlines always break. Lines break at the last space that fits;
/// a word wider than the line is split mid-word.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for line in sanitize_for_display(text).split('\n') {
        wrap_line(line, width, &mut rows);
    }
    rows
}

fn wrap_line(line: &str, width: usize, rows: &mut Vec<String>) {
    if line.is_empty() {
        rows.push(String::new());
        return;
    }

    let mut current = String::new();
    let mut current_width = 0;
    // Byte index just after the last space in `current`, and the width up to it.
    let mut last_space: Option<(usize, usize)> = None;

    for g in line.graphemes(true) {
        let w = g.width();
        if current_width + w > width && !current.is_empty() {
            match last_space {
                Some((idx, space_width)) if idx < current.len() => {
                    let rest = current.split_off(idx);
                    rows.push(current.trim_end().to_string());
                    current = rest;
                    current_width -= space_width;
                }
                _ => {
                    rows.push(std::mem::take(&mut current).trim_end().to_string());
                    current_width = 0;
                }
            }
            last_space = None;
            if g == " " && current.is_empty() {
                continue;
            }
        }
        current.push_str(g);
        current_width += w;
        if g == " " {
            last_space = Some((current.len(), current_width));
        }
    }
    rows.push(current.trim_end().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello world", 8), "hello w…");
        assert_eq!(truncate_with_ellipsis("hello", 1), "…");
        assert_eq!(truncate_with_ellipsis("中文test", 6), "中文t…");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_for_display("a\tb\x1b[0m\r"), "a    b[0m");
        assert!(matches!(sanitize_for_display("clean"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_wrap_breaks_on_spaces() {
        assert_eq!(
            wrap("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
    }

    #[test]
    fn test_wrap_splits_long_words() {
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_keeps_blank_lines() {
        assert_eq!(wrap("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[test]
    fn test_wrap_counts_wide_chars() {
        assert_eq!(wrap("你好世界", 4), vec!["你好", "世界"]);
    }
}
