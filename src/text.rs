//! ANSI-aware measuring, truncating and wrapping of terminal text.
//!
//! Escape sequences are carried through untouched and never counted toward a
//! line's width. Wrapping re-opens any SGR styling that was active when a line
//! was broken, so every output line can be styled independently.

use unicode_width::UnicodeWidthChar;

pub(crate) const RESET: &str = "\u{1b}[0m";

/// A piece of a string: either one escape sequence or one visible character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece<'a> {
    Escape(&'a str),
    Char(char),
}

fn pieces(input: &str) -> impl Iterator<Item = Piece<'_>> {
    let mut idx = 0usize;
    std::iter::from_fn(move || {
        if idx >= input.len() {
            return None;
        }
        if let Some(len) = escape_len(input, idx) {
            let piece = Piece::Escape(&input[idx..idx + len]);
            idx += len;
            return Some(piece);
        }
        let ch = input[idx..].chars().next()?;
        idx += ch.len_utf8();
        Some(Piece::Char(ch))
    })
}

/// Length in bytes of the CSI or OSC sequence starting at `pos`, if any.
pub(crate) fn escape_len(input: &str, pos: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    if pos + 1 >= bytes.len() || bytes[pos] != 0x1b {
        return None;
    }
    match bytes[pos + 1] {
        b'[' => {
            let mut idx = pos + 2;
            while idx < bytes.len() {
                if (0x40..=0x7e).contains(&bytes[idx]) {
                    return Some(idx + 1 - pos);
                }
                idx += 1;
            }
            None
        }
        b']' => {
            let mut idx = pos + 2;
            while idx < bytes.len() {
                if bytes[idx] == 0x07 {
                    return Some(idx + 1 - pos);
                }
                if bytes[idx] == 0x1b && idx + 1 < bytes.len() && bytes[idx + 1] == b'\\' {
                    return Some(idx + 2 - pos);
                }
                idx += 1;
            }
            None
        }
        _ => None,
    }
}

fn is_sgr(code: &str) -> bool {
    code.starts_with("\u{1b}[") && code.ends_with('m')
}

fn is_sgr_reset(code: &str) -> bool {
    code == "\u{1b}[0m" || code == "\u{1b}[m"
}

fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn strip_ansi(input: &str) -> String {
    pieces(input)
        .filter_map(|piece| match piece {
            Piece::Char(ch) => Some(ch),
            Piece::Escape(_) => None,
        })
        .collect()
}

pub fn visible_width(input: &str) -> usize {
    pieces(input)
        .map(|piece| match piece {
            Piece::Char(ch) => char_width(ch),
            Piece::Escape(_) => 0,
        })
        .sum()
}

/// Cuts `input` down to at most `width` visible columns, keeping escapes.
pub fn truncate(input: &str, width: usize) -> String {
    let mut out = String::with_capacity(input.len());
    let mut used = 0usize;
    let mut styled = false;
    for piece in pieces(input) {
        match piece {
            Piece::Escape(code) => {
                if is_sgr(code) {
                    styled = !is_sgr_reset(code);
                }
                out.push_str(code);
            }
            Piece::Char(ch) => {
                let w = char_width(ch);
                if used + w > width {
                    if styled {
                        out.push_str(RESET);
                    }
                    return out;
                }
                used += w;
                out.push(ch);
            }
        }
    }
    out
}

/// Right-pads `input` with spaces to exactly `width` visible columns,
/// truncating first when it is wider.
pub fn pad(input: &str, width: usize) -> String {
    let current = visible_width(input);
    if current > width {
        let mut truncated = truncate(input, width);
        let missing = width.saturating_sub(visible_width(&truncated));
        truncated.push_str(&" ".repeat(missing));
        return truncated;
    }
    format!("{input}{}", " ".repeat(width - current))
}

/// Pads `input` on the left to `width` visible columns.
pub fn pad_left(input: &str, width: usize) -> String {
    let current = visible_width(input);
    format!("{}{input}", " ".repeat(width.saturating_sub(current)))
}

pub fn center(input: &str, width: usize) -> String {
    let current = visible_width(input);
    if current >= width {
        return truncate(input, width);
    }
    let left = (width - current) / 2;
    format!("{}{input}", " ".repeat(left))
}

/// Word-wraps `input` to `width` columns, cutting words that are wider than a
/// whole line. Always yields at least one (possibly empty) line.
pub fn wrap(input: &str, width: usize) -> Vec<String> {
    let mut wrapper = Wrapper::new(width.max(1));
    for word in input.split(' ') {
        wrapper.push_word(word);
    }
    wrapper.finish()
}

struct Wrapper {
    width: usize,
    lines: Vec<String>,
    line: String,
    line_width: usize,
    fresh: bool,
    active: Vec<String>,
}

impl Wrapper {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            line: String::new(),
            line_width: 0,
            fresh: true,
            active: Vec::new(),
        }
    }

    fn push_word(&mut self, word: &str) {
        let word_width = visible_width(word);
        if !self.fresh {
            if self.line_width + 1 + word_width <= self.width {
                self.line.push(' ');
                self.line_width += 1;
                self.append(word);
                return;
            }
            self.break_line();
        }

        if word_width <= self.width {
            self.append(word);
        } else {
            self.cut(word);
        }
        self.fresh = false;
    }

    fn append(&mut self, word: &str) {
        for piece in pieces(word) {
            self.push_piece(piece);
        }
    }

    fn cut(&mut self, word: &str) {
        for piece in pieces(word) {
            if let Piece::Char(ch) = piece {
                if self.line_width > 0 && self.line_width + char_width(ch) > self.width {
                    self.break_line();
                }
            }
            self.push_piece(piece);
        }
    }

    fn push_piece(&mut self, piece: Piece<'_>) {
        match piece {
            Piece::Escape(code) => {
                if is_sgr(code) {
                    if is_sgr_reset(code) {
                        self.active.clear();
                    } else {
                        self.active.push(code.to_owned());
                    }
                }
                self.line.push_str(code);
            }
            Piece::Char(ch) => {
                self.line_width += char_width(ch);
                self.line.push(ch);
            }
        }
    }

    fn break_line(&mut self) {
        if !self.active.is_empty() {
            self.line.push_str(RESET);
        }
        self.lines.push(std::mem::take(&mut self.line));
        self.line = self.active.concat();
        self.line_width = 0;
        self.fresh = true;
    }

    fn finish(mut self) -> Vec<String> {
        self.lines.push(self.line);
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_ignores_escape_sequences() {
        assert_eq!(visible_width("hi\u{1b}[31m!!\u{1b}[0m"), 4);
        assert_eq!(
            visible_width("\u{1b}]8;;https://example.com\u{7}link\u{1b}]8;;\u{7}"),
            4
        );
        assert_eq!(strip_ansi("\u{1b}[2mdim\u{1b}[0m text"), "dim text");
    }

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        assert_eq!(
            wrap("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
        assert_eq!(wrap("", 10), vec![""]);
        assert_eq!(wrap("short", 10), vec!["short"]);
    }

    #[test]
    fn wrap_cuts_words_longer_than_the_line() {
        assert_eq!(wrap("abcdefghijkl", 5), vec!["abcde", "fghij", "kl"]);
        assert_eq!(wrap("ab abcdefgh", 5), vec!["ab", "abcde", "fgh"]);
    }

    #[test]
    fn wrap_reopens_styles_on_continuation_lines() {
        let lines = wrap("\u{1b}[31mred words here\u{1b}[0m", 9);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "\u{1b}[31mred words\u{1b}[0m");
        assert_eq!(lines[1], "\u{1b}[31mhere\u{1b}[0m");
        assert!(lines.iter().all(|line| visible_width(line) <= 9));
    }

    #[test]
    fn wrap_never_exceeds_width_for_wide_characters() {
        let lines = wrap("日本語のテキスト", 5);
        assert!(lines.iter().all(|line| visible_width(line) <= 5));
        assert_eq!(lines.concat(), "日本語のテキスト");
    }

    #[test]
    fn truncate_and_pad_respect_visible_columns() {
        assert_eq!(truncate("\u{1b}[1mhello\u{1b}[0m", 3), "\u{1b}[1mhel\u{1b}[0m");
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(visible_width(&pad("abcdef", 4)), 4);
        assert_eq!(pad_left("ab", 4), "  ab");
        assert_eq!(center("ab", 6), "  ab");
    }
}
