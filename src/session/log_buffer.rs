use std::collections::VecDeque;

use crate::text::escape_len;

pub const MAX_LOG_LINES: usize = 2000;

const TAB_WIDTH: usize = 4;

/// Bounded FIFO of raw output lines. Pushing past the cap evicts the oldest.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(MAX_LOG_LINES)
    }
}

impl LogBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: impl AsRef<str>) {
        self.lines.push_back(sanitize_line(line.as_ref()));
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    /// Appends every line of an output chunk. One trailing newline is treated
    /// as the terminator of the last line, not as an extra empty line.
    pub fn push_chunk(&mut self, chunk: &str) {
        let chunk = chunk.strip_suffix('\n').unwrap_or(chunk);
        for line in chunk.split('\n') {
            self.push(line);
        }
    }

    pub fn clear(&mut self) {
        self.lines = VecDeque::new();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}

/// Makes one raw output line safe to lay out: keeps only what follows the
/// last carriage return, drops control bytes and cursor-moving escapes,
/// keeps SGR styling, and expands tabs.
pub(crate) fn sanitize_line(raw: &str) -> String {
    let raw = raw.strip_suffix('\r').unwrap_or(raw);
    let raw = raw.rsplit('\r').next().unwrap_or(raw);

    let mut out = String::with_capacity(raw.len());
    let mut idx = 0usize;
    while idx < raw.len() {
        if let Some(len) = escape_len(raw, idx) {
            let code = &raw[idx..idx + len];
            if code.starts_with("\u{1b}[") && code.ends_with('m') {
                out.push_str(code);
            }
            idx += len;
            continue;
        }
        let Some(ch) = raw[idx..].chars().next() else {
            break;
        };
        idx += ch.len_utf8();
        match ch {
            '\t' => out.push_str(&" ".repeat(TAB_WIDTH)),
            ch if ch.is_control() => {}
            ch => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_exactly_the_last_lines_in_order() {
        let mut buffer = LogBuffer::default();
        for idx in 0..2500 {
            buffer.push(format!("line {idx}"));
        }
        assert_eq!(buffer.len(), MAX_LOG_LINES);
        let lines = buffer.iter().collect::<Vec<&str>>();
        assert_eq!(lines[0], "line 500");
        assert_eq!(lines[MAX_LOG_LINES - 1], "line 2499");
        for (offset, line) in lines.iter().enumerate() {
            assert_eq!(*line, format!("line {}", offset + 500));
        }
    }

    #[test]
    fn chunk_splits_lines_and_drops_one_trailing_newline() {
        let mut buffer = LogBuffer::default();
        buffer.push_chunk("one\ntwo\n\n");
        assert_eq!(buffer.iter().collect::<Vec<&str>>(), vec!["one", "two", ""]);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut buffer = LogBuffer::default();
        buffer.push("hello");
        buffer.clear();
        assert!(buffer.is_empty());
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn sanitize_keeps_colour_but_drops_cursor_control() {
        assert_eq!(
            sanitize_line("\u{1b}[2K\u{1b}[1A\u{1b}[32mok\u{1b}[0m\u{7}"),
            "\u{1b}[32mok\u{1b}[0m"
        );
        assert_eq!(sanitize_line("building 10%\rbuilding 90%\r"), "building 90%");
        assert_eq!(sanitize_line("a\tb"), "a    b");
    }
}
