use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use super::LineFormatter;
use crate::text::{strip_ansi, wrap};
use crate::theme::Theme;

const EXCEPTION_MARKER: &str = "{\"exception\":\"[object] ";
const FRAME_INDENT: &str = "   ";
const CONTINUATION_INDENT: &str = "       ";

pub const VENDOR_PLACEHOLDER: &str = "   [Vendor frames]";

fn frame_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| Regex::new(r"#[0-9]+ ").expect("frame regex must compile"))
}

fn app_entry_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"BoundMethod\.php\([0-9]+\): App").expect("entry regex must compile")
    })
}

/// Formats Laravel-style structured exception logs: splits the JSON
/// exception payload off the message, shortens stack frames and hides
/// vendor frames behind a single placeholder.
pub struct ExceptionFormatter {
    theme: Arc<dyn Theme>,
    root: String,
}

impl ExceptionFormatter {
    pub fn new(theme: Arc<dyn Theme>, root: &Path) -> Self {
        Self {
            theme,
            root: root.display().to_string().trim_end_matches('/').to_owned(),
        }
    }

    /// Removes the project root where the frame's path starts. A bare `/`
    /// root is left alone.
    fn strip_root(&self, line: &str) -> String {
        if self.root.is_empty() {
            return line.to_owned();
        }
        let Some(number) = frame_regex().find(line) else {
            return line.to_owned();
        };
        let (head, path) = line.split_at(number.end());
        match path.strip_prefix(self.root.as_str()) {
            Some(rest) if rest.starts_with('/') => format!("{head}{rest}"),
            _ => line.to_owned(),
        }
    }

    fn format_exception(&self, line: &str, width: usize) -> Vec<String> {
        let (message, body) = line.split_once(EXCEPTION_MARKER).unwrap_or((line, ""));
        let mut lines = wrap(message, width)
            .into_iter()
            .map(|part| self.theme.exception(&part))
            .collect::<Vec<String>>();
        lines.extend(
            wrap(body, width.saturating_sub(FRAME_INDENT.len()))
                .into_iter()
                .map(|part| format!("{FRAME_INDENT}{}", self.theme.exception(&part))),
        );
        lines
    }

    fn format_frame(&self, line: &str, width: usize) -> Vec<String> {
        let line = self.strip_root(line);

        if line.contains("/vendor/") && !app_entry_regex().is_match(&line) {
            return vec![self.theme.dim(VENDOR_PLACEHOLDER)];
        }

        wrap(&line, width.saturating_sub(CONTINUATION_INDENT.len()))
            .into_iter()
            .enumerate()
            .map(|(idx, part)| {
                let indent = if idx == 0 {
                    FRAME_INDENT
                } else {
                    CONTINUATION_INDENT
                };
                format!("{indent}{part}")
            })
            .collect()
    }
}

impl LineFormatter for ExceptionFormatter {
    fn format(&self, line: &str, width: usize) -> Vec<String> {
        if line.trim() == "\"}" {
            return vec![String::new()];
        }
        if line.contains(EXCEPTION_MARKER) {
            return self.format_exception(line, width);
        }
        if line.contains("[stacktrace]") {
            return wrap(line, width.saturating_sub(FRAME_INDENT.len()))
                .into_iter()
                .map(|part| format!("{FRAME_INDENT}{}", self.theme.dim(&part)))
                .collect();
        }
        if frame_regex().is_match(line) {
            return self.format_frame(line, width);
        }
        wrap(line, width)
    }

    /// Keeps only the first of each run of vendor placeholders.
    fn collapse(&self, lines: Vec<String>) -> Vec<String> {
        let mut seen_vendor_frame = false;
        lines
            .into_iter()
            .filter(|line| {
                let is_vendor = strip_ansi(line) == VENDOR_PLACEHOLDER;
                let keep = !(is_vendor && seen_vendor_frame);
                seen_vendor_frame = is_vendor;
                keep
            })
            .collect()
    }
}
