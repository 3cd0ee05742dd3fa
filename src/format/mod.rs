//! Turning raw log lines into display lines.
//!
//! A session owns one [`LineFormatter`]. `format` maps each raw line to the
//! wrapped lines it occupies on screen; `collapse` post-processes the full
//! wrapped sequence.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::text::wrap;
use crate::theme::Theme;

mod exception;

pub use exception::{ExceptionFormatter, VENDOR_PLACEHOLDER};

pub trait LineFormatter {
    /// Display lines for one raw `line` in a pane `width` columns wide.
    fn format(&self, line: &str, width: usize) -> Vec<String>;

    fn collapse(&self, lines: Vec<String>) -> Vec<String> {
        lines
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl LineFormatter for PlainFormatter {
    fn format(&self, line: &str, width: usize) -> Vec<String> {
        wrap(line, width)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatterKind {
    #[default]
    Plain,
    Exception,
}

impl FormatterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FormatterKind::Plain => "plain",
            FormatterKind::Exception => "exception",
        }
    }
}

pub fn build_formatter(
    kind: FormatterKind,
    theme: Arc<dyn Theme>,
    root: &Path,
) -> Box<dyn LineFormatter> {
    match kind {
        FormatterKind::Plain => Box::new(PlainFormatter),
        FormatterKind::Exception => Box::new(ExceptionFormatter::new(theme, root)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_formatter_only_wraps() {
        let lines = PlainFormatter.format("alpha beta gamma", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma"]);
        assert_eq!(PlainFormatter.collapse(lines.clone()), lines);
    }

    #[test]
    fn formatter_kind_parses_lowercase_names() {
        #[derive(Deserialize)]
        struct Holder {
            format: FormatterKind,
        }
        let parsed: Holder = toml::from_str("format = \"exception\"").expect("parse");
        assert_eq!(parsed.format, FormatterKind::Exception);
        assert!(toml::from_str::<Holder>("format = \"json\"").is_err());
    }
}
