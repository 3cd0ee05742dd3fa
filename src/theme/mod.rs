//! Dashboard colour themes.
//!
//! A [`Theme`] is a set of stateless text decorators, one per role the
//! dashboard renders. Themes are looked up by name in a [`ThemeRegistry`]
//! which ships `light` and `dark` and accepts additional named themes.

use std::sync::Arc;

use anstyle::{AnsiColor, Color, Style};
use indexmap::IndexMap;

mod dark;
mod light;

pub use dark::DarkTheme;
pub use light::LightTheme;

use crate::text::RESET;

pub const DEFAULT_THEME: &str = "dark";

/// Box-drawing glyphs used for the log pane frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxGlyphs {
    pub top_left: char,
    pub horizontal: char,
    pub top_tee: char,
    pub top_right: char,
    pub left_tee: char,
    pub cross: char,
    pub right_tee: char,
    pub vertical: char,
    pub bottom_left: char,
    pub bottom_tee: char,
    pub bottom_right: char,
}

impl BoxGlyphs {
    pub const ROUNDED: BoxGlyphs = BoxGlyphs {
        top_left: '╭',
        horizontal: '─',
        top_tee: '┬',
        top_right: '╮',
        left_tee: '├',
        cross: '┼',
        right_tee: '┤',
        vertical: '│',
        bottom_left: '╰',
        bottom_tee: '┴',
        bottom_right: '╯',
    };
}

pub trait Theme {
    fn tab_focused(&self, text: &str) -> String;
    fn tab_blurred(&self, text: &str) -> String;
    fn tab_stopped(&self, text: &str) -> String;
    fn tab_more(&self, text: &str) -> String;

    fn logs_paused(&self, text: &str) -> String;
    fn logs_live(&self, text: &str) -> String;

    fn dim(&self, text: &str) -> String;
    fn exception(&self, text: &str) -> String;

    fn process_stopped(&self, text: &str) -> String;
    fn process_running(&self, text: &str) -> String;

    fn box_glyphs(&self) -> BoxGlyphs;
    fn box_border(&self, text: &str) -> String;
    fn box_handle(&self) -> String;
}

/// Wraps `text` in `style`. Resets already inside `text` re-open the outer
/// style so nested decorations compose.
pub(crate) fn paint(style: Style, text: &str) -> String {
    let open = style.render().to_string();
    if open.is_empty() {
        return text.to_owned();
    }
    let reopened = text.replace(RESET, &format!("{RESET}{open}"));
    format!("{open}{reopened}{}", style.render_reset())
}

pub(crate) fn fg(color: AnsiColor) -> Style {
    Style::new().fg_color(Some(Color::Ansi(color)))
}

pub(crate) fn bg(color: AnsiColor) -> Style {
    Style::new().bg_color(Some(Color::Ansi(color)))
}

#[derive(Clone)]
pub struct ThemeRegistry {
    themes: IndexMap<String, Arc<dyn Theme>>,
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        let mut registry = Self {
            themes: IndexMap::new(),
        };
        registry.register("light", Arc::new(LightTheme));
        registry.register("dark", Arc::new(DarkTheme::default()));
        registry
    }
}

impl ThemeRegistry {
    /// Adds or replaces a named theme. Replacing `light` or `dark` is allowed.
    pub fn register(&mut self, name: impl Into<String>, theme: Arc<dyn Theme>) -> &mut Self {
        self.themes.insert(name.into(), theme);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Theme>> {
        self.themes.get(name).cloned()
    }

    /// Resolves `name`, falling back to the dark theme when it is unset or
    /// unknown.
    pub fn resolve(&self, name: Option<&str>) -> (String, Arc<dyn Theme>) {
        let requested = name.unwrap_or(DEFAULT_THEME);
        if let Some(theme) = self.get(requested) {
            return (requested.to_owned(), theme);
        }
        tracing::warn!(theme = requested, "unknown theme, falling back to {DEFAULT_THEME}");
        let theme = self
            .get(DEFAULT_THEME)
            .unwrap_or_else(|| Arc::new(DarkTheme::default()));
        (DEFAULT_THEME.to_owned(), theme)
    }
}
