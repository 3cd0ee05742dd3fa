use anstyle::{AnsiColor, Style};

use super::{bg, fg, paint, BoxGlyphs, LightTheme, Theme};

/// Dark terminals: inverted focus, dimmed background tabs. Everything not
/// overridden here is shared with [`LightTheme`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DarkTheme {
    base: LightTheme,
}

impl Theme for DarkTheme {
    fn tab_focused(&self, text: &str) -> String {
        paint(bg(AnsiColor::White).fg_color(fg(AnsiColor::Black).get_fg_color()), text)
    }

    fn tab_blurred(&self, text: &str) -> String {
        self.dim(text)
    }

    fn tab_stopped(&self, text: &str) -> String {
        let struck = paint(Style::new().strikethrough(), text.trim());
        format!(" {struck} ")
    }

    fn tab_more(&self, text: &str) -> String {
        self.base.tab_more(text)
    }

    fn logs_paused(&self, text: &str) -> String {
        paint(fg(AnsiColor::Yellow), text)
    }

    fn logs_live(&self, text: &str) -> String {
        self.base.logs_live(text)
    }

    fn dim(&self, text: &str) -> String {
        self.base.dim(text)
    }

    fn exception(&self, text: &str) -> String {
        self.base.exception(text)
    }

    fn process_stopped(&self, text: &str) -> String {
        paint(fg(AnsiColor::Red), text)
    }

    fn process_running(&self, text: &str) -> String {
        self.base.process_running(text)
    }

    fn box_glyphs(&self) -> BoxGlyphs {
        self.base.box_glyphs()
    }

    fn box_border(&self, text: &str) -> String {
        self.base.box_border(text)
    }

    fn box_handle(&self) -> String {
        self.base.box_handle()
    }
}
