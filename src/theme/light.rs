use anstyle::{AnsiColor, Style};

use super::{bg, fg, paint, BoxGlyphs, Theme};

#[derive(Debug, Clone, Copy, Default)]
pub struct LightTheme;

impl Theme for LightTheme {
    fn tab_focused(&self, text: &str) -> String {
        paint(bg(AnsiColor::Black).fg_color(fg(AnsiColor::White).get_fg_color()), text)
    }

    fn tab_blurred(&self, text: &str) -> String {
        text.to_owned()
    }

    fn tab_stopped(&self, text: &str) -> String {
        let struck = paint(Style::new().strikethrough(), text.trim());
        self.dim(&format!(" {struck} "))
    }

    fn tab_more(&self, text: &str) -> String {
        self.dim(text)
    }

    fn logs_paused(&self, text: &str) -> String {
        paint(bg(AnsiColor::Yellow), text)
    }

    fn logs_live(&self, text: &str) -> String {
        self.dim(text)
    }

    fn dim(&self, text: &str) -> String {
        paint(Style::new().dimmed(), text)
    }

    fn exception(&self, text: &str) -> String {
        paint(fg(AnsiColor::Red), text)
    }

    fn process_stopped(&self, text: &str) -> String {
        paint(bg(AnsiColor::Red).fg_color(fg(AnsiColor::White).get_fg_color()), text)
    }

    fn process_running(&self, text: &str) -> String {
        self.dim(text)
    }

    fn box_glyphs(&self) -> BoxGlyphs {
        BoxGlyphs::ROUNDED
    }

    fn box_border(&self, text: &str) -> String {
        paint(fg(AnsiColor::BrightBlack), text)
    }

    fn box_handle(&self) -> String {
        paint(fg(AnsiColor::BrightBlack), "▒")
    }
}
