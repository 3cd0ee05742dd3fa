//! Assembling one dashboard frame for the focused session.
//!
//! Rows, top to bottom: tab bar, process state, pane top border, the log
//! pane with its scrollbar, bottom border and the hotkey legend on the last
//! row.

use crate::session::CommandSession;
use crate::text::{center, pad, truncate, visible_width};
use crate::theme::Theme;

use super::tabs::{render_tab_bar, TabDescriptor};

const TRACK: char = '│';
const THUMB: char = '┃';

/// Scrollbar column for a pane `height` rows tall showing `total` lines from
/// `offset`. Uses the generic track and thumb glyphs.
pub fn scrollbar(offset: usize, height: usize, total: usize) -> Vec<char> {
    if height == 0 {
        return Vec::new();
    }
    if total <= height {
        return vec![TRACK; height];
    }

    let thumb = ((height * height) as f64 / total as f64).round() as usize;
    let thumb = thumb.clamp(1, height);
    let max_offset = total - height;
    let travel = height - thumb;
    let position = ((offset.min(max_offset) * travel) as f64 / max_offset as f64).round() as usize;

    (0..height)
        .map(|row| {
            if (position..position + thumb).contains(&row) {
                THUMB
            } else {
                TRACK
            }
        })
        .collect()
}

pub struct ContentRenderer<'a> {
    theme: &'a dyn Theme,
}

impl<'a> ContentRenderer<'a> {
    pub fn new(theme: &'a dyn Theme) -> Self {
        Self { theme }
    }

    /// Renders the whole screen for `sessions[current]`, exactly as many rows
    /// as the session's viewport is tall.
    pub fn render(&self, sessions: &[CommandSession], current: usize) -> Vec<String> {
        let Some(session) = sessions.get(current) else {
            return Vec::new();
        };
        let (width, height) = session.viewport();

        let tabs = sessions
            .iter()
            .map(|session| {
                TabDescriptor::new(session.name(), session.is_focused(), !session.is_running())
            })
            .collect::<Vec<TabDescriptor>>();

        let mut rows = Vec::with_capacity(height);
        rows.push(render_tab_bar(self.theme, &tabs, width));
        rows.push(self.process_state(session, width));

        let wrapped = session.wrapped_lines();
        let pane_height = session.pane_height();
        let offset = session
            .scroll_offset()
            .min(wrapped.len().saturating_sub(pane_height));
        let visible = wrapped
            .iter()
            .skip(offset)
            .take(pane_height)
            .map(String::as_str)
            .collect::<Vec<&str>>();

        rows.push(self.top_border(
            width,
            offset,
            visible.len(),
            wrapped.len(),
            session.is_paused(),
        ));
        rows.extend(self.pane(&visible, offset, pane_height, wrapped.len(), width));
        rows.push(self.bottom_border(width));

        // Too short for the chrome: drop rows above the legend, never the legend.
        if height == 0 {
            return Vec::new();
        }
        rows.truncate(height - 1);
        rows.push(self.hotkeys(session, width));
        rows
    }

    fn process_state(&self, session: &CommandSession, width: usize) -> String {
        let state = if session.is_running() {
            self.theme.process_running(" Running: ")
        } else {
            self.theme.process_stopped(" Stopped: ")
        };
        let line = format!("{state}{}", self.theme.dim(session.command_line()));
        truncate(&line, width)
    }

    /// `╭── Viewing [a-b] of n (Live) ─╮`, exactly `width` columns.
    pub fn top_border(
        &self,
        width: usize,
        offset: usize,
        shown: usize,
        total: usize,
        paused: bool,
    ) -> String {
        let glyphs = self.theme.box_glyphs();
        let first = if total == 0 { 0 } else { offset + 1 };
        let count = format!("Viewing [{first}-{}] of {total}", offset + shown);
        let state = if paused { "(Paused)" } else { "(Live)" };

        // Three spaces and three border glyphs.
        let chrome = count.chars().count() + state.chars().count() + 6;
        let Some(filler) = width.checked_sub(chrome) else {
            return self.plain_border(width, glyphs.top_left, glyphs.top_right);
        };

        let state = if paused {
            self.theme.logs_paused(state)
        } else {
            self.theme.logs_live(state)
        };
        format!(
            "{}{} {} {} {}",
            self.theme.box_border(&glyphs.top_left.to_string()),
            self.theme
                .box_border(&glyphs.horizontal.to_string().repeat(filler)),
            self.theme.dim(&count),
            state,
            self.theme
                .box_border(&format!("{}{}", glyphs.horizontal, glyphs.top_right)),
        )
    }

    fn plain_border(&self, width: usize, left: char, right: char) -> String {
        if width < 2 {
            return String::new();
        }
        let glyphs = self.theme.box_glyphs();
        self.theme.box_border(&format!(
            "{left}{}{right}",
            glyphs.horizontal.to_string().repeat(width - 2)
        ))
    }

    pub fn bottom_border(&self, width: usize) -> String {
        let glyphs = self.theme.box_glyphs();
        self.plain_border(width, glyphs.bottom_left, glyphs.bottom_right)
    }

    /// Pane rows: left border, one space, content padded to fill, then the
    /// scrollbar re-skinned with the theme's border and handle.
    fn pane(
        &self,
        visible: &[&str],
        offset: usize,
        height: usize,
        total: usize,
        width: usize,
    ) -> Vec<String> {
        let glyphs = self.theme.box_glyphs();
        let left = self.theme.box_border(&format!("{} ", glyphs.vertical));
        let track = self.theme.box_border(&glyphs.vertical.to_string());
        let handle = self.theme.box_handle();
        let inner = width.saturating_sub(3);

        scrollbar(offset, height, total)
            .into_iter()
            .enumerate()
            .map(|(row, cell)| {
                let content = visible.get(row).copied().unwrap_or("");
                let bar = if cell == THUMB { &handle } else { &track };
                format!("{left}{}{bar}", pad(content, inner))
            })
            .collect()
    }

    fn hotkeys(&self, session: &CommandSession, width: usize) -> String {
        let mut keys = vec![("←", "Previous"), ("→", "Next")];
        keys.push(if session.is_paused() {
            ("f", "Follow")
        } else {
            ("p", "Pause ")
        });
        keys.push(("c", "Clear"));
        keys.push((
            "s",
            if session.is_running() {
                "Stop "
            } else {
                "Start"
            },
        ));
        keys.push(("r", "Restart"));
        keys.push(("q", "Quit"));

        let legend = keys
            .iter()
            .map(|(key, label)| format!("{key} {}", self.theme.dim(label)))
            .collect::<Vec<String>>()
            .join("  ");
        if visible_width(&legend) > width {
            return truncate(&legend, width);
        }
        center(&legend, width)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::process_manager::fake::FakeSpawner;
    use crate::text::strip_ansi;
    use crate::theme::{DarkTheme, LightTheme};

    fn sessions(lines: usize, width: usize, height: usize) -> Vec<CommandSession> {
        let spawner = Rc::new(FakeSpawner::default());
        let mut web = CommandSession::new("Web", "php artisan serve", spawner.clone());
        let mut queue = CommandSession::new("Queue", "php artisan queue:work", spawner);
        for idx in 0..lines {
            web.push_line(format!("line {idx}"));
        }
        web.set_dimensions(width, height);
        queue.set_dimensions(width, height);
        web.focus();
        vec![web, queue]
    }

    #[test]
    fn scrollbar_is_plain_track_when_content_fits() {
        assert_eq!(scrollbar(0, 4, 3), vec![TRACK; 4]);
        assert_eq!(scrollbar(0, 4, 4), vec![TRACK; 4]);
        assert!(scrollbar(0, 0, 10).is_empty());
    }

    #[test]
    fn scrollbar_thumb_tracks_offset_proportionally() {
        let top = scrollbar(0, 10, 40);
        assert_eq!(top.iter().filter(|cell| **cell == THUMB).count(), 3);
        assert_eq!(top[0], THUMB);

        let bottom = scrollbar(30, 10, 40);
        assert_eq!(bottom[9], THUMB);
        assert_eq!(bottom[6], TRACK);

        let tiny = scrollbar(500, 5, 1000);
        assert_eq!(tiny.iter().filter(|cell| **cell == THUMB).count(), 1);
    }

    #[test]
    fn top_border_is_exactly_the_viewport_width() {
        let renderer = ContentRenderer::new(&LightTheme);
        for width in [10, 30, 31, 80, 200] {
            let border = renderer.top_border(width, 4, 10, 120, false);
            assert_eq!(visible_width(&border), width, "width {width}");
        }
        let border = strip_ansi(&renderer.top_border(40, 0, 0, 0, true));
        assert_eq!(border, "╭──────── Viewing [0-0] of 0 (Paused) ─╮");
    }

    #[test]
    fn frame_fills_the_terminal_exactly() {
        let sessions = sessions(3, 80, 12);
        let frame = ContentRenderer::new(&DarkTheme::default()).render(&sessions, 0);
        assert_eq!(frame.len(), 12);
        for row in &frame[2..11] {
            assert_eq!(visible_width(row), 80);
        }
        let plain = frame.iter().map(|row| strip_ansi(row)).collect::<Vec<String>>();
        assert!(plain[0].starts_with(" Web   Queue "));
        assert_eq!(plain[1], " Stopped: php artisan serve");
        assert!(plain[2].contains("Viewing [1-3] of 3 (Live)"));
        assert_eq!(plain[3], format!("│ {}│", pad("line 0", 77)));
        assert_eq!(plain[6], format!("│ {}│", " ".repeat(77)));
        assert!(plain[10].starts_with('╰'));
        assert!(plain[11].contains("s Start"));
    }

    #[test]
    fn short_terminal_keeps_the_legend_on_the_last_row() {
        let short = sessions(3, 80, 3);
        let frame = ContentRenderer::new(&LightTheme).render(&short, 0);
        let plain = frame.iter().map(|row| strip_ansi(row)).collect::<Vec<String>>();
        assert_eq!(plain.len(), 3);
        assert!(plain[0].starts_with(" Web "));
        assert_eq!(plain[1], " Stopped: php artisan serve");
        assert!(plain[2].contains("q Quit"));

        let tiny = sessions(3, 80, 1);
        let frame = ContentRenderer::new(&LightTheme).render(&tiny, 0);
        assert_eq!(frame.len(), 1);
        assert!(strip_ansi(&frame[0]).contains("← Previous"));
    }

    #[test]
    fn paused_view_shows_the_offset_window_and_handle() {
        let mut sessions = sessions(30, 40, 15);
        sessions[0].scroll_down(5);
        let frame = ContentRenderer::new(&LightTheme).render(&sessions, 0);
        let plain = frame.iter().map(|row| strip_ansi(row)).collect::<Vec<String>>();
        assert!(plain[2].contains("Viewing [6-15] of 30 (Paused)"));
        assert!(plain[3].starts_with("│ line 5"));
        assert!(plain.iter().any(|row| row.ends_with('▒')));
        assert!(plain[14].contains("f Follow"));
    }
}
