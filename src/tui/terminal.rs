//! The terminal capability the dashboard draws to and reads keys from.

use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{cursor, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::style::Style;
use ratatui::widgets::Paragraph;
use ratatui::Terminal;

use super::ansi::ansi_line;

pub trait DashboardTerminal {
    /// `(columns, rows)`.
    fn size(&self) -> io::Result<(u16, u16)>;

    /// Replaces the screen with `frame`, one string per row.
    fn draw(&mut self, frame: &[String]) -> io::Result<()>;

    /// Waits up to `timeout` for input, buffering whatever arrives. Returns
    /// early as soon as a key or resize is seen.
    fn wait_for_input(&mut self, timeout: Duration) -> io::Result<bool>;

    fn next_key(&mut self) -> Option<KeyEvent>;

    /// Returns and clears the pending-resize flag.
    fn take_resize(&mut self) -> bool;
}

/// Raw mode plus alternate screen on stdout. Dropping it restores the
/// terminal; a panic hook does the same before the panic message prints.
pub struct CrosstermTerminal {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    keys: VecDeque<KeyEvent>,
    resized: Arc<AtomicBool>,
    #[cfg(unix)]
    winch: Option<signal_hook::SigId>,
    restored: bool,
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, EnableLineWrap, cursor::Show)
}

fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = restore_terminal();
            previous(info);
        }));
    });
}

impl CrosstermTerminal {
    pub fn enter() -> io::Result<Self> {
        install_panic_hook();
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(error) = execute!(stdout, EnterAlternateScreen, cursor::Hide) {
            let _ = disable_raw_mode();
            return Err(error);
        }

        let resized = Arc::new(AtomicBool::new(false));
        let mut terminal = Self {
            terminal: Terminal::new(CrosstermBackend::new(stdout))?,
            keys: VecDeque::new(),
            resized: Arc::clone(&resized),
            #[cfg(unix)]
            winch: None,
            restored: false,
        };
        #[cfg(unix)]
        {
            terminal.winch = Some(signal_hook::flag::register(
                signal_hook::consts::SIGWINCH,
                resized,
            )?);
        }
        terminal.terminal.clear()?;
        Ok(terminal)
    }

    /// Leaves the alternate screen and raw mode. Safe to call more than once.
    pub fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        #[cfg(unix)]
        {
            if let Some(id) = self.winch.take() {
                signal_hook::low_level::unregister(id);
            }
        }
        restore_terminal()
    }

    fn buffer(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.keys.push_back(key),
            Event::Resize(..) => self.resized.store(true, Ordering::SeqCst),
            _ => {}
        }
    }
}

impl DashboardTerminal for CrosstermTerminal {
    fn size(&self) -> io::Result<(u16, u16)> {
        crossterm::terminal::size()
    }

    fn draw(&mut self, frame: &[String]) -> io::Result<()> {
        let lines = frame
            .iter()
            .map(|row| ansi_line(row, Style::default()))
            .collect::<Vec<_>>();
        self.terminal.draw(|f| {
            let area = f.area();
            f.render_widget(Paragraph::new(lines), area);
        })?;
        Ok(())
    }

    fn wait_for_input(&mut self, timeout: Duration) -> io::Result<bool> {
        if !event::poll(timeout)? {
            return Ok(false);
        }
        self.buffer(event::read()?);
        while event::poll(Duration::ZERO)? {
            self.buffer(event::read()?);
        }
        Ok(!self.keys.is_empty() || self.resized.load(Ordering::SeqCst))
    }

    fn next_key(&mut self) -> Option<KeyEvent> {
        self.keys.pop_front()
    }

    fn take_resize(&mut self) -> bool {
        self.resized.swap(false, Ordering::SeqCst)
    }
}

impl Drop for CrosstermTerminal {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}
