//! The dashboard event loop.
//!
//! One thread owns every session. Each tick consumes a pending resize,
//! advances every session, handles at most one buffered key and draws one
//! frame of the focused session.

use std::io;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::{AppContext, CommandTrust};
use crate::format::build_formatter;
use crate::process_manager::Spawner;
use crate::session::CommandSession;
use crate::theme::Theme;

use super::content::ContentRenderer;
use super::terminal::DashboardTerminal;

pub const FRAME_INTERVAL: Duration = Duration::from_millis(25);
pub const QUIT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const FAST_SCROLL_LINES: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardAction {
    Clear,
    Pause,
    Follow,
    ScrollDown(usize),
    ScrollUp(usize),
    Toggle,
    Restart,
    Previous,
    Next,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Quit,
}

pub fn action_for_key(key: &KeyEvent) -> Option<DashboardAction> {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(DashboardAction::Quit);
    }
    let action = match key.code {
        KeyCode::Char('c') => DashboardAction::Clear,
        KeyCode::Char('p') => DashboardAction::Pause,
        KeyCode::Char('f') => DashboardAction::Follow,
        KeyCode::Char('s') => DashboardAction::Toggle,
        KeyCode::Char('r') => DashboardAction::Restart,
        KeyCode::Char('q') => DashboardAction::Quit,
        KeyCode::Down if shift => DashboardAction::ScrollDown(FAST_SCROLL_LINES),
        KeyCode::Up if shift => DashboardAction::ScrollUp(FAST_SCROLL_LINES),
        KeyCode::Down => DashboardAction::ScrollDown(1),
        KeyCode::Up => DashboardAction::ScrollUp(1),
        KeyCode::PageDown => DashboardAction::ScrollDown(FAST_SCROLL_LINES),
        KeyCode::PageUp => DashboardAction::ScrollUp(FAST_SCROLL_LINES),
        KeyCode::Left => DashboardAction::Previous,
        KeyCode::Right => DashboardAction::Next,
        _ => return None,
    };
    Some(action)
}

pub(crate) fn next_index(current: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        (current + 1) % len
    }
}

pub(crate) fn prev_index(current: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else if current == 0 {
        len - 1
    } else {
        current - 1
    }
}

pub struct Dashboard {
    sessions: Vec<CommandSession>,
    current: usize,
    theme: Arc<dyn Theme>,
}

impl Dashboard {
    /// One session per configured command, in declaration order.
    pub fn new(context: &AppContext, spawner: Rc<dyn Spawner>) -> Self {
        let sessions = context
            .commands
            .iter()
            .map(|definition| {
                let session = match &definition.trust {
                    CommandTrust::Trusted => CommandSession::new(
                        &definition.name,
                        &definition.run,
                        Rc::clone(&spawner),
                    )
                    .with_formatter(build_formatter(
                        definition.format,
                        Arc::clone(&context.theme),
                        &context.root,
                    )),
                    CommandTrust::Untrusted { source } => CommandSession::disabled(
                        &definition.name,
                        &definition.run,
                        source,
                        Rc::clone(&spawner),
                    ),
                };
                if definition.autostart {
                    session
                } else {
                    session.lazy()
                }
            })
            .collect();
        Self::from_sessions(sessions, Arc::clone(&context.theme))
    }

    pub fn from_sessions(sessions: Vec<CommandSession>, theme: Arc<dyn Theme>) -> Self {
        Self {
            sessions,
            current: 0,
            theme,
        }
    }

    pub fn sessions(&self) -> &[CommandSession] {
        &self.sessions
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// `(name, final state)` for every session.
    pub fn summary(&self) -> Vec<(String, String)> {
        self.sessions
            .iter()
            .map(|session| (session.name().to_owned(), session.summary()))
            .collect()
    }

    /// Sizes every session to the terminal, starts the autostart sessions and
    /// focuses the first tab.
    pub fn boot<T: DashboardTerminal>(&mut self, terminal: &T) -> Result<(), DashboardError> {
        let (width, height) = terminal.size()?;
        self.resize(width, height);
        for session in &mut self.sessions {
            session.autostart_if_configured();
        }
        if let Some(session) = self.sessions.get_mut(self.current) {
            session.focus();
        }
        Ok(())
    }

    fn resize(&mut self, width: u16, height: u16) {
        tracing::debug!(width, height, "terminal resized");
        for session in &mut self.sessions {
            session.set_dimensions(usize::from(width), usize::from(height));
        }
    }

    pub fn run<T: DashboardTerminal>(&mut self, terminal: &mut T) -> Result<(), DashboardError> {
        self.boot(terminal)?;
        loop {
            let started = Instant::now();
            if self.tick_once(terminal, started)? == LoopControl::Quit {
                break;
            }
            if let Some(rest) = FRAME_INTERVAL.checked_sub(started.elapsed()) {
                terminal.wait_for_input(rest)?;
            }
        }
        self.shutdown(terminal)
    }

    pub fn tick_once<T: DashboardTerminal>(
        &mut self,
        terminal: &mut T,
        now: Instant,
    ) -> Result<LoopControl, DashboardError> {
        let budget = Instant::now();
        if terminal.take_resize() {
            let (width, height) = terminal.size()?;
            self.resize(width, height);
        }

        for session in &mut self.sessions {
            session.tick(now);
        }

        if let Some(action) = terminal.next_key().as_ref().and_then(action_for_key) {
            if self.dispatch(action, now) == LoopControl::Quit {
                return Ok(LoopControl::Quit);
            }
        }

        if budget.elapsed() < FRAME_INTERVAL {
            self.draw(terminal)?;
        }
        Ok(LoopControl::Continue)
    }

    pub fn dispatch(&mut self, action: DashboardAction, now: Instant) -> LoopControl {
        let len = self.sessions.len();
        match action {
            DashboardAction::Previous => self.move_focus(prev_index(self.current, len)),
            DashboardAction::Next => self.move_focus(next_index(self.current, len)),
            DashboardAction::Quit => return LoopControl::Quit,
            action => {
                let Some(session) = self.sessions.get_mut(self.current) else {
                    return LoopControl::Continue;
                };
                match action {
                    DashboardAction::Clear => session.clear(),
                    DashboardAction::Pause => session.pause(),
                    DashboardAction::Follow => session.follow(),
                    DashboardAction::ScrollDown(lines) => session.scroll_down(lines),
                    DashboardAction::ScrollUp(lines) => session.scroll_up(lines),
                    DashboardAction::Toggle => session.toggle(now),
                    DashboardAction::Restart => session.restart(now),
                    DashboardAction::Previous | DashboardAction::Next | DashboardAction::Quit => {}
                }
            }
        }
        LoopControl::Continue
    }

    fn move_focus(&mut self, next: usize) {
        if next == self.current {
            return;
        }
        if let Some(session) = self.sessions.get_mut(self.current) {
            session.blur();
        }
        self.current = next;
        if let Some(session) = self.sessions.get_mut(self.current) {
            session.focus();
        }
    }

    fn draw<T: DashboardTerminal>(&mut self, terminal: &mut T) -> Result<(), DashboardError> {
        if let Some(session) = self.sessions.get_mut(self.current) {
            session.catch_up();
        }
        let frame = ContentRenderer::new(self.theme.as_ref()).render(&self.sessions, self.current);
        terminal.draw(&frame)?;
        Ok(())
    }

    /// Asks every session to stop, then keeps ticking until all of them have
    /// exited. Stubborn processes escalate to SIGKILL on their own timers.
    pub fn shutdown<T: DashboardTerminal>(&mut self, terminal: &mut T) -> Result<(), DashboardError> {
        let now = Instant::now();
        tracing::info!(sessions = self.sessions.len(), "quitting, stopping all sessions");
        for session in &mut self.sessions {
            session.cancel_pending();
            session.stop(now);
        }

        loop {
            let now = Instant::now();
            for session in &mut self.sessions {
                session.tick(now);
            }
            self.draw(terminal)?;

            let running = self
                .sessions
                .iter()
                .filter(|session| session.is_running())
                .count();
            if running == 0 {
                break;
            }
            tracing::debug!(running, "waiting for sessions to exit");
            thread::sleep(QUIT_POLL_INTERVAL);
        }
        tracing::info!("all sessions stopped");
        Ok(())
    }
}
