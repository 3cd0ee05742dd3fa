//! One supervised command: its process lifecycle, bounded log and scroll
//! state.
//!
//! All timing goes through the `now` argument so the stop escalation can be
//! driven with simulated instants.

use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::format::{LineFormatter, PlainFormatter};
use crate::process_manager::{ProcessHandle, Spawner, StopSignal};

mod log_buffer;

pub use log_buffer::{LogBuffer, MAX_LOG_LINES};

/// How long a stopping process gets after SIGTERM before SIGKILL.
pub const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);
/// Unfocused sessions pull output on every Nth tick only.
pub const UNFOCUSED_POLL_INTERVAL: u64 = 10;
const WAITING_NOTICE_INTERVAL: Duration = Duration::from_secs(1);

/// Tabs row, process-state row, top border, bottom border, hotkey row.
const CHROME_ROWS: usize = 5;
/// Two border columns and two padding columns.
const CHROME_COLUMNS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Start,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Stopping,
    Stopped,
    Disabled,
}

pub struct CommandSession {
    name: String,
    command_line: String,
    autostart: bool,
    disabled: Option<String>,
    spawner: Rc<dyn Spawner>,
    formatter: Box<dyn LineFormatter>,
    handle: Option<Box<dyn ProcessHandle>>,

    stopping: bool,
    stop_requested_at: Option<Instant>,
    terminate_sent: bool,
    kill_notice_logged: bool,
    last_waiting_notice: Option<Instant>,
    exit_reported: bool,
    last_exit: Option<String>,
    pending: VecDeque<PendingAction>,

    focused: bool,
    paused: bool,
    scroll_offset: usize,
    viewport_width: usize,
    viewport_height: usize,
    log: LogBuffer,
    ticks: u64,
}

impl CommandSession {
    pub fn new(
        name: impl Into<String>,
        command_line: impl Into<String>,
        spawner: Rc<dyn Spawner>,
    ) -> Self {
        Self {
            name: name.into(),
            command_line: command_line.into(),
            autostart: true,
            disabled: None,
            spawner,
            formatter: Box::new(PlainFormatter),
            handle: None,
            stopping: false,
            stop_requested_at: None,
            terminate_sent: false,
            kill_notice_logged: false,
            last_waiting_notice: None,
            exit_reported: false,
            last_exit: None,
            pending: VecDeque::new(),
            focused: false,
            paused: false,
            scroll_offset: 0,
            viewport_width: 0,
            viewport_height: 0,
            log: LogBuffer::default(),
            ticks: 0,
        }
    }

    /// A session declared by an untrusted source. It explains itself in its
    /// log and refuses to start.
    pub fn disabled(
        name: impl Into<String>,
        command_line: impl Into<String>,
        source: &str,
        spawner: Rc<dyn Spawner>,
    ) -> Self {
        let mut session = Self::new(name, command_line, spawner);
        session.autostart = false;
        session.disabled = Some(source.to_owned());
        session.log.push(format!(
            "Cannot start potentially unsafe command added from [{source}]."
        ));
        session.log.push("");
        session.log.push(
            "To allow commands declared in that file to run, add a matching glob to `allow` in your devtabs.toml:",
        );
        session.log.push("");
        session.log.push(format!("allow = [\"{source}\"]"));
        session
    }

    pub fn lazy(mut self) -> Self {
        self.autostart = false;
        self
    }

    pub fn with_formatter(mut self, formatter: Box<dyn LineFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn autostart(&self) -> bool {
        self.autostart
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.is_some()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    pub fn stop_requested_at(&self) -> Option<Instant> {
        self.stop_requested_at
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn log(&self) -> &LogBuffer {
        &self.log
    }

    pub fn pending_actions(&self) -> impl Iterator<Item = &PendingAction> {
        self.pending.iter()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| handle.running())
    }

    pub fn state(&self) -> SessionState {
        if self.disabled.is_some() {
            SessionState::Disabled
        } else if !self.is_running() {
            SessionState::Stopped
        } else if self.stopping {
            SessionState::Stopping
        } else {
            SessionState::Running
        }
    }

    /// One-line final state for the exit summary.
    pub fn summary(&self) -> String {
        match (self.state(), &self.last_exit, &self.handle) {
            (SessionState::Disabled, _, _) => "disabled (untrusted source)".to_owned(),
            (SessionState::Running | SessionState::Stopping, _, _) => "running".to_owned(),
            (SessionState::Stopped, Some(exit), _) => format!("stopped ({exit})"),
            (SessionState::Stopped, None, Some(_)) => "stopped".to_owned(),
            (SessionState::Stopped, None, None) => "never started".to_owned(),
        }
    }

    pub fn start(&mut self) {
        if let Some(source) = &self.disabled {
            tracing::warn!(session = %self.name, source = %source, "refusing to start untrusted command");
            self.log.push("Will not start unsafe command.");
            return;
        }
        if self.is_running() {
            return;
        }

        match self.spawner.spawn(&self.command_line) {
            Ok(handle) => {
                tracing::info!(session = %self.name, command = %self.command_line, "started");
                self.handle = Some(handle);
                self.terminate_sent = false;
                self.kill_notice_logged = false;
                self.exit_reported = false;
                self.last_exit = None;
            }
            Err(error) => {
                tracing::warn!(session = %self.name, %error, "spawn failed");
                self.handle = None;
                self.log.push(format!("Failed to start: {error}"));
            }
        }
    }

    pub fn stop(&mut self, now: Instant) {
        self.log.push("Stopping process...");
        self.stopping = true;
        if self.stop_requested_at.is_none() {
            self.stop_requested_at = Some(now);
        }
        if self.is_running() && !self.terminate_sent {
            self.terminate_sent = true;
            tracing::info!(session = %self.name, "sending SIGTERM");
            self.send(StopSignal::Terminate);
        }
    }

    /// Stops the process and starts it again once it has fully exited.
    pub fn restart(&mut self, now: Instant) {
        tracing::info!(session = %self.name, "restart requested");
        if !self.pending.contains(&PendingAction::Start) {
            self.pending.push_back(PendingAction::Start);
        }
        self.stop(now);
    }

    /// Drops queued follow-up actions so a pending restart cannot respawn.
    pub fn cancel_pending(&mut self) {
        self.pending.clear();
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.is_running() {
            self.stop(now);
        } else {
            self.start();
        }
    }

    /// Starts the process if it is configured to autostart and not running.
    pub fn autostart_if_configured(&mut self) {
        if self.autostart && !self.is_running() {
            self.start();
        }
    }

    /// Per-frame reconciliation followed by the rate-limited output poll.
    pub fn tick(&mut self, now: Instant) {
        self.ticks = self.ticks.wrapping_add(1);
        self.reconcile(now);

        let interval = if self.focused {
            1
        } else {
            UNFOCUSED_POLL_INTERVAL
        };
        if self.ticks % interval == 0 {
            self.gather_output();
        }
    }

    fn reconcile(&mut self, now: Instant) {
        if !self.stopping {
            self.report_unexpected_exit();
            return;
        }

        if !self.is_running() {
            self.gather_output();
            self.finish_stop();
            return;
        }

        let requested = *self.stop_requested_at.get_or_insert(now);
        let elapsed = now.saturating_duration_since(requested);
        if elapsed < STOP_GRACE_PERIOD {
            let due = match self.last_waiting_notice {
                Some(last) => now.saturating_duration_since(last) >= WAITING_NOTICE_INTERVAL,
                None => elapsed >= WAITING_NOTICE_INTERVAL,
            };
            if due {
                self.last_waiting_notice = Some(now);
                self.log.push("Waiting...");
            }
            return;
        }

        if !self.kill_notice_logged {
            self.kill_notice_logged = true;
            self.log.push("Force killing!");
            tracing::warn!(session = %self.name, "grace period elapsed, sending SIGKILL");
        }
        self.send(StopSignal::Kill);
    }

    fn finish_stop(&mut self) {
        self.stopping = false;
        self.stop_requested_at = None;
        self.terminate_sent = false;
        self.kill_notice_logged = false;
        self.last_waiting_notice = None;
        self.exit_reported = true;
        self.last_exit = self.handle.as_ref().and_then(|handle| handle.exit_status());
        self.log.push("Stopped.");
        tracing::info!(session = %self.name, exit = ?self.last_exit, "stopped");

        while let Some(action) = self.pending.pop_front() {
            match action {
                PendingAction::Start => {
                    if !self.is_running() {
                        self.start();
                    }
                }
            }
        }
    }

    /// Notes a process that exited without being asked to.
    fn report_unexpected_exit(&mut self) {
        if self.exit_reported || self.handle.is_none() || self.is_running() {
            return;
        }
        self.exit_reported = true;
        self.gather_output();
        self.last_exit = self.handle.as_ref().and_then(|handle| handle.exit_status());
        let detail = self.last_exit.as_deref().unwrap_or("exit=unknown");
        self.log.push(format!("Process exited ({detail})."));
        tracing::info!(session = %self.name, exit = %detail, "process exited");
    }

    fn send(&self, signal: StopSignal) {
        let Some(handle) = &self.handle else {
            return;
        };
        if let Err(error) = handle.signal(signal) {
            tracing::warn!(session = %self.name, %error, "signal delivery failed");
        }
    }

    fn gather_output(&mut self) {
        let Some(handle) = &self.handle else {
            return;
        };
        let latest = handle.latest_output();
        if !latest.is_empty() {
            self.log.push_chunk(&latest);
        }
    }

    pub fn focus(&mut self) {
        self.focused = true;
        self.gather_output();
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn follow(&mut self) {
        self.paused = false;
    }

    pub fn clear(&mut self) {
        self.log.clear();
        self.scroll_offset = 0;
    }

    pub fn push_line(&mut self, line: impl AsRef<str>) {
        self.log.push(line);
    }

    pub fn set_dimensions(&mut self, width: usize, height: usize) {
        self.viewport_width = width;
        self.viewport_height = height;
        self.scroll_offset = self.scroll_offset.min(self.max_scroll_offset());
    }

    pub fn viewport(&self) -> (usize, usize) {
        (self.viewport_width, self.viewport_height)
    }

    pub fn pane_height(&self) -> usize {
        self.viewport_height.saturating_sub(CHROME_ROWS)
    }

    pub fn content_width(&self) -> usize {
        self.viewport_width.saturating_sub(CHROME_COLUMNS).max(1)
    }

    /// Every buffered line run through the formatter at the current width.
    pub fn wrapped_lines(&self) -> Vec<String> {
        let width = self.content_width();
        let lines = self
            .log
            .iter()
            .flat_map(|line| self.formatter.format(line, width))
            .collect::<Vec<String>>();
        self.formatter.collapse(lines)
    }

    pub fn max_scroll_offset(&self) -> usize {
        self.wrapped_lines()
            .len()
            .saturating_sub(self.pane_height())
    }

    pub fn scroll_down(&mut self, amount: usize) {
        self.paused = true;
        self.scroll_offset = self
            .scroll_offset
            .saturating_add(amount)
            .min(self.max_scroll_offset());
    }

    pub fn scroll_up(&mut self, amount: usize) {
        self.paused = true;
        self.scroll_offset = self
            .scroll_offset
            .saturating_sub(amount)
            .min(self.max_scroll_offset());
    }

    /// Pins the view to the newest output unless the user paused it.
    pub fn catch_up(&mut self) {
        if self.paused {
            return;
        }
        let bottom = self.max_scroll_offset();
        self.scroll_down(bottom);
        // scroll_down pauses.
        self.follow();
    }
}
