//! In-memory process doubles for lifecycle tests.

use std::cell::RefCell;
use std::rc::Rc;

use super::{ProcessError, ProcessHandle, Spawner, StopSignal};

#[derive(Debug, Default)]
struct FakeState {
    running: bool,
    output: String,
    signals: Vec<StopSignal>,
    exit_on: Option<StopSignal>,
}

/// Shared view of one fake process. Clones observe the same state, so a test
/// keeps one while the session owns another.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeProcess {
    state: Rc<RefCell<FakeState>>,
}

impl FakeProcess {
    pub(crate) fn running() -> Self {
        let process = Self::default();
        process.state.borrow_mut().running = true;
        process
    }

    pub(crate) fn push_output(&self, chunk: &str) {
        self.state.borrow_mut().output.push_str(chunk);
    }

    pub(crate) fn exit(&self) {
        self.state.borrow_mut().running = false;
    }

    /// Exit as soon as `signal` is delivered.
    pub(crate) fn exit_on(&self, signal: StopSignal) {
        self.state.borrow_mut().exit_on = Some(signal);
    }

    pub(crate) fn signals(&self) -> Vec<StopSignal> {
        self.state.borrow().signals.clone()
    }

    pub(crate) fn count(&self, signal: StopSignal) -> usize {
        self.state
            .borrow()
            .signals
            .iter()
            .filter(|sent| **sent == signal)
            .count()
    }
}

impl ProcessHandle for FakeProcess {
    fn running(&self) -> bool {
        self.state.borrow().running
    }

    fn latest_output(&self) -> String {
        std::mem::take(&mut self.state.borrow_mut().output)
    }

    fn signal(&self, signal: StopSignal) -> Result<(), ProcessError> {
        let mut state = self.state.borrow_mut();
        state.signals.push(signal);
        if state.exit_on == Some(signal) {
            state.running = false;
        }
        Ok(())
    }

    fn exit_status(&self) -> Option<String> {
        (!self.state.borrow().running).then(|| "exit=0".to_owned())
    }
}

/// Hands out a fresh running [`FakeProcess`] per spawn and remembers each one.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeSpawner {
    spawned: Rc<RefCell<Vec<(String, FakeProcess)>>>,
    fail: Rc<RefCell<bool>>,
    exit_on: Option<StopSignal>,
}

impl FakeSpawner {
    /// Every spawned process exits when it receives `signal`.
    pub(crate) fn exiting_on(signal: StopSignal) -> Self {
        Self {
            exit_on: Some(signal),
            ..Self::default()
        }
    }

    pub(crate) fn fail_next(&self, fail: bool) {
        *self.fail.borrow_mut() = fail;
    }

    pub(crate) fn spawn_count(&self) -> usize {
        self.spawned.borrow().len()
    }

    pub(crate) fn last(&self) -> Option<FakeProcess> {
        self.spawned.borrow().last().map(|(_, process)| process.clone())
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.spawned
            .borrow()
            .iter()
            .map(|(command, _)| command.clone())
            .collect()
    }
}

impl Spawner for FakeSpawner {
    fn spawn(&self, command: &str) -> Result<Box<dyn ProcessHandle>, ProcessError> {
        if *self.fail.borrow() {
            return Err(ProcessError::Spawn {
                command: command.to_owned(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "sh: not found"),
            });
        }
        let process = FakeProcess::running();
        if let Some(signal) = self.exit_on {
            process.exit_on(signal);
        }
        self.spawned
            .borrow_mut()
            .push((command.to_owned(), process.clone()));
        Ok(Box::new(process))
    }
}
