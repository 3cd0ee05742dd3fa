//! Spawning and signalling supervised child processes.
//!
//! Sessions only ever see the [`Spawner`] and [`ProcessHandle`] traits. The
//! shell implementation runs each command in its own process group so a stop
//! reaches every grandchild a dev server forks.

use std::io::{BufRead, BufReader, ErrorKind, Read};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as ProcessCommand, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread;

#[cfg(unix)]
use nix::sys::signal::{kill, Signal};
#[cfg(unix)]
use nix::unistd::{setpgid, Pid};

#[cfg(test)]
pub(crate) mod fake;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// SIGTERM
    Terminate,
    /// SIGKILL
    Kill,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("process for `{command}` has no {pipe} pipe")]
    MissingPipe { command: String, pipe: &'static str },
    #[cfg(unix)]
    #[error("failed to deliver {signal:?} to process group {pid}: {source}")]
    Signal {
        pid: i32,
        signal: StopSignal,
        #[source]
        source: nix::Error,
    },
}

/// A running (or finished) supervised process.
pub trait ProcessHandle {
    fn running(&self) -> bool;

    /// Output produced since the previous call, possibly empty.
    fn latest_output(&self) -> String;

    fn signal(&self, signal: StopSignal) -> Result<(), ProcessError>;

    /// Short `exit=N` / `signal=N` description once the process has exited.
    fn exit_status(&self) -> Option<String> {
        None
    }
}

pub trait Spawner {
    fn spawn(&self, command: &str) -> Result<Box<dyn ProcessHandle>, ProcessError>;
}

/// Runs commands through `sh -lc` in `cwd`.
#[derive(Debug, Clone)]
pub struct ShellSpawner {
    cwd: PathBuf,
}

impl ShellSpawner {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    fn command(&self, command: &str) -> ProcessCommand {
        let mut process = ProcessCommand::new("sh");
        process
            .arg("-lc")
            .arg(command)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        unsafe {
            process.pre_exec(|| {
                setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(|error| std::io::Error::new(ErrorKind::Other, error.to_string()))
            });
        }
        with_local_bin_path(&mut process, &self.cwd);
        process
    }
}

impl Spawner for ShellSpawner {
    fn spawn(&self, command: &str) -> Result<Box<dyn ProcessHandle>, ProcessError> {
        let mut child = self
            .command(command)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: command.to_owned(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| ProcessError::MissingPipe {
            command: command.to_owned(),
            pipe: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or_else(|| ProcessError::MissingPipe {
            command: command.to_owned(),
            pipe: "stderr",
        })?;

        let (tx, rx) = mpsc::channel::<String>();
        forward_lines(stdout, tx.clone());
        forward_lines(stderr, tx);

        tracing::debug!(pid = child.id(), command, "spawned process group");
        Ok(Box::new(ShellProcess {
            pid: child.id(),
            child: Mutex::new(child),
            exit: Mutex::new(None),
            output: rx,
        }))
    }
}

/// Reads `pipe` line by line on its own thread. Invalid UTF-8 is replaced
/// rather than ending the stream.
fn forward_lines<R: Read + Send + 'static>(pipe: R, tx: Sender<String>) {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(String::from_utf8_lossy(&buf).into_owned()).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

pub struct ShellProcess {
    pid: u32,
    child: Mutex<Child>,
    exit: Mutex<Option<ExitStatus>>,
    output: Receiver<String>,
}

impl ShellProcess {
    fn poll_exit(&self) -> Option<ExitStatus> {
        let mut exit = self.exit.lock().unwrap_or_else(PoisonError::into_inner);
        if exit.is_none() {
            let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
            match child.try_wait() {
                Ok(status) => *exit = status,
                Err(error) => {
                    tracing::warn!(pid = self.pid, %error, "failed to poll process status");
                }
            }
        }
        *exit
    }
}

impl ProcessHandle for ShellProcess {
    fn running(&self) -> bool {
        self.poll_exit().is_none()
    }

    fn latest_output(&self) -> String {
        self.output.try_iter().collect()
    }

    #[cfg(unix)]
    fn signal(&self, signal: StopSignal) -> Result<(), ProcessError> {
        let pid = self.pid as i32;
        if pid <= 0 {
            return Ok(());
        }
        let raw = match signal {
            StopSignal::Terminate => Signal::SIGTERM,
            StopSignal::Kill => Signal::SIGKILL,
        };
        match kill(Pid::from_raw(-pid), raw) {
            Ok(()) | Err(nix::Error::ESRCH) => Ok(()),
            Err(source) => Err(ProcessError::Signal {
                pid,
                signal,
                source,
            }),
        }
    }

    #[cfg(not(unix))]
    fn signal(&self, _signal: StopSignal) -> Result<(), ProcessError> {
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = child.kill();
        Ok(())
    }

    fn exit_status(&self) -> Option<String> {
        self.poll_exit().map(format_exit_diagnostic)
    }
}

impl Drop for ShellProcess {
    fn drop(&mut self) {
        if self.running() {
            let _ = self.signal(StopSignal::Kill);
            let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = child.wait();
        }
    }
}

pub(crate) fn format_exit_diagnostic(status: ExitStatus) -> String {
    #[cfg(unix)]
    {
        if let Some(code) = status.code() {
            return format!("exit={code}");
        }
        if let Some(signal) = status.signal() {
            return format!("signal={signal}");
        }
        "exit=unknown".to_owned()
    }
    #[cfg(not(unix))]
    {
        format!("exit={}", status.code().unwrap_or(-1))
    }
}

/// Puts `node_modules/.bin` and `vendor/bin` of `cwd` in front of PATH when
/// they exist.
fn with_local_bin_path(process: &mut ProcessCommand, cwd: &Path) {
    let local = ["node_modules/.bin", "vendor/bin"]
        .iter()
        .map(|dir| cwd.join(dir))
        .filter(|dir| dir.is_dir())
        .map(|dir| dir.display().to_string())
        .collect::<Vec<String>>();
    if local.is_empty() {
        return;
    }
    let local = local.join(":");
    let merged = match std::env::var("PATH") {
        Ok(path) if !path.is_empty() => format!("{local}:{path}"),
        _ => local,
    };
    process.env("PATH", merged);
}
