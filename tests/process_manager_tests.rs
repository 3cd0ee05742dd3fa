#![cfg(unix)]

use devtabs::process_manager::{ProcessHandle, ShellSpawner, Spawner, StopSignal};
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(handle: &dyn ProcessHandle, mut done: impl FnMut(&dyn ProcessHandle) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done(handle) {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn shell_process_captures_stdout_and_stderr() {
    let root = tempfile::tempdir().expect("tempdir");
    let spawner = ShellSpawner::new(root.path());
    let handle = spawner
        .spawn("printf 'alpha-out\\n'; printf 'beta-err\\n' 1>&2")
        .expect("spawn");

    let mut output = String::new();
    let finished = wait_until(handle.as_ref(), |handle| {
        output.push_str(&handle.latest_output());
        !handle.running() && output.contains("alpha-out") && output.contains("beta-err")
    });

    assert!(finished, "output so far: {output:?}");
    assert_eq!(handle.exit_status().as_deref(), Some("exit=0"));
}

#[test]
fn shell_process_runs_in_the_configured_directory() {
    let root = tempfile::tempdir().expect("tempdir");
    std::fs::write(root.path().join("marker.txt"), "here\n").expect("write marker");
    let handle = ShellSpawner::new(root.path())
        .spawn("cat marker.txt; exit 3")
        .expect("spawn");

    let mut output = String::new();
    let finished = wait_until(handle.as_ref(), |handle| {
        output.push_str(&handle.latest_output());
        !handle.running()
    });

    assert!(finished);
    output.push_str(&handle.latest_output());
    assert!(output.contains("here"));
    assert_eq!(handle.exit_status().as_deref(), Some("exit=3"));
}

#[test]
fn terminate_reaches_the_whole_process_group() {
    let root = tempfile::tempdir().expect("tempdir");
    let handle = ShellSpawner::new(root.path())
        .spawn("sleep 30 & sleep 30; wait")
        .expect("spawn");
    assert!(handle.running());
    assert_eq!(handle.exit_status(), None);

    handle.signal(StopSignal::Terminate).expect("signal");

    assert!(wait_until(handle.as_ref(), |handle| !handle.running()));
    let status = handle.exit_status().expect("exited");
    assert!(status.starts_with("signal=") || status.starts_with("exit="), "{status}");
}

#[test]
fn kill_stops_a_process_that_ignores_sigterm() {
    let root = tempfile::tempdir().expect("tempdir");
    let handle = ShellSpawner::new(root.path())
        .spawn("trap '' TERM; printf 'ready\\n'; while true; do sleep 1; done")
        .expect("spawn");

    let mut output = String::new();
    assert!(wait_until(handle.as_ref(), |handle| {
        output.push_str(&handle.latest_output());
        output.contains("ready")
    }));

    handle.signal(StopSignal::Terminate).expect("terminate");
    thread::sleep(Duration::from_millis(200));
    assert!(handle.running());

    handle.signal(StopSignal::Kill).expect("kill");
    assert!(wait_until(handle.as_ref(), |handle| !handle.running()));
    assert_eq!(handle.exit_status().as_deref(), Some("signal=9"));
}

#[test]
fn signalling_an_exited_process_is_not_an_error() {
    let root = tempfile::tempdir().expect("tempdir");
    let handle = ShellSpawner::new(root.path()).spawn("true").expect("spawn");
    assert!(wait_until(handle.as_ref(), |handle| !handle.running()));
    assert!(handle.signal(StopSignal::Terminate).is_ok());
    assert!(handle.signal(StopSignal::Kill).is_ok());
}
