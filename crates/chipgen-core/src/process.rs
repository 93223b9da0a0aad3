//! Running external tools under a deadline with captured output.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Interval between child status checks while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Captured result of a finished child process.
#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Spawn `cmd` with null stdin and piped output, then wait as in [`wait_with_timeout`].
///
/// Spawn failures are returned as the outer error.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> io::Result<Option<CapturedOutput>> {
    let child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    wait_with_timeout(child, timeout)
}

/// Wait for `child` to exit and for its output pipes to close, within `timeout`.
///
/// Returns `Ok(None)` when the deadline passes first, whether the child
/// itself is still running or a process it left behind keeps the pipes
/// open. A timeout too large to add to the current instant never expires.
pub fn wait_with_timeout(mut child: Child, timeout: Duration) -> io::Result<Option<CapturedOutput>> {
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now().checked_add(timeout);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                reap(&mut child);
                return Err(e);
            }
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            reap(&mut child);
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    };

    // Reader threads whose pipes are still held are left detached.
    let Some(stdout) = collect(stdout, deadline) else {
        return Ok(None);
    };
    let Some(stderr) = collect(stderr, deadline) else {
        return Ok(None);
    };
    Ok(Some(CapturedOutput {
        status,
        stdout,
        stderr,
    }))
}

/// Kill and wait for `child`, ignoring failures: it may already be gone.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Read `pipe` to EOF on its own thread and hand the bytes back over a channel.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// Receive a drained pipe's bytes, or `None` if `deadline` passes first.
fn collect(pipe: Option<Receiver<Vec<u8>>>, deadline: Option<Instant>) -> Option<Vec<u8>> {
    let Some(rx) = pipe else {
        return Some(Vec::new());
    };
    let received = match deadline {
        Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(buf) => Some(buf),
        Err(RecvTimeoutError::Disconnected) => Some(Vec::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}
