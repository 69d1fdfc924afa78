//! Process Controller
//!
//! Launches the inference executable, feeds it scripted input, enforces a
//! wall-clock timeout and captures both output streams.
//!
//! ```text
//! resolve program ──► spawn (own process group, piped stdio)
//!                        │
//!        ┌───────────────┼───────────────┐
//!        ▼               ▼               ▼
//!   stdin writer    stdout reader   stderr reader     (threads)
//!                        │
//!                 poll try_wait until deadline
//!                        │ timeout
//!                        ▼
//!        SIGTERM group ─► grace ─► SIGKILL group ─► reap
//! ```

use std::env;
use std::ffi::OsStr;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use sweepbench_core::CommandLine;
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(unix)]
use std::os::unix::process::CommandExt;

/// Default time between SIGTERM and SIGKILL
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_millis(500);

/// Upper bound on the kill grace period
pub const MAX_KILL_GRACE: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors that prevent a run from producing output
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Program missing; nothing was spawned
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    /// Spawn failed for another reason (permissions, bad format)
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[source] io::Error),

    /// Waiting on the child failed; the child was killed
    #[error("Process I/O error: {0}")]
    Io(#[from] io::Error),
}

/// How the process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitIndicator {
    /// Exit status zero before the deadline
    Success,
    /// Non-zero exit, or killed by a signal
    Failed {
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
    },
    /// Deadline passed; the process group was terminated
    TimedOut,
}

impl ExitIndicator {
    fn from_status(status: ExitStatus) -> Self {
        if status.success() {
            ExitIndicator::Success
        } else {
            ExitIndicator::Failed {
                code: status.code(),
            }
        }
    }
}

/// Captured result of one process run
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// How the process ended
    pub exit: ExitIndicator,
    /// Captured stdout, lossily decoded
    pub stdout: String,
    /// Captured stderr, lossily decoded
    pub stderr: String,
    /// Process id, valid only while the process was alive
    pub pid: u32,
    /// Time from spawn to exit (or to termination)
    pub elapsed: Duration,
}

/// Runs one child process at a time with a timeout
#[derive(Debug, Clone)]
pub struct ProcessController {
    kill_grace: Duration,
}

impl Default for ProcessController {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessController {
    /// Create a controller with the default kill grace period
    pub fn new() -> Self {
        Self {
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    /// Set the time between SIGTERM and SIGKILL on timeout, at most
    /// [`MAX_KILL_GRACE`]
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace.min(MAX_KILL_GRACE);
        self
    }

    /// Run `cmd`, write `scripted_stdin` and close stdin, wait up to `timeout`.
    ///
    /// Fails before spawning with [`ProcessError::NotFound`] when the program
    /// cannot be resolved.
    pub fn run(
        &self,
        cmd: &CommandLine,
        scripted_stdin: &str,
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        let program = resolve_program(&cmd.program)
            .ok_or_else(|| ProcessError::NotFound(cmd.program.clone()))?;

        let mut command = Command::new(&program);
        command
            .args(&cmd.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so a timeout takes down anything the target forked.
        #[cfg(unix)]
        command.process_group(0);

        let mut guard = ChildGuard(spawn(&mut command).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ProcessError::NotFound(cmd.program.clone()),
            _ => ProcessError::SpawnFailed(e),
        })?);
        let child = &mut guard.0;
        let started = Instant::now();
        let pid = child.id();
        debug!(pid, "spawned {}", cmd);

        let stdin_writer = child.stdin.take().map(|mut stdin| {
            let input = scripted_stdin.to_owned();
            thread::spawn(move || {
                if let Err(e) = stdin.write_all(input.as_bytes()) {
                    if e.kind() != io::ErrorKind::BrokenPipe {
                        debug!("writing scripted input failed: {}", e);
                    }
                }
            })
        });
        let stdout_rx = child.stdout.take().map(drain);
        let stderr_rx = child.stderr.take().map(drain);

        // A timeout too large to represent means no deadline.
        let deadline = started.checked_add(timeout);
        let exit = match self.wait_until(child, deadline) {
            Ok(Some(status)) => ExitIndicator::from_status(status),
            Ok(None) => {
                warn!(pid, "timed out after {:?}, terminating", timeout);
                self.terminate(child);
                ExitIndicator::TimedOut
            }
            Err(e) => {
                self.terminate(child);
                return Err(ProcessError::Io(e));
            }
        };
        let elapsed = started.elapsed();

        if let Some(handle) = stdin_writer {
            let _ = handle.join();
        }
        let stdout = self.collect(stdout_rx, pid);
        let stderr = self.collect(stderr_rx, pid);

        Ok(ProcessOutput {
            exit,
            stdout,
            stderr,
            pid,
            elapsed,
        })
    }

    /// Poll for exit; `Ok(None)` means the deadline passed first
    fn wait_until(
        &self,
        child: &mut Child,
        deadline: Option<Instant>,
    ) -> io::Result<Option<ExitStatus>> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            let Some(deadline) = deadline else {
                thread::sleep(POLL_INTERVAL);
                continue;
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            thread::sleep(remaining.min(POLL_INTERVAL));
        }
    }

    /// SIGTERM the group, wait out the grace period, SIGKILL, reap
    fn terminate(&self, child: &mut Child) {
        let pid = child.id();
        let _ = signal_group(pid, Signal::Terminate);

        let grace_deadline = Instant::now() + self.kill_grace;
        while Instant::now() < grace_deadline {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(_) => break,
            }
        }

        // Helpers may outlive the group leader, so the group is always killed.
        let _ = signal_group(pid, Signal::Kill);
        if let Ok(None) = child.try_wait() {
            let _ = child.kill();
        }
        if let Err(e) = child.wait() {
            warn!(pid, "failed to reap child: {}", e);
        }
    }

    /// Take what a reader thread captured.
    ///
    /// A stream still open after the grace period is held by a leftover
    /// descendant; the group is killed and the read retried once.
    fn collect(&self, rx: Option<Receiver<Vec<u8>>>, pid: u32) -> String {
        let Some(rx) = rx else {
            return String::new();
        };
        let bytes = match rx.recv_timeout(self.kill_grace) {
            Ok(bytes) => bytes,
            Err(RecvTimeoutError::Disconnected) => Vec::new(),
            Err(RecvTimeoutError::Timeout) => {
                debug!(pid, "output still open after exit, killing process group");
                let _ = signal_group(pid, Signal::Kill);
                rx.recv_timeout(self.kill_grace).unwrap_or_default()
            }
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Owns a spawned child. Dropping it while the child still runs (an unwind
/// between spawn and reap) kills the process group and reaps the leader.
struct ChildGuard(Child);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Ok(None) = self.0.try_wait() {
            let pid = self.0.id();
            warn!(pid, "abandoning running child, killing process group");
            let _ = signal_group(pid, Signal::Kill);
            let _ = self.0.kill();
            let _ = self.0.wait();
        }
    }
}

/// Spawn, retrying briefly while the executable is still open for writing
/// somewhere (ETXTBSY, common right after the file was created)
fn spawn(command: &mut Command) -> io::Result<Child> {
    #[cfg_attr(not(unix), allow(unused_mut, unused_variables))]
    let mut attempts = 0;
    loop {
        match command.spawn() {
            #[cfg(unix)]
            Err(e) if e.raw_os_error() == Some(libc::ETXTBSY) && attempts < 5 => {
                attempts += 1;
                thread::sleep(Duration::from_millis(20));
            }
            other => return other,
        }
    }
}

/// Read a pipe to EOF on its own thread
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            debug!("output read ended early: {}", e);
        }
        let _ = tx.send(buf);
    });
    rx
}

/// Resolve `program` to an existing file.
///
/// Paths with a separator are checked as given; bare names are looked up on
/// `PATH`.
pub fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }
    let name: &OsStr = program.as_os_str();
    if name.is_empty() {
        return None;
    }
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Terminate,
    Kill,
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: Signal) -> io::Result<()> {
    let sig = match signal {
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    // Negative pid addresses the process group led by `pid`.
    let ret = unsafe { libc::kill(-(pid as libc::pid_t), sig) };
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: u32, _signal: Signal) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process groups are not supported on this platform",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandLine {
        CommandLine::new("/bin/sh", ["-c", script])
    }

    #[test]
    fn test_success_captures_both_streams() {
        let out = ProcessController::new()
            .run(&sh("echo hello; echo oops >&2"), "", Duration::from_secs(10))
            .unwrap();
        assert_eq!(out.exit, ExitIndicator::Success);
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr, "oops\n");
    }

    #[test]
    fn test_scripted_stdin_is_delivered() {
        let out = ProcessController::new()
            .run(&sh("read line; echo \"got $line\""), "/exit\n", Duration::from_secs(10))
            .unwrap();
        assert_eq!(out.stdout, "got /exit\n");
    }

    #[test]
    fn test_ignored_stdin_is_not_an_error() {
        let out = ProcessController::new()
            .run(&sh("exit 0"), &"x".repeat(1 << 20), Duration::from_secs(10))
            .unwrap();
        assert_eq!(out.exit, ExitIndicator::Success);
    }

    #[test]
    fn test_nonzero_exit() {
        let out = ProcessController::new()
            .run(&sh("echo bad >&2; exit 3"), "", Duration::from_secs(10))
            .unwrap();
        assert_eq!(out.exit, ExitIndicator::Failed { code: Some(3) });
        assert_eq!(out.stderr, "bad\n");
    }

    #[test]
    fn test_timeout_kills_process() {
        let controller = ProcessController::new().with_kill_grace(Duration::from_millis(100));
        let started = Instant::now();
        let out = controller
            .run(&sh("sleep 30"), "", Duration::from_millis(200))
            .unwrap();
        assert_eq!(out.exit, ExitIndicator::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(10));

        let alive = unsafe { libc::kill(out.pid as libc::pid_t, 0) } == 0;
        assert!(!alive, "timed out process still running");
    }

    #[test]
    fn test_timeout_does_not_hang_on_forked_helper() {
        let controller = ProcessController::new().with_kill_grace(Duration::from_millis(100));
        let started = Instant::now();
        let out = controller
            .run(&sh("sleep 30 & sleep 30"), "", Duration::from_millis(200))
            .unwrap();
        assert_eq!(out.exit, ExitIndicator::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_unrepresentable_timeout_means_no_deadline() {
        let out = ProcessController::new()
            .run(&sh("sleep 0.1; echo done"), "", Duration::MAX)
            .unwrap();
        assert_eq!(out.exit, ExitIndicator::Success);
        assert_eq!(out.stdout, "done\n");
    }

    #[test]
    fn test_kill_grace_is_clamped() {
        let controller = ProcessController::new().with_kill_grace(Duration::MAX);
        assert_eq!(controller.kill_grace, MAX_KILL_GRACE);
    }

    #[test]
    fn test_dropped_guard_kills_running_child() {
        let mut command = Command::new("/bin/sh");
        command.args(["-c", "sleep 30"]).process_group(0);
        let guard = ChildGuard(spawn(&mut command).unwrap());
        let pid = guard.0.id();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = guard;
            panic!("unwinding between spawn and reap");
        }));

        assert!(outcome.is_err());
        // Reaped and gone: signalling the pid fails.
        let alive = unsafe { libc::kill(pid as libc::pid_t, 0) } == 0;
        assert!(!alive, "child {pid} still running after guard dropped");
    }

    #[test]
    fn test_missing_program_fails_before_spawn() {
        let err = ProcessController::new()
            .run(
                &CommandLine::new("/definitely/not/here/llama-cli", Vec::<String>::new()),
                "",
                Duration::from_secs(1),
            )
            .unwrap_err();
        assert!(matches!(err, ProcessError::NotFound(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let out = ProcessController::new()
            .run(&sh("printf 'ok\\377'"), "", Duration::from_secs(10))
            .unwrap();
        assert_eq!(out.stdout, "ok\u{FFFD}");
    }

    #[test]
    fn test_resolve_program_on_path() {
        assert!(resolve_program(Path::new("sh")).is_some());
        assert!(resolve_program(Path::new("no-such-binary-sweepbench")).is_none());
        assert!(resolve_program(Path::new("")).is_none());
    }
}
