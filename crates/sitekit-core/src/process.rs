//! Bounded external command execution.
//!
//! Every subprocess sitekit starts (git queries, the interpreter version
//! query, the site generator) goes through [`run_with_timeout`], which polls
//! the child and kills it once the deadline passes.

use std::{
    ffi::OsStr,
    io::Read,
    path::Path,
    process::{Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use thiserror::Error;
use tracing::{debug, warn};

/// Default bound for short metadata queries.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Subprocess errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program did not finish in time and was killed.
    #[error("`{program}` timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    /// Waiting on the child failed.
    #[error("failed to wait for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for subprocess operations.
pub type Result<T> = std::result::Result<T, ProcessError>;

/// Exit status and captured output of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    /// Empty unless [`RunOptions::capture_stderr`] was set.
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Whether the command exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Captured stdout as trimmed UTF-8 (lossy).
    #[must_use]
    pub fn stdout_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    /// Captured stderr as trimmed UTF-8 (lossy).
    #[must_use]
    pub fn stderr_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Options for [`run_with_timeout`].
#[derive(Debug, Clone, Copy)]
pub struct RunOptions<'a> {
    /// Working directory for the child, inherited when `None`.
    pub cwd: Option<&'a Path>,
    /// Capture stdout instead of passing it through.
    pub capture_stdout: bool,
    /// Capture stderr instead of passing it through.
    pub capture_stderr: bool,
    /// Deadline after which the child is killed.
    pub timeout: Duration,
}

impl Default for RunOptions<'_> {
    fn default() -> Self {
        Self {
            cwd: None,
            capture_stdout: true,
            capture_stderr: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Run `program` with `args`, killing it if it outlives `options.timeout`.
///
/// A non-zero exit is not an error here; callers inspect
/// [`CommandOutput::status`]. Stdin is null.
pub fn run_with_timeout<I, S>(
    program: &str,
    args: I,
    options: RunOptions<'_>,
) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(pipe_or_inherit(options.capture_stdout))
        .stderr(pipe_or_inherit(options.capture_stderr));
    if let Some(dir) = options.cwd {
        command.current_dir(dir);
    }

    debug!(program, timeout_secs = options.timeout.as_secs(), "spawning command");

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: program.to_string(),
        source,
    })?;

    // Drain pipes on separate threads so a chatty child cannot block on a full pipe.
    let stdout_reader = child.stdout.take().map(drain);
    let stderr_reader = child.stderr.take().map(drain);

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if started.elapsed() > options.timeout {
                    warn!(program, "command timed out, killing");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProcessError::Timeout {
                        program: program.to_string(),
                        timeout: options.timeout,
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                return Err(ProcessError::Wait {
                    program: program.to_string(),
                    source,
                });
            }
        }
    };

    let stdout = join(stdout_reader);
    let stderr = join(stderr_reader);

    debug!(program, code = ?status.code(), "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
    })
}

fn pipe_or_inherit(capture: bool) -> Stdio {
    if capture {
        Stdio::piped()
    } else {
        Stdio::inherit()
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout() {
        let output = run_with_timeout("echo", ["hello"], RunOptions::default()).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_trimmed(), "hello");
    }

    #[test]
    fn test_nonzero_exit_is_not_an_error() {
        let output = run_with_timeout("false", Vec::<&str>::new(), RunOptions::default()).unwrap();
        assert!(!output.success());
    }

    #[test]
    fn test_missing_program() {
        let err = run_with_timeout(
            "sitekit-definitely-not-installed",
            Vec::<&str>::new(),
            RunOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[test]
    fn test_timeout_kills_child() {
        let options = RunOptions {
            timeout: Duration::from_millis(200),
            ..RunOptions::default()
        };
        let started = Instant::now();
        let err = run_with_timeout("sleep", ["5"], options).unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_stderr_passed_through_by_default() {
        let output = run_with_timeout("sh", ["-c", "echo oops >&2"], RunOptions::default()).unwrap();
        assert!(output.stderr.is_empty());
    }

    #[test]
    fn test_captures_stderr() {
        let options = RunOptions {
            capture_stderr: true,
            ..RunOptions::default()
        };
        let output = run_with_timeout("sh", ["-c", "echo oops >&2"], options).unwrap();
        assert_eq!(output.stderr_trimmed(), "oops");
        assert_eq!(output.stdout_trimmed(), "");
    }

    #[test]
    fn test_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            cwd: Some(dir.path()),
            ..RunOptions::default()
        };
        let output = run_with_timeout("pwd", Vec::<&str>::new(), options).unwrap();
        let reported = std::fs::canonicalize(output.stdout_trimmed()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }
}
