//! Blocking subprocess execution with a time budget.
//!
//! The shell transport runs on its own worker thread, so it calls `adb`
//! synchronously.  [`run_with_timeout`] drains stdout and stderr on helper
//! threads (a full pipe would otherwise stall the child) and polls the child
//! until it exits or the budget runs out, in which case it is killed.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::application::transport::TransportError;

/// How often the child is polled for exit.
const POLL_STEP: Duration = Duration::from_millis(10);

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Raw stdout; `exec-out` commands return binary data here.
    pub stdout: Vec<u8>,
    pub stderr: String,
    /// `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout decoded as UTF-8, replacing invalid sequences.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Renders `program args...` for log and error messages.
pub fn describe(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `program` with `args`, killing it if it exceeds `timeout`.
///
/// A non-zero exit is not an error here; callers inspect
/// [`CommandOutput::exit_code`].
///
/// # Errors
///
/// - [`TransportError::Spawn`] if the program could not be started.
/// - [`TransportError::Timeout`] if it did not exit within `timeout`.
/// - [`TransportError::Io`] if polling the child failed.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, TransportError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| TransportError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let stdout_handle = child.stdout.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });
    let stderr_handle = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    });

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if started.elapsed() > timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TransportError::Timeout {
                    command: describe(program, args),
                    timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_STEP),
            Err(e) => {
                let _ = child.kill();
                return Err(TransportError::Io(e));
            }
        }
    };

    let stdout = stdout_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let stderr = stderr_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_code: status.code(),
    })
}
