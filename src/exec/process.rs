// src/exec/process.rs

//! OS-level child process with its three standard streams piped.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::event::TaskError;

/// Everything needed to start a process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Entries applied on top of the inherited environment.
    pub env: Vec<(OsString, OsString)>,
    pub current_dir: Option<PathBuf>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// The command as reported in the `Launch` event.
    pub fn display_command(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// How the process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Normal exit with a status code (possibly non-zero).
    Exited(i32),
    /// Killed by a signal. The number is only known on Unix.
    Signaled(Option<i32>),
}

impl From<ExitStatus> for Termination {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => Termination::Exited(code),
            None => Termination::Signaled(signal_of(&status)),
        }
    }
}

#[cfg(unix)]
fn signal_of(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: &ExitStatus) -> Option<i32> {
    None
}

/// A spawned child plus the pipes not yet handed out.
///
/// The child is spawned with `kill_on_drop(true)`; dropping the handle never
/// leaves the process running.
#[derive(Debug)]
pub struct ProcessHandle {
    command: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl ProcessHandle {
    /// Spawn `spec` with stdin, stdout and stderr all piped.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(spec: &LaunchSpec) -> Result<Self, TaskError> {
        let command = spec.display_command();

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| TaskError::Spawn {
            command: command.clone(),
            source,
        })?;

        info!(
            command = %command,
            pid = ?child.id(),
            args = ?spec.args,
            "spawned process"
        );

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        Ok(Self {
            command,
            child,
            stdin,
            stdout,
            stderr,
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Wait for the process to terminate.
    ///
    /// Cancel-safe; may be raced in `tokio::select!`.
    pub async fn wait(&mut self) -> Result<Termination, TaskError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|source| TaskError::Wait { source })?;

        let termination = Termination::from(status);
        match termination {
            Termination::Exited(code) => {
                info!(command = %self.command, exit_code = code, "process exited");
            }
            Termination::Signaled(signal) => {
                info!(command = %self.command, ?signal, "process killed by signal");
            }
        }
        Ok(termination)
    }

    /// Kill the process if it is still running and reap it.
    pub async fn kill(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(command = %self.command, ?status, "process already exited; nothing to kill");
            }
            Ok(None) => {
                info!(command = %self.command, pid = ?self.child.id(), "killing process");
                if let Err(e) = self.child.kill().await {
                    warn!(
                        command = %self.command,
                        error = %e,
                        "failed to kill child process"
                    );
                }
            }
            Err(e) => {
                warn!(command = %self.command, error = %e, "failed to poll child status");
            }
        }
    }
}
