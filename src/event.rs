// src/event.rs

//! The vocabulary spoken by every other module: what a launched task emits
//! (`TaskEvent`) and how it can fail (`TaskError`).

use std::io;

use thiserror::Error;

/// One observable step in the life of a launched process.
///
/// A stream that runs to completion yields exactly one `Launch` first and,
/// on the success path, exactly one `Exit` last. `StdOut`/`StdErr` chunks sit
/// in between, in arrival order within their own channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// The process was spawned from `command`.
    Launch { command: String },
    /// A decoded, non-empty slice of standard output.
    StdOut(String),
    /// A decoded, non-empty slice of standard error.
    StdErr(String),
    /// The process exited normally. `code` may be non-zero.
    Exit { code: i32 },
}

impl TaskEvent {
    /// The exit status code if this is an `Exit` event.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            TaskEvent::Exit { code } => Some(*code),
            _ => None,
        }
    }

    /// The output text if this is a `StdOut` or `StdErr` event.
    pub fn output(&self) -> Option<&str> {
        match self {
            TaskEvent::StdOut(chunk) | TaskEvent::StdErr(chunk) => Some(chunk),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskEvent::Exit { .. })
    }
}

/// Terminal failure of a launched task.
///
/// Only ever yielded as the last item of a stream.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The process exited normally with a non-zero status.
    ///
    /// The core stream never produces this itself; see
    /// [`crate::ext::TaskEventStreamExt::fail_on_nonzero`].
    #[error("process exited with status {code}")]
    Exit { code: i32 },

    /// The process was terminated by a signal it did not handle.
    #[error("process terminated by an uncaught signal")]
    UncaughtSignal,

    /// The executable could not be started.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The OS could not report the final status of the process.
    #[error("failed to wait for process: {source}")]
    Wait {
        #[source]
        source: io::Error,
    },
}

impl TaskError {
    /// Exit code to hand back to a shell when this error ends a run.
    pub fn exit_code(&self) -> i32 {
        match self {
            TaskError::Exit { code } => *code,
            _ => 1,
        }
    }
}

/// Which output pipe a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    StdOut,
    StdErr,
}

impl Channel {
    /// Wrap a decoded chunk in the event for this channel.
    pub fn event(self, chunk: String) -> TaskEvent {
        match self {
            Channel::StdOut => TaskEvent::StdOut(chunk),
            Channel::StdErr => TaskEvent::StdErr(chunk),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::StdOut => "stdout",
            Channel::StdErr => "stderr",
        }
    }
}
