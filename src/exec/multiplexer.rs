// src/exec/multiplexer.rs

//! Event multiplexer: merges both pipe readers, the stdin feeder and process
//! termination into one ordered stream of `TaskEvent`s.
//!
//! One driver task owns the child for the whole launch:
//!
//! 1. spawn the process (a spawn failure is the first and only item),
//! 2. send `Launch`,
//! 3. start the stdout/stderr readers and the optional stdin feeder,
//! 4. wait for termination (or cancellation),
//! 5. stop the feeder and drain both readers to end-of-file,
//! 6. tear everything down, exactly once,
//! 7. send the terminal item: `Exit` on a normal exit, `UncaughtSignal` on
//!    signal death.
//!
//! A cancelled launch skips step 7.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{FusedStream, Stream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::event::{Channel, TaskError, TaskEvent};

use super::process::{LaunchSpec, ProcessHandle, Termination};
use super::reader::{EventSender, read_pipe};
use super::stdin::{FeedOutcome, StdinSource, feed_stdin};

/// Bound on events buffered between the driver and the consumer.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Start the driver for one launch and return the consumer side.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_multiplexer(spec: LaunchSpec, stdin: Option<StdinSource>) -> TaskStream {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

    tokio::spawn(drive(spec, stdin, tx, cancel_rx));

    TaskStream {
        events: rx,
        cancel: Some(cancel_tx),
        finished: false,
    }
}

/// The event stream of one launched task.
///
/// Yields `Ok(Launch)` first, then output chunks, then exactly one terminal
/// item (`Ok(Exit)` or `Err(TaskError)`), then `None` forever.
///
/// Dropping the stream cancels the launch: the child is killed and all
/// pipes are released.
#[derive(Debug)]
pub struct TaskStream {
    events: mpsc::Receiver<Result<TaskEvent, TaskError>>,
    cancel: Option<oneshot::Sender<()>>,
    finished: bool,
}

impl TaskStream {
    /// Ask the driver to kill the child and release everything.
    ///
    /// Events already buffered are still yielded. No terminal item follows
    /// unless the driver had already produced one.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            if cancel.send(()).is_err() {
                debug!("task already finished while cancelling");
            }
        }
    }

    /// Cancel the launch and wait until the child is killed and reaped and
    /// every pipe is released.
    ///
    /// Items still in flight are discarded. Returns at once if the stream
    /// already yielded its terminal item.
    pub async fn shutdown(&mut self) {
        if self.finished {
            return;
        }
        self.cancel();

        // The channel closes only once the driver has finished teardown and
        // dropped every sender.
        let mut discarded = 0usize;
        while self.events.recv().await.is_some() {
            discarded += 1;
        }
        self.finished = true;
        debug!(discarded, "task shut down");
    }
}

impl Drop for TaskStream {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel();
        }
    }
}

impl Stream for TaskStream {
    type Item = Result<TaskEvent, TaskError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match this.events.poll_recv(cx) {
            Poll::Ready(Some(item)) => {
                if is_terminal(&item) {
                    this.finished = true;
                }
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl FusedStream for TaskStream {
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

fn is_terminal(item: &Result<TaskEvent, TaskError>) -> bool {
    match item {
        Ok(event) => event.is_terminal(),
        Err(_) => true,
    }
}

async fn drive(
    spec: LaunchSpec,
    stdin: Option<StdinSource>,
    events: EventSender,
    cancel_rx: oneshot::Receiver<()>,
) {
    let mut process = match ProcessHandle::spawn(&spec) {
        Ok(process) => process,
        Err(e) => {
            warn!(command = %spec.display_command(), error = %e, "launch failed");
            let _ = events.send(Err(e)).await;
            return;
        }
    };

    let launch = TaskEvent::Launch {
        command: process.command().to_string(),
    };
    if events.send(Ok(launch)).await.is_err() {
        debug!(command = %process.command(), "stream dropped before launch event");
        process.kill().await;
        return;
    }

    let mut session = Session::start(process, stdin, events.clone());

    let outcome = tokio::select! {
        outcome = session.supervise() => Some(outcome),
        _ = cancel_rx => None,
    };

    session.teardown().await;

    match outcome {
        Some(terminal) => {
            info!(
                command = %session.process.command(),
                outcome = ?terminal,
                "task finished"
            );
            if events.send(terminal).await.is_err() {
                debug!("stream dropped before terminal event");
            }
        }
        None => {
            info!(command = %session.process.command(), "task cancelled");
        }
    }
}

/// Resources owned by one running launch.
struct Session {
    process: ProcessHandle,
    stdout: Option<JoinHandle<()>>,
    stderr: Option<JoinHandle<()>>,
    feeder: Option<JoinHandle<FeedOutcome>>,
    torn_down: bool,
}

impl Session {
    fn start(mut process: ProcessHandle, stdin: Option<StdinSource>, events: EventSender) -> Self {
        let stdout = process
            .take_stdout()
            .map(|pipe| tokio::spawn(read_pipe(pipe, Channel::StdOut, events.clone())));
        let stderr = process
            .take_stderr()
            .map(|pipe| tokio::spawn(read_pipe(pipe, Channel::StdErr, events)));

        let feeder = match (process.take_stdin(), stdin) {
            (Some(pipe), Some(source)) => Some(tokio::spawn(feed_stdin(pipe, source))),
            (pipe, None) => {
                // Closing right away keeps the child from waiting on input.
                drop(pipe);
                debug!(command = %process.command(), "no stdin source; stdin closed");
                None
            }
            (None, Some(_)) => {
                warn!(command = %process.command(), "stdin pipe unavailable; source ignored");
                None
            }
        };

        Self {
            process,
            stdout,
            stderr,
            feeder,
            torn_down: false,
        }
    }

    /// Wait for termination, then drain the readers.
    ///
    /// Handles stay in `self` while awaited so that a cancelled `supervise`
    /// still leaves them for `teardown` to abort.
    async fn supervise(&mut self) -> Result<TaskEvent, TaskError> {
        let termination = self.process.wait().await?;

        if let Some(feeder) = &self.feeder {
            if !feeder.is_finished() {
                debug!(command = %self.process.command(), "process exited before stdin source completed");
            }
            feeder.abort();
        }

        self.drain_readers().await;

        match termination {
            Termination::Exited(code) => Ok(TaskEvent::Exit { code }),
            Termination::Signaled(_) => Err(TaskError::UncaughtSignal),
        }
    }

    async fn drain_readers(&mut self) {
        for (channel, slot) in [
            (Channel::StdOut, &mut self.stdout),
            (Channel::StdErr, &mut self.stderr),
        ] {
            if let Some(reader) = slot.as_mut() {
                if let Err(e) = reader.await {
                    warn!(channel = channel.as_str(), error = %e, "pipe reader task failed");
                }
            }
            *slot = None;
        }
    }

    /// Release the child, both readers and the feeder. Idempotent.
    async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.process.kill().await;

        let handles = [self.stdout.take(), self.stderr.take()];
        for reader in handles.into_iter().flatten() {
            reader.abort();
            let _ = reader.await;
        }

        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
            match feeder.await {
                Ok(outcome) => debug!(?outcome, "stdin feeder stopped"),
                Err(e) if e.is_cancelled() => debug!("stdin feeder aborted"),
                Err(e) => warn!(error = %e, "stdin feeder task failed"),
            }
        }

        debug!(command = %self.process.command(), "teardown complete");
    }
}
