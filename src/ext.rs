// src/ext.rs

//! Derived views over a task event stream.
//!
//! None of these hold state; they only reshape items. Errors always pass
//! through untouched.

use futures::future::{self, Ready};
use futures::stream::{FilterMap, Map, Stream, StreamExt};

use crate::event::{TaskError, TaskEvent};

type Item = Result<TaskEvent, TaskError>;

/// Stream returned by [`TaskEventStreamExt::fail_on_nonzero`].
pub type FailOnNonzero<S> = Map<S, fn(Item) -> Item>;

/// Stream returned by [`TaskEventStreamExt::just_exit_status`].
pub type JustExitStatus<S> = FilterMap<
    S,
    Ready<Option<Result<i32, TaskError>>>,
    fn(Item) -> Ready<Option<Result<i32, TaskError>>>,
>;

/// Stream returned by [`TaskEventStreamExt::just_output`].
pub type JustOutput<S> = FilterMap<
    S,
    Ready<Option<Result<String, TaskError>>>,
    fn(Item) -> Ready<Option<Result<String, TaskError>>>,
>;

/// Operators for any stream of `Result<TaskEvent, TaskError>`.
pub trait TaskEventStreamExt: Stream<Item = Item> + Sized {
    /// Turn `Exit { code }` with `code != 0` into `Err(TaskError::Exit { code })`.
    ///
    /// This is the caller-facing "non-zero is failure" policy; the core stream
    /// itself treats every normal exit as success.
    fn fail_on_nonzero(self) -> FailOnNonzero<Self> {
        self.map(check_status as fn(Item) -> Item)
    }

    /// Only the exit status.
    fn just_exit_status(self) -> JustExitStatus<Self> {
        self.filter_map(exit_status as fn(Item) -> Ready<Option<Result<i32, TaskError>>>)
    }

    /// Only the output text, stdout and stderr combined in emitted order.
    fn just_output(self) -> JustOutput<Self> {
        self.filter_map(output as fn(Item) -> Ready<Option<Result<String, TaskError>>>)
    }
}

impl<S> TaskEventStreamExt for S where S: Stream<Item = Item> + Sized {}

fn check_status(item: Item) -> Item {
    match item {
        Ok(TaskEvent::Exit { code }) if code != 0 => Err(TaskError::Exit { code }),
        other => other,
    }
}

fn exit_status(item: Item) -> Ready<Option<Result<i32, TaskError>>> {
    future::ready(match item {
        Ok(event) => event.exit_status().map(Ok),
        Err(e) => Some(Err(e)),
    })
}

fn output(item: Item) -> Ready<Option<Result<String, TaskError>>> {
    future::ready(match item {
        Ok(TaskEvent::StdOut(chunk)) | Ok(TaskEvent::StdErr(chunk)) => Some(Ok(chunk)),
        Ok(_) => None,
        Err(e) => Some(Err(e)),
    })
}
