#![allow(dead_code)]

use std::process::Command;

use futures::StreamExt;
use taskstream::{TaskError, TaskEvent, TaskStream};

pub use taskstream_test_utils::{ScriptFile, init_tracing, with_timeout};

/// Every item of a launch, errors included, under the test timeout.
pub async fn collect_items(stream: TaskStream) -> Vec<Result<TaskEvent, TaskError>> {
    with_timeout(stream.collect::<Vec<_>>()).await
}

/// Split collected items into the events and the (at most one) error.
pub fn split_items(
    items: Vec<Result<TaskEvent, TaskError>>,
) -> (Vec<TaskEvent>, Option<TaskError>) {
    let mut events = Vec::new();
    let mut error = None;
    for item in items {
        match item {
            Ok(event) => events.push(event),
            Err(e) => {
                assert!(error.is_none(), "more than one error item: {e:?}");
                error = Some(e);
            }
        }
    }
    (events, error)
}

pub fn launch(command: &str) -> TaskEvent {
    TaskEvent::Launch {
        command: command.to_string(),
    }
}

/// True while `pid` names a live (or not yet reaped) process.
pub fn process_alive(pid: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("kill -0 {pid} 2>/dev/null"))
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
