// tests/cancellation.rs
mod common;
use crate::common::{ScriptFile, init_tracing, launch, process_alive, with_timeout};

use std::error::Error;
use std::time::Duration;

use futures::{StreamExt, stream};
use taskstream::{TaskError, TaskEvent};

type TestResult = Result<(), Box<dyn Error>>;

async fn wait_until_dead(pid: &str) {
    for _ in 0..100 {
        if !process_alive(pid) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("process {pid} still alive after cancellation");
}

async fn next_event(stream: &mut taskstream::TaskStream) -> TaskEvent {
    match with_timeout(stream.next()).await {
        Some(Ok(event)) => event,
        other => panic!("expected an event, got {other:?}"),
    }
}

#[tokio::test]
async fn dropping_the_stream_kills_the_child() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["echo $$", "exec sleep 30"])?;
    let mut stream = script.task().launch();

    assert_eq!(next_event(&mut stream).await, launch("sh"));
    let pid = match next_event(&mut stream).await {
        TaskEvent::StdOut(chunk) => chunk.trim().to_string(),
        other => panic!("expected pid on stdout, got {other:?}"),
    };
    assert!(process_alive(&pid));

    drop(stream);

    wait_until_dead(&pid).await;
    Ok(())
}

#[tokio::test]
async fn cancel_ends_stream_without_terminal_event() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["echo $$", "exec sleep 30"])?;
    let mut stream = script.task().launch();

    assert_eq!(next_event(&mut stream).await, launch("sh"));
    let pid = match next_event(&mut stream).await {
        TaskEvent::StdOut(chunk) => chunk.trim().to_string(),
        other => panic!("expected pid on stdout, got {other:?}"),
    };

    stream.cancel();

    let rest: Vec<Result<TaskEvent, TaskError>> = with_timeout(stream.collect()).await;
    assert!(
        rest.iter().all(|item| matches!(item, Ok(event) if !event.is_terminal())),
        "no terminal item after cancel, got {rest:?}"
    );

    wait_until_dead(&pid).await;
    Ok(())
}

#[tokio::test]
async fn pending_stdin_source_does_not_outlive_the_process() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["exit 3"])?;
    let task = script.task().stdin(stream::pending::<String>());

    let events = with_timeout(task.launch().collect::<Vec<_>>()).await;
    let last = events.last().expect("terminal item");
    assert!(matches!(last, Ok(TaskEvent::Exit { code: 3 })), "got {last:?}");
    Ok(())
}

#[tokio::test]
async fn endless_stdin_source_stops_when_process_exits() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["head -n 2", "exit 0"])?;
    let task = script.task().stdin(stream::repeat("line\n".to_string()));

    let events = with_timeout(task.run()).await?;
    assert_eq!(events.first(), Some(&launch("sh")));
    assert_eq!(events.last(), Some(&TaskEvent::Exit { code: 0 }));

    let output: String = events.iter().filter_map(|e| e.output()).collect();
    assert_eq!(output, "line\nline\n");
    Ok(())
}

#[tokio::test]
async fn failing_stdin_source_closes_stdin_without_failing_task() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["cat"])?;
    let source = stream::iter(vec![
        Ok("kept\n".to_string()),
        Err(std::io::Error::other("source broke")),
        Ok("dropped\n".to_string()),
    ]);

    let events = with_timeout(script.task().stdin_fallible(source).run()).await?;

    let output: String = events.iter().filter_map(|e| e.output()).collect();
    assert_eq!(output, "kept\n");
    assert_eq!(events.last(), Some(&TaskEvent::Exit { code: 0 }));
    Ok(())
}

#[tokio::test]
async fn missing_stdin_source_closes_stdin_immediately() -> TestResult {
    init_tracing();

    // `cat` would block forever if stdin stayed open.
    let script = ScriptFile::new(["cat", "echo done"])?;
    let events = with_timeout(script.task().run()).await?;

    assert_eq!(
        events,
        vec![
            launch("sh"),
            TaskEvent::StdOut("done\n".into()),
            TaskEvent::Exit { code: 0 },
        ]
    );
    Ok(())
}
