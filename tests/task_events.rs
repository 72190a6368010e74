// tests/task_events.rs
mod common;
use crate::common::{ScriptFile, collect_items, init_tracing, launch, split_items, with_timeout};

use std::error::Error;

use futures::StreamExt;
use taskstream::{Task, TaskError, TaskEvent, TaskEventStreamExt};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn stdout_line_then_clean_exit() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["echo hello world", "sleep 0.1"])?;
    let events = with_timeout(script.task().run()).await?;

    assert_eq!(
        events,
        vec![
            launch("sh"),
            TaskEvent::StdOut("hello world\n".into()),
            TaskEvent::Exit { code: 0 },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn stderr_line_then_clean_exit() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["echo hello world 1>&2", "sleep 0.1"])?;
    let events = with_timeout(script.task().run()).await?;

    assert_eq!(
        events,
        vec![
            launch("sh"),
            TaskEvent::StdErr("hello world\n".into()),
            TaskEvent::Exit { code: 0 },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_fails_run_with_status() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["exit 100"])?;
    let result = with_timeout(script.task().run()).await;

    match result {
        Err(TaskError::Exit { code }) => assert_eq!(code, 100),
        other => panic!("expected TaskError::Exit(100), got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_is_a_plain_event_on_the_core_stream() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["exit 100"])?;
    let (events, error) = split_items(collect_items(script.task().launch()).await);

    assert!(error.is_none(), "core stream must not fail on exit codes");
    assert_eq!(events, vec![launch("sh"), TaskEvent::Exit { code: 100 }]);
    Ok(())
}

#[tokio::test]
async fn uncaught_signal_fails_the_stream() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["kill $$", "sleep 10"])?;
    let (events, error) = split_items(collect_items(script.task().launch()).await);

    assert!(matches!(error, Some(TaskError::UncaughtSignal)), "got {error:?}");
    assert_eq!(events, vec![launch("sh")], "no exit event after a signal");
    Ok(())
}

#[tokio::test]
async fn output_before_a_signal_precedes_the_error() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["echo before", "echo err 1>&2", "kill $$", "sleep 10"])?;
    let items = collect_items(script.task().launch()).await;

    assert_eq!(items.len(), 4, "got {items:?}");
    assert!(matches!(items.first(), Some(Ok(event)) if *event == launch("sh")));
    assert!(
        matches!(items.last(), Some(Err(TaskError::UncaughtSignal))),
        "error must come last, got {items:?}"
    );

    let (events, _) = split_items(items);
    let stdout: Vec<&TaskEvent> = events
        .iter()
        .filter(|e| matches!(e, TaskEvent::StdOut(_)))
        .collect();
    let stderr: Vec<&TaskEvent> = events
        .iter()
        .filter(|e| matches!(e, TaskEvent::StdErr(_)))
        .collect();
    assert_eq!(stdout, vec![&TaskEvent::StdOut("before\n".into())]);
    assert_eq!(stderr, vec![&TaskEvent::StdErr("err\n".into())]);
    Ok(())
}

#[tokio::test]
async fn uncaught_signal_fails_run() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["kill -9 $$"])?;
    let result = with_timeout(script.task().run()).await;

    assert!(matches!(result, Err(TaskError::UncaughtSignal)), "got {result:?}");
    Ok(())
}

#[tokio::test]
async fn stdin_lines_are_echoed_in_order() -> TestResult {
    init_tracing();

    let script = ScriptFile::new([
        "read var1",
        "echo $var1",
        "sleep 0.1",
        "read var2",
        "echo $var2",
        "sleep 0.1",
    ])?;

    let stdin = futures::stream::iter(vec!["hello\n".to_string(), "world\n".to_string()]);
    let events = with_timeout(script.task().stdin(stdin).run()).await?;

    assert_eq!(
        events,
        vec![
            launch("sh"),
            TaskEvent::StdOut("hello\n".into()),
            TaskEvent::StdOut("world\n".into()),
            TaskEvent::Exit { code: 0 },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn stdout_and_stderr_interleave_in_write_order() -> TestResult {
    init_tracing();

    let script = ScriptFile::new([
        "echo out1",
        "sleep 0.1",
        "echo err1 1>&2",
        "sleep 0.1",
        "echo out2",
    ])?;
    let events = with_timeout(script.task().run()).await?;

    assert_eq!(
        events,
        vec![
            launch("sh"),
            TaskEvent::StdOut("out1\n".into()),
            TaskEvent::StdErr("err1\n".into()),
            TaskEvent::StdOut("out2\n".into()),
            TaskEvent::Exit { code: 0 },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn args_and_env_reach_the_child() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["echo \"$1-$2-$GREETING\""])?;
    let output: Vec<String> = with_timeout(
        script
            .task()
            .args(["first", "second"])
            .env("GREETING", "hi")
            .launch()
            .just_output()
            .collect::<Vec<_>>(),
    )
    .await
    .into_iter()
    .collect::<Result<_, _>>()?;

    assert_eq!(output.concat(), "first-second-hi\n");
    Ok(())
}

#[tokio::test]
async fn large_output_is_fully_drained_before_exit() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["head -c 200000 /dev/zero | tr '\\0' 'a'"])?;
    let events = with_timeout(script.task().run()).await?;

    let (first, rest) = events.split_first().expect("launch event");
    let (last, chunks) = rest.split_last().expect("exit event");
    assert_eq!(first, &launch("sh"));
    assert_eq!(last, &TaskEvent::Exit { code: 0 });

    let text: String = chunks
        .iter()
        .map(|e| match e {
            TaskEvent::StdOut(chunk) => chunk.as_str(),
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(text.len(), 200_000);
    assert!(text.bytes().all(|b| b == b'a'));
    Ok(())
}

#[tokio::test]
async fn multibyte_output_survives_decoding() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["printf 'h\\303\\251llo \\342\\202\\254\\n'"])?;
    let output: Vec<String> = with_timeout(script.task().launch().just_output().collect::<Vec<_>>())
        .await
        .into_iter()
        .collect::<Result<_, _>>()?;

    assert_eq!(output.concat(), "héllo €\n");
    Ok(())
}

#[tokio::test]
async fn exactly_one_launch_and_one_terminal_then_fused() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["echo a", "echo b 1>&2", "exit 3"])?;
    let mut stream = script.task().launch();

    let mut items = Vec::new();
    while let Some(item) = with_timeout(stream.next()).await {
        items.push(item);
    }
    // Polling past the end keeps yielding nothing.
    assert!(stream.next().await.is_none());

    let (events, error) = split_items(items);
    assert!(error.is_none());
    assert_eq!(
        events.iter().filter(|e| matches!(e, TaskEvent::Launch { .. })).count(),
        1
    );
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert_eq!(events.first(), Some(&launch("sh")));
    assert_eq!(events.last(), Some(&TaskEvent::Exit { code: 3 }));
    Ok(())
}

#[tokio::test]
async fn just_exit_status_reports_code() -> TestResult {
    init_tracing();

    let script = ScriptFile::new(["echo noise", "exit 5"])?;
    let codes: Vec<_> = with_timeout(script.task().launch().just_exit_status().collect::<Vec<_>>()).await;

    assert_eq!(codes.len(), 1);
    assert!(matches!(codes[0], Ok(5)));
    Ok(())
}

#[tokio::test]
async fn launch_requires_only_the_task_value() -> TestResult {
    init_tracing();

    // `launch` consumes the task; a second launch needs a fresh value.
    let make = || Task::new("sh").args(["-c", "echo again"]);
    for _ in 0..2 {
        let events = with_timeout(make().run()).await?;
        assert_eq!(events[1], TaskEvent::StdOut("again\n".into()));
    }
    Ok(())
}
