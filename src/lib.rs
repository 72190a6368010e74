// src/lib.rs

//! Launch an external process and observe its whole lifecycle as one
//! ordered stream: `Launch`, interleaved `StdOut`/`StdErr` chunks, then a
//! single terminal `Exit` event or `TaskError`.

pub mod cli;
pub mod config;
pub mod errors;
pub mod event;
pub mod exec;
pub mod ext;
pub mod logging;
pub mod task;

pub use event::{Channel, TaskError, TaskEvent};
pub use exec::TaskStream;
pub use ext::TaskEventStreamExt;
pub use task::Task;

use std::path::PathBuf;

use futures::stream::{self, Stream, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate};
use crate::errors::Result;

/// Exit code reported when the run is interrupted with Ctrl-C.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task construction (trailing command or config file)
/// - optional stdin forwarding
/// - the exit-status policy
/// - relaying events to our own stdout/stderr
/// - Ctrl-C handling
///
/// Returns the exit code the CLI should finish with.
pub async fn run(args: CliArgs) -> Result<i32> {
    let (mut task, fail_on_nonzero) = build_task(&args)?;

    if args.stdin {
        task = task.stdin_fallible(stdin_lines());
    }

    info!(task = ?task, fail_on_nonzero, "launching task");

    let mut events = task.launch();
    let relayed = if fail_on_nonzero {
        relay((&mut events).fail_on_nonzero(), args.events).await
    } else {
        relay(&mut events, args.events).await
    };

    match relayed {
        Ok(Some(code)) => Ok(code),
        Ok(None) => {
            info!("interrupted; cancelling task");
            events.shutdown().await;
            Ok(INTERRUPTED_EXIT_CODE)
        }
        Err(e) => {
            events.shutdown().await;
            Err(e)
        }
    }
}

/// Build the task from the trailing command, falling back to the config
/// file. Returns the task and whether non-zero exits count as failure.
fn build_task(args: &CliArgs) -> Result<(Task, bool)> {
    if let Some((cmd, rest)) = args.command.split_first() {
        debug!(cmd = %cmd, args = ?rest, "using command from the command line");
        return Ok((Task::new(cmd).args(rest), !args.allow_nonzero));
    }

    let config_path = args
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)?;
    debug!(path = %config_path.display(), "loaded task config");

    if args.stdin && cfg.task.stdin.is_some() {
        warn!("--stdin overrides [task].stdin from the config file");
    }

    let fail_on_nonzero = cfg.config.fail_on_nonzero && !args.allow_nonzero;
    Ok((Task::from_config(&cfg.task), fail_on_nonzero))
}

/// Our own stdin as a stream of newline-terminated lines.
fn stdin_lines() -> impl Stream<Item = std::io::Result<String>> + Send + 'static {
    let lines = BufReader::new(tokio::io::stdin()).lines();
    stream::unfold(lines, |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((Ok(format!("{line}\n")), lines)),
            Ok(None) => None,
            Err(e) => Some((Err(e), lines)),
        }
    })
}

/// Relay events until the terminal one, or until Ctrl-C.
///
/// Returns the child's exit code, or `None` when interrupted. The caller
/// owns the stream and must shut it down on interruption.
async fn relay<S>(mut events: S, print_events: bool) -> Result<Option<i32>>
where
    S: Stream<Item = std::result::Result<TaskEvent, TaskError>> + Unpin,
{
    let mut out = tokio::io::stdout();
    let mut err = tokio::io::stderr();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut listening = true;

    loop {
        // Polling the signal first installs the handler before any output
        // is relayed.
        let item = tokio::select! {
            biased;
            res = &mut ctrl_c, if listening => match res {
                Ok(()) => return Ok(None),
                Err(e) => {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                    listening = false;
                    continue;
                }
            },
            item = events.next() => item,
        };

        match item {
            Some(Ok(event)) => {
                if print_events {
                    write_line(&mut out, &format!("{event:?}")).await?;
                } else {
                    relay_output(&event, &mut out, &mut err).await?;
                }
                if let TaskEvent::Exit { code } = event {
                    return Ok(Some(code));
                }
            }
            Some(Err(e)) => {
                write_line(&mut err, &format!("taskstream: {e}")).await?;
                return Ok(Some(e.exit_code()));
            }
            None => {
                warn!("event stream ended without a terminal event");
                return Ok(Some(1));
            }
        }
    }
}

async fn relay_output<O, E>(event: &TaskEvent, out: &mut O, err: &mut E) -> Result<()>
where
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    match event {
        TaskEvent::StdOut(chunk) => {
            out.write_all(chunk.as_bytes()).await?;
            out.flush().await?;
        }
        TaskEvent::StdErr(chunk) => {
            err.write_all(chunk.as_bytes()).await?;
            err.flush().await?;
        }
        TaskEvent::Launch { command } => debug!(command = %command, "task launched"),
        TaskEvent::Exit { code } => debug!(code, "task exited"),
    }
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(w: &mut W, line: &str) -> Result<()> {
    w.write_all(line.as_bytes()).await?;
    w.write_all(b"\n").await?;
    w.flush().await?;
    Ok(())
}
