// src/exec/stdin.rs

//! Stdin feeder: drains a lazy source of strings into the child's stdin.

use futures::stream::{BoxStream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Lazily produced stdin contents. An `Err` item ends feeding.
pub type StdinSource = BoxStream<'static, anyhow::Result<String>>;

/// Why feeding stopped. In every case stdin has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    SourceCompleted,
    SourceFailed,
    /// The child stopped reading (usually `BrokenPipe` after it exited).
    WriteFailed,
}

/// Write every item of `source` to `stdin` in order, then close it.
///
/// Failures are logged here and never propagated to the task.
pub async fn feed_stdin<W>(mut stdin: W, mut source: StdinSource) -> FeedOutcome
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0usize;

    let outcome = loop {
        let item = match source.next().await {
            None => break FeedOutcome::SourceCompleted,
            Some(Err(e)) => {
                warn!(error = %e, written, "stdin source failed; closing stdin");
                break FeedOutcome::SourceFailed;
            }
            Some(Ok(item)) => item,
        };

        if let Err(e) = write_item(&mut stdin, &item).await {
            debug!(error = %e, written, "stdin write failed; stopping feeder");
            break FeedOutcome::WriteFailed;
        }
        written += 1;
        debug!(written, len = item.len(), "fed stdin");
    };

    if let Err(e) = stdin.shutdown().await {
        debug!(error = %e, "closing stdin failed");
    }
    debug!(?outcome, written, "stdin feeder finished");
    outcome
}

async fn write_item<W: AsyncWrite + Unpin>(stdin: &mut W, item: &str) -> std::io::Result<()> {
    stdin.write_all(item.as_bytes()).await?;
    stdin.flush().await
}
