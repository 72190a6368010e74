// src/exec/reader.rs

//! Pipe reader: turns a child's stdout or stderr into chunk events.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::event::{Channel, TaskError, TaskEvent};

use super::decode::Utf8ChunkDecoder;

/// Bytes requested from the pipe per wake-up.
pub const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Sending half of the multiplexed event channel.
pub type EventSender = mpsc::Sender<Result<TaskEvent, TaskError>>;

/// Read `pipe` until end-of-file, sending one event per non-empty decoded
/// chunk.
///
/// Read errors are logged and treated as end-of-file. Returns early without
/// flushing if the receiving side is gone.
pub async fn read_pipe<R>(mut pipe: R, channel: Channel, events: EventSender)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut decoder = Utf8ChunkDecoder::new();

    loop {
        let n = match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(channel = channel.as_str(), error = %e, "pipe read failed; treating as end of stream");
                break;
            }
        };

        trace!(channel = channel.as_str(), bytes = n, "pipe readable");
        let chunk = decoder.push(&buf[..n]);
        if !emit(&events, channel, chunk).await {
            debug!(channel = channel.as_str(), "event receiver dropped; reader stopping");
            return;
        }
    }

    let rest = decoder.finish();
    emit(&events, channel, rest).await;
    debug!(channel = channel.as_str(), "pipe reached end of file");
}

/// Returns `false` once nobody is listening any more.
async fn emit(events: &EventSender, channel: Channel, chunk: String) -> bool {
    if chunk.is_empty() {
        return true;
    }
    debug!(channel = channel.as_str(), len = chunk.len(), "output chunk");
    events.send(Ok(channel.event(chunk))).await.is_ok()
}
