//! Operator publish loop for the producer.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::warn;

use crate::broker::TopicSink;
use crate::EXIT_COMMAND;

/// Read operator lines and publish each to `topic` until a line equal to
/// the exit command, or end of input. Releases the input first, then the
/// sink.
///
/// Publishing is fire-and-forget: an enqueue failure is logged and the
/// line dropped, with no retry and no per-message delivery confirmation.
pub async fn run<R, S>(input: R, sink: S, topic: &str) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    S: TopicSink,
{
    let mut lines = BufReader::new(input).lines();

    while let Some(line) = lines.next_line().await? {
        if line == EXIT_COMMAND {
            break;
        }
        if let Err(e) = sink.publish(topic, &line) {
            warn!(error = %e, "Publish failed, dropping line");
        }
    }

    drop(lines);
    sink.close();
    Ok(())
}
