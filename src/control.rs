//! Operator control channel for the consumer.
//!
//! Runs on the primary task: blocks on operator input, and on the exit
//! command (or end of input) drives the subscription loop through
//! request-stop and join, so the process never exits while the broker
//! client is still open.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{error, info};

use crate::subscription::{LoopState, SubscriptionHandle};
use crate::EXIT_COMMAND;

/// Read operator commands until told to stop, then shut the loop down.
///
/// Always requests a stop and joins the loop before returning, even when
/// the input source fails; an input error is reported and re-surfaced
/// only after the loop has fully exited.
pub async fn run<R>(input: R, handle: SubscriptionHandle) -> io::Result<LoopState>
where
    R: AsyncRead + Unpin,
{
    let result = wait_for_exit(input).await;
    if let Err(ref e) = result {
        error!(error = %e, "Operator input failed, shutting down");
    }

    handle.request_stop();
    info!("Stopping consumer");
    let state = handle.join().await;

    result.map(|()| state)
}

/// Scan whitespace-delimited tokens for the exit command. Tokens other
/// than the exact, case-sensitive command are ignored; end of input also
/// ends the session.
async fn wait_for_exit<R>(input: R) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();

    while let Some(line) = lines.next_line().await? {
        if line.split_whitespace().any(|token| token == EXIT_COMMAND) {
            return Ok(());
        }
    }

    Ok(())
}
