//! Broker client seam.
//!
//! This module contains:
//! - `TopicSource` trait: consumer-side polling with a cross-context wakeup
//! - `TopicSink` trait: producer-side fire-and-forget publishing
//! - `Record` / `PollBatch`: the delivered-message data model
//! - Implementations: Kafka (rdkafka), Mock

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

// Implementation modules
pub mod kafka;
pub mod mock;

// Re-exports
pub use kafka::{KafkaTopicSink, KafkaTopicSource};
pub use mock::{MockTopicSink, MockTopicSource};

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Errors that can occur on the broker seam.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Subscribe failed: {0}")]
    Subscribe(String),

    #[error("Poll failed: {0}")]
    Poll(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    /// Distinguished stop signal: a wakeup aborted a blocked poll.
    /// Expected during shutdown, never a fault.
    #[error("Poll interrupted by wakeup")]
    Interrupted,

    #[error("Output sink failed: {0}")]
    Sink(#[from] std::io::Error),
}

/// A single delivered record: optional raw key, UTF-8 value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: Option<Vec<u8>>,
    pub value: String,
}

/// Records returned by one `poll` call, in broker delivery order. Empty
/// means no new data arrived within the poll timeout.
pub type PollBatch = Vec<Record>;

/// Cross-context interrupt for a blocked `poll` call.
///
/// Cloneable and idempotent; waking before the first poll or after the
/// owning client has been released is a no-op.
#[derive(Clone)]
pub struct Wakeup {
    tx: Arc<watch::Sender<bool>>,
}

impl Wakeup {
    /// Abort the in-flight or next `poll` with [`BrokerError::Interrupted`].
    pub fn wake(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a wakeup handle and the receiver a `poll` implementation selects
/// against.
pub(crate) fn wakeup_channel() -> (Wakeup, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (Wakeup { tx: Arc::new(tx) }, rx)
}

/// Consumer-side broker client: one topic subscription, bounded-wait
/// polling, and a wakeup that aborts a blocked poll from another task.
#[async_trait]
pub trait TopicSource: Send {
    /// Subscribe to a topic. Must be called once before the first `poll`.
    fn subscribe(&mut self, topic: &str) -> Result<()>;

    /// Wait up to `timeout` for the next batch of records. Returns
    /// [`BrokerError::Interrupted`] once the source has been woken.
    async fn poll(&mut self, timeout: Duration) -> Result<PollBatch>;

    /// Interrupt handle for this source, callable from other tasks.
    fn wakeup(&self) -> Wakeup;

    /// Release the underlying client.
    fn close(self);
}

/// Producer-side broker client.
pub trait TopicSink: Send {
    /// Enqueue `value` for delivery to `topic`. Fire-and-forget: does not
    /// wait for or report broker acknowledgment.
    fn publish(&self, topic: &str, value: &str) -> Result<()>;

    /// Flush whatever is still queued and release the client.
    fn close(self);
}
