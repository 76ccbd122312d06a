//! The consumer's poll/print loop.
//!
//! `SubscriptionLoop::start` subscribes a topic source and spawns the
//! poll cycle on a background task; the returned `SubscriptionHandle` is
//! the only thing other tasks touch. Cancellation is cooperative: a stop
//! request wakes the source, the in-flight or next poll aborts with the
//! distinguished interrupted error, and the loop releases the client
//! before its task exits. A batch already returned by a poll is always
//! written out in full; interruption is only observable at the next poll.

use std::io::{self, Write};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::broker::{BrokerError, Result, TopicSource, Wakeup};

/// Fixed poll timeout: the loop's one tuning knob. Bounds worst-case
/// shutdown latency on a silent topic.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Lifecycle of a subscription loop. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Created,
    Running,
    StopRequested,
    Stopped,
}

/// Destination for delivered record values, one per line.
pub trait OutputSink: Send {
    fn write_line(&mut self, value: &str) -> io::Result<()>;
}

/// Writes record values to stdout, flushing each line so output is
/// visible immediately when piped.
#[derive(Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write_line(&mut self, value: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(value.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

/// The poll/print cycle. Exclusively owns its topic source and lifecycle
/// state; other tasks interact through the [`SubscriptionHandle`].
pub struct SubscriptionLoop<C, S> {
    source: C,
    sink: S,
    state: LoopState,
}

impl<C, S> SubscriptionLoop<C, S>
where
    C: TopicSource + 'static,
    S: OutputSink + 'static,
{
    /// Subscribe `source` to `topic` and spawn the poll cycle on a
    /// background task. Returns immediately; subscribe failures surface
    /// here, before anything is spawned.
    pub fn start(mut source: C, topic: &str, sink: S) -> Result<SubscriptionHandle> {
        source.subscribe(topic)?;
        info!(topic = %topic, "Subscribed to topic");

        let wakeup = source.wakeup();
        let looper = SubscriptionLoop {
            source,
            sink,
            state: LoopState::Created,
        };
        let task = tokio::spawn(looper.run());

        Ok(SubscriptionHandle { wakeup, task })
    }

    async fn run(mut self) -> LoopState {
        self.state = LoopState::Running;

        match self.poll_print_cycle().await {
            BrokerError::Interrupted => info!("Wakeup received, stopping subscription loop"),
            e => error!(error = %e, "Subscription loop failed"),
        }

        self.state = LoopState::StopRequested;
        self.source.close();
        self.state = LoopState::Stopped;
        info!("Consumer connection released");

        self.state
    }

    /// Runs until the first error; the distinguished `Interrupted` error
    /// is the cooperative stop signal, anything else is fatal.
    async fn poll_print_cycle(&mut self) -> BrokerError {
        loop {
            let batch = match self.source.poll(POLL_TIMEOUT).await {
                Ok(batch) => batch,
                Err(e) => return e,
            };

            for record in batch {
                if let Err(e) = self.sink.write_line(&record.value) {
                    return BrokerError::Sink(e);
                }
            }
        }
    }
}

/// Non-owning handle to a running subscription loop.
pub struct SubscriptionHandle {
    wakeup: Wakeup,
    task: JoinHandle<LoopState>,
}

impl SubscriptionHandle {
    /// Ask the loop to stop. Safe to call at any point in the loop's
    /// lifecycle, any number of times.
    pub fn request_stop(&self) {
        self.wakeup.wake();
    }

    /// Wait until the loop has released its client and fully exited.
    ///
    /// An abnormal task end (panic or runtime cancellation) is reported
    /// and not retried; the client was released by the unwind either way.
    pub async fn join(self) -> LoopState {
        match self.task.await {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "Subscription loop ended abnormally");
                LoopState::Stopped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::broker::MockTopicSource;
    use crate::test_utils::{wait_until, CollectSink};

    #[tokio::test]
    async fn test_delivers_records_in_broker_order() {
        let source = MockTopicSource::new();
        source.push_batch(&["hello", "world"]);
        source.push_batch(&["again"]);
        let closed = source.closed_probe();

        let sink = CollectSink::new();
        let lines = sink.clone();

        let handle = SubscriptionLoop::start(source, "t1", sink).unwrap();
        wait_until(|| lines.lines().len() == 3).await;

        handle.request_stop();
        assert_eq!(handle.join().await, LoopState::Stopped);
        assert_eq!(lines.lines(), vec!["hello", "world", "again"]);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_subscribes_before_polling() {
        let source = MockTopicSource::new();
        let subscribed = source.subscribed_probe();

        let handle = SubscriptionLoop::start(source, "t1", CollectSink::new()).unwrap();
        assert_eq!(subscribed.lock().unwrap().as_deref(), Some("t1"));

        handle.request_stop();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_batch_in_hand_is_printed_in_full() {
        // Wake mid-batch, from inside the sink: every record of the batch
        // must still come out before the loop observes the interruption.
        struct WakingSink {
            inner: CollectSink,
            wakeup: Wakeup,
            woken: bool,
        }

        impl OutputSink for WakingSink {
            fn write_line(&mut self, value: &str) -> io::Result<()> {
                if !self.woken {
                    self.wakeup.wake();
                    self.woken = true;
                }
                self.inner.write_line(value)
            }
        }

        let source = MockTopicSource::new();
        source.push_batch(&["a", "b", "c"]);
        let sink = WakingSink {
            inner: CollectSink::new(),
            wakeup: source.wakeup(),
            woken: false,
        };
        let lines = sink.inner.clone();

        let handle = SubscriptionLoop::start(source, "t1", sink).unwrap();
        let state = tokio::time::timeout(Duration::from_secs(2), handle.join())
            .await
            .expect("loop did not stop");

        assert_eq!(state, LoopState::Stopped);
        assert_eq!(lines.lines(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_silent_topic_stops_within_poll_window() {
        let source = MockTopicSource::new();
        let closed = source.closed_probe();
        let sink = CollectSink::new();
        let lines = sink.clone();

        let handle = SubscriptionLoop::start(source, "t1", sink).unwrap();
        handle.request_stop();

        let state = tokio::time::timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("join did not return within the poll window");

        assert_eq!(state, LoopState::Stopped);
        assert!(lines.lines().is_empty());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_wake_before_first_poll_is_clean() {
        let source = MockTopicSource::new();
        let closed = source.closed_probe();
        source.wakeup().wake();

        let handle = SubscriptionLoop::start(source, "t1", CollectSink::new()).unwrap();
        let state = tokio::time::timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("loop did not stop");

        assert_eq!(state, LoopState::Stopped);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_request_stop_is_idempotent() {
        let source = MockTopicSource::new();
        let late_wakeup = source.wakeup();

        let handle = SubscriptionLoop::start(source, "t1", CollectSink::new()).unwrap();
        handle.request_stop();
        handle.request_stop();

        let state = tokio::time::timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("loop did not stop");
        assert_eq!(state, LoopState::Stopped);

        // Waking after the loop has stopped must not fault.
        late_wakeup.wake();
    }

    #[tokio::test]
    async fn test_fatal_poll_error_stops_loop() {
        let source = MockTopicSource::new();
        source.push_batch(&["one"]);
        source.push_error(BrokerError::Poll("broker went away".to_string()));
        let closed = source.closed_probe();

        let sink = CollectSink::new();
        let lines = sink.clone();

        let handle = SubscriptionLoop::start(source, "t1", sink).unwrap();
        let state = tokio::time::timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("loop did not stop on fatal error");

        assert_eq!(state, LoopState::Stopped);
        assert_eq!(lines.lines(), vec!["one"]);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_sink_failure_stops_loop() {
        let source = MockTopicSource::new();
        source.push_batch(&["first", "second"]);
        let closed = source.closed_probe();

        let sink = CollectSink::failing_after(1);
        let lines = sink.clone();

        let handle = SubscriptionLoop::start(source, "t1", sink).unwrap();
        let state = tokio::time::timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("loop did not stop on sink failure");

        assert_eq!(state, LoopState::Stopped);
        assert_eq!(lines.lines(), vec!["first"]);
        assert!(closed.load(Ordering::SeqCst));
    }
}
