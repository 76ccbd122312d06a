//! In-memory broker endpoints for testing.
//!
//! Both mocks honor the same contracts as the Kafka implementations:
//! scripted batches are handed out immediately, and once the script is
//! exhausted the source behaves like a silent topic until woken.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::{
    wakeup_channel, BrokerError, PollBatch, Record, Result, TopicSink, TopicSource, Wakeup,
};

/// Mock topic source driven by a script of poll outcomes.
pub struct MockTopicSource {
    script: Mutex<VecDeque<Result<PollBatch>>>,
    subscribed: Arc<Mutex<Option<String>>>,
    closed: Arc<AtomicBool>,
    wakeup: Wakeup,
    wake_rx: watch::Receiver<bool>,
}

impl MockTopicSource {
    pub fn new() -> Self {
        let (wakeup, wake_rx) = wakeup_channel();
        Self {
            script: Mutex::new(VecDeque::new()),
            subscribed: Arc::new(Mutex::new(None)),
            closed: Arc::new(AtomicBool::new(false)),
            wakeup,
            wake_rx,
        }
    }

    /// Queue a batch of keyless records for a future `poll` to return.
    pub fn push_batch(&self, values: &[&str]) {
        let batch = values
            .iter()
            .map(|value| Record {
                key: None,
                value: (*value).to_string(),
            })
            .collect();
        self.script.lock().unwrap().push_back(Ok(batch));
    }

    /// Queue an error for a future `poll` to return.
    pub fn push_error(&self, error: BrokerError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// Probe that flips to true once `close` has run.
    pub fn closed_probe(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    /// Probe holding the topic passed to `subscribe`.
    pub fn subscribed_probe(&self) -> Arc<Mutex<Option<String>>> {
        Arc::clone(&self.subscribed)
    }
}

impl Default for MockTopicSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TopicSource for MockTopicSource {
    fn subscribe(&mut self, topic: &str) -> Result<()> {
        *self.subscribed.lock().unwrap() = Some(topic.to_string());
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Result<PollBatch> {
        let mut wake = self.wake_rx.clone();
        if *wake.borrow() {
            return Err(BrokerError::Interrupted);
        }

        if let Some(scripted) = self.script.lock().unwrap().pop_front() {
            return scripted;
        }

        // Silent topic: block until woken or the poll timeout elapses.
        tokio::select! {
            _ = wake.changed() => Err(BrokerError::Interrupted),
            _ = tokio::time::sleep(timeout) => Ok(PollBatch::new()),
        }
    }

    fn wakeup(&self) -> Wakeup {
        self.wakeup.clone()
    }

    fn close(self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Mock topic sink recording published lines.
pub struct MockTopicSink {
    published: Arc<Mutex<Vec<(String, String)>>>,
    closed: Arc<AtomicBool>,
    fail_on_publish: AtomicBool,
}

impl MockTopicSink {
    pub fn new() -> Self {
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            fail_on_publish: AtomicBool::new(false),
        }
    }

    pub fn set_fail_on_publish(&self, fail: bool) {
        self.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    /// Probe over the `(topic, value)` pairs published so far.
    pub fn published_probe(&self) -> Arc<Mutex<Vec<(String, String)>>> {
        Arc::clone(&self.published)
    }

    /// Probe that flips to true once `close` has run.
    pub fn closed_probe(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl Default for MockTopicSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicSink for MockTopicSink {
    fn publish(&self, topic: &str, value: &str) -> Result<()> {
        if self.fail_on_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::Publish("Mock publish failure".to_string()));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), value.to_string()));
        Ok(())
    }

    fn close(self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
