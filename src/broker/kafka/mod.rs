//! Kafka broker endpoints.
//!
//! The consumer wraps a `StreamConsumer`; cancellation is delivered by
//! selecting the wakeup channel against the receive future, so a wake
//! aborts a poll that would otherwise stay blocked on a silent topic.
//! The producer wraps a `FutureProducer` and enqueues without awaiting
//! delivery.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tokio::sync::watch;
use tracing::{info, warn};

use super::{
    wakeup_channel, BrokerError, PollBatch, Record, Result, TopicSink, TopicSource, Wakeup,
};
use crate::config::BrokerConfig;

/// Upper bound on records drained into one batch, matching the broker
/// client's conventional max-poll-records default.
const MAX_BATCH_RECORDS: usize = 500;

/// How long `close` waits for queued records to reach the broker.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Kafka consumer bound to one topic and one group identity.
pub struct KafkaTopicSource {
    consumer: StreamConsumer,
    wakeup: Wakeup,
    wake_rx: watch::Receiver<bool>,
}

impl KafkaTopicSource {
    /// Create a consumer from `config`. Fails fast if the client cannot be
    /// constructed; broker reachability surfaces later from `poll`.
    pub fn connect(config: &BrokerConfig) -> Result<Self> {
        let consumer: StreamConsumer = config
            .build_consumer_config()
            .create()
            .map_err(|e| BrokerError::Connection(format!("Failed to create consumer: {}", e)))?;

        info!(bootstrap_servers = %config.bootstrap_servers, "Connected to Kafka");

        let (wakeup, wake_rx) = wakeup_channel();
        Ok(Self {
            consumer,
            wakeup,
            wake_rx,
        })
    }
}

#[async_trait]
impl TopicSource for KafkaTopicSource {
    fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.consumer
            .subscribe(&[topic])
            .map_err(|e| BrokerError::Subscribe(format!("Failed to subscribe to {}: {}", topic, e)))
    }

    async fn poll(&mut self, timeout: Duration) -> Result<PollBatch> {
        let mut wake = self.wake_rx.clone();
        if *wake.borrow() {
            return Err(BrokerError::Interrupted);
        }

        let first = tokio::select! {
            _ = wake.changed() => return Err(BrokerError::Interrupted),
            received = tokio::time::timeout(timeout, self.consumer.recv()) => received,
        };

        let mut batch = PollBatch::new();
        match first {
            // Timeout elapsed: no new data, a valid empty batch.
            Err(_) => return Ok(batch),
            Ok(Err(e)) => return Err(BrokerError::Poll(e.to_string())),
            Ok(Ok(message)) => batch.extend(record_from(&message)),
        }

        // Drain records the client has already buffered, without waiting.
        while batch.len() < MAX_BATCH_RECORDS {
            match tokio::time::timeout(Duration::ZERO, self.consumer.recv()).await {
                Ok(Ok(message)) => batch.extend(record_from(&message)),
                Ok(Err(e)) => return Err(BrokerError::Poll(e.to_string())),
                Err(_) => break,
            }
        }

        Ok(batch)
    }

    fn wakeup(&self) -> Wakeup {
        self.wakeup.clone()
    }

    fn close(self) {
        // librdkafka tears the consumer down on drop
        drop(self.consumer);
    }
}

/// Copy a delivered message into the crate's record model. Messages with
/// no payload carry nothing printable and are skipped.
fn record_from<M: Message>(message: &M) -> Option<Record> {
    let payload = match message.payload() {
        Some(payload) => payload,
        None => {
            warn!("Received message with no payload, skipping");
            return None;
        }
    };

    Some(Record {
        key: message.key().map(<[u8]>::to_vec),
        value: String::from_utf8_lossy(payload).into_owned(),
    })
}

/// Kafka producer publishing operator lines.
pub struct KafkaTopicSink {
    producer: FutureProducer,
}

impl KafkaTopicSink {
    /// Create a producer from `config`.
    pub fn connect(config: &BrokerConfig) -> Result<Self> {
        let producer: FutureProducer = config
            .build_producer_config()
            .create()
            .map_err(|e| BrokerError::Connection(format!("Failed to create producer: {}", e)))?;

        info!(bootstrap_servers = %config.bootstrap_servers, "Connected to Kafka");

        Ok(Self { producer })
    }
}

impl TopicSink for KafkaTopicSink {
    fn publish(&self, topic: &str, value: &str) -> Result<()> {
        let record = FutureRecord::<(), str>::to(topic).payload(value);

        match self.producer.send_result(record) {
            // Fire-and-forget: the delivery future is intentionally dropped.
            Ok(_delivery) => Ok(()),
            Err((e, _record)) => Err(BrokerError::Publish(e.to_string())),
        }
    }

    fn close(self) {
        if let Err(e) = self.producer.flush(FLUSH_TIMEOUT) {
            warn!(error = %e, "Failed to flush producer before close");
        }
    }
}
