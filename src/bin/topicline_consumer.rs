//! topicline-consumer: interactive topic consumer
//!
//! Subscribes to a topic under a consumer group and prints each newly
//! arrived record value to stdout, one per line, until the operator types
//! `exit`. Shutdown is cooperative: the background poll loop is woken,
//! joined, and its client released before the process exits.
//!
//! ## Usage
//! `topicline-consumer <topicName> <groupId>`
//!
//! ## Configuration
//! - TOPICLINE_BROKERS: Kafka bootstrap servers (default: localhost:9092)
//! - TOPICLINE_LOG: log filter (default: info)

use tracing::info;

use topicline::broker::KafkaTopicSource;
use topicline::config::{bootstrap_servers_from_env, BrokerConfig};
use topicline::control;
use topicline::subscription::{StdoutSink, SubscriptionLoop};
use topicline::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let (topic, group) = match (args.next(), args.next(), args.next()) {
        (Some(topic), Some(group), None) => (topic, group),
        _ => {
            eprintln!("Usage: topicline-consumer <topicName> <groupId>");
            std::process::exit(1);
        }
    };

    let config = BrokerConfig::consumer(bootstrap_servers_from_env(), group.as_str());
    let source = KafkaTopicSource::connect(&config)?;
    let handle = SubscriptionLoop::start(source, &topic, StdoutSink)?;

    info!(topic = %topic, group = %group, "Consumer started, type 'exit' to stop");

    let state = control::run(tokio::io::stdin(), handle).await?;
    info!(state = ?state, "Consumer finished");

    Ok(())
}
