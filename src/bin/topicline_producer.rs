//! topicline-producer: interactive topic producer
//!
//! Reads full lines from the operator and publishes each as a keyless
//! record to the topic, fire-and-forget. A line equal to `exit` ends the
//! session; queued records are flushed before the producer is released.
//!
//! ## Usage
//! `topicline-producer <topicName>`
//!
//! ## Configuration
//! - TOPICLINE_BROKERS: Kafka bootstrap servers (default: localhost:9092)
//! - TOPICLINE_LOG: log filter (default: info)

use topicline::broker::KafkaTopicSink;
use topicline::config::{bootstrap_servers_from_env, BrokerConfig};
use topicline::publisher;
use topicline::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let topic = match (args.next(), args.next()) {
        (Some(topic), None) => topic,
        _ => {
            eprintln!("Usage: topicline-producer <topicName>");
            std::process::exit(1);
        }
    };

    let config = BrokerConfig::producer(bootstrap_servers_from_env());
    let sink = KafkaTopicSink::connect(&config)?;

    println!("Enter message (type exit to quit)");
    publisher::run(tokio::io::stdin(), sink, &topic).await?;

    Ok(())
}
