//! Broker connection configuration.
//!
//! Connection settings are fixed defaults plus one environment override;
//! neither binary takes flags beyond its positional arguments.

use rdkafka::ClientConfig;

/// Default Kafka bootstrap servers.
pub const DEFAULT_BOOTSTRAP_SERVERS: &str = "localhost:9092";

/// Environment variable overriding the bootstrap servers.
pub const BROKERS_ENV: &str = "TOPICLINE_BROKERS";

/// Client identity tag reported by the consumer.
const CONSUMER_CLIENT_ID: &str = "simple";

/// Bootstrap servers from the environment, falling back to the default.
pub fn bootstrap_servers_from_env() -> String {
    std::env::var(BROKERS_ENV).unwrap_or_else(|_| DEFAULT_BOOTSTRAP_SERVERS.to_string())
}

/// Configuration for one broker client.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// Kafka bootstrap servers (comma-separated).
    pub bootstrap_servers: String,
    /// Consumer group ID (consumers only).
    pub group_id: Option<String>,
}

impl BrokerConfig {
    /// Create config for publishing only.
    pub fn producer(bootstrap_servers: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            group_id: None,
        }
    }

    /// Create config for consuming under a group identity.
    pub fn consumer(bootstrap_servers: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            group_id: Some(group_id.into()),
        }
    }

    /// Build a ClientConfig for producers.
    pub fn build_producer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.bootstrap_servers);
        config.set("message.timeout.ms", "5000");
        config
    }

    /// Build a ClientConfig for consumers.
    ///
    /// Offset handling stays on the client's defaults (auto-commit); no
    /// commit or offset-reset keys are set here.
    pub fn build_consumer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.bootstrap_servers);
        config.set("client.id", CONSUMER_CLIENT_ID);

        if let Some(ref group_id) = self.group_id {
            config.set("group.id", group_id);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumer_config_identity() {
        let config = BrokerConfig::consumer("localhost:9092", "g1");
        let client_config = config.build_consumer_config();

        assert_eq!(client_config.get("bootstrap.servers"), Some("localhost:9092"));
        assert_eq!(client_config.get("group.id"), Some("g1"));
        assert_eq!(client_config.get("client.id"), Some("simple"));
    }

    #[test]
    fn test_consumer_config_keeps_offset_defaults() {
        let config = BrokerConfig::consumer("localhost:9092", "g1");
        let client_config = config.build_consumer_config();

        assert_eq!(client_config.get("enable.auto.commit"), None);
        assert_eq!(client_config.get("auto.offset.reset"), None);
    }

    #[test]
    fn test_producer_config() {
        let config = BrokerConfig::producer("broker-1:9092,broker-2:9092");
        assert!(config.group_id.is_none());

        let client_config = config.build_producer_config();
        assert_eq!(
            client_config.get("bootstrap.servers"),
            Some("broker-1:9092,broker-2:9092")
        );
        assert_eq!(client_config.get("message.timeout.ms"), Some("5000"));
    }
}
