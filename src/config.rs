//! Node configuration.

use crate::topology::PipelineTopics;
use std::str::FromStr;
use std::time::Duration;

/// Settings for one pipeline node.
///
/// # Environment
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | ORDER_NODE_HOST | 127.0.0.1 | Host advertised to peers |
/// | ORDER_NODE_PORT | 8080 | Query endpoint port |
/// | ORDER_PARTITIONS | 4 | Partitions per topic |
/// | ORDER_PROCESSING_DELAY_MS | 5000 | Router pause per record |
/// | ORDER_QUERY_TIMEOUT_MS | 5000 | Bound on a status query |
/// | ORDER_SHARD_BUFFER | 64 | Status shard mailbox size |
/// | ORDER_TOPIC_PREFIX | orders | Prefix of every topic name |
///
/// Unset or unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub partitions: u32,
    pub processing_delay_ms: u64,
    pub query_timeout_ms: u64,
    pub shard_buffer: usize,
    pub topic_prefix: String,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl NodeConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("ORDER_NODE_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env_or("ORDER_NODE_PORT", 8080),
            partitions: env_or("ORDER_PARTITIONS", 4),
            processing_delay_ms: env_or("ORDER_PROCESSING_DELAY_MS", 5000),
            query_timeout_ms: env_or("ORDER_QUERY_TIMEOUT_MS", 5000),
            shard_buffer: env_or("ORDER_SHARD_BUFFER", 64),
            topic_prefix: std::env::var("ORDER_TOPIC_PREFIX").unwrap_or_else(|_| "orders".into()),
        }
    }

    /// Environment settings with the node address replaced. Used by tests.
    pub fn with_overrides(host: impl Into<String>, port: u16) -> Self {
        let mut config = Self::from_env();
        config.host = host.into();
        config.port = port;
        config
    }

    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn topics(&self) -> PipelineTopics {
        PipelineTopics::with_prefix(&self.topic_prefix)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparseable_values_fall_back() {
        assert_eq!(env_or("ORDER_TEST_UNSET_VARIABLE", 7u32), 7);
    }

    #[test]
    fn overrides_replace_the_address() {
        let config = NodeConfig::with_overrides("10.0.0.5", 9001);
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 9001);
    }
}
