use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{AppError, AppResult};

/// Environment variables prefixed with this override file values,
/// e.g. `MEMQ__CONSUMER__POLL_INTERVAL_MS=20`.
pub const ENV_PREFIX: &str = "MEMQ";

/// Settings shared by producers and consumers.
///
/// `brokers` is reserved for a transport layer and unused in-process.
/// `group_id` is carried for diagnostics; consumers do not coordinate.
/// `auto_commit` must stay `true`: cursors always advance on delivery.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub brokers: Vec<String>,
    pub group_id: String,
    pub auto_commit: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            group_id: String::new(),
            auto_commit: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub max_message_bytes: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: 1_048_576,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStrategy {
    #[default]
    Fixed,
    RoundRobin,
    KeyHash,
    Random,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub partition_strategy: PartitionStrategy,
    /// target partition for the `fixed` strategy
    pub fixed_partition: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub poll_interval_ms: u64,
    /// capacity of each subscription's delivery queue
    pub queue_capacity: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            queue_capacity: 100,
        }
    }
}

impl ConsumerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.queue_capacity == 0 {
            return Err(AppError::InvalidValue(
                "consumer.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(AppError::InvalidValue(
                "consumer.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub broker: BrokerConfig,
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
}

impl AppConfig {
    pub fn set_up_config<P: AsRef<Path>>(path: P) -> AppResult<AppConfig> {
        let path_str = path.as_ref().to_str().ok_or(AppError::InvalidValue(format!(
            "config file path: {}",
            path.as_ref().to_string_lossy()
        )))?;
        let config = config::Config::builder()
            .add_source(config::File::with_name(path_str))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.consumer.validate()?;
        if self.producer.fixed_partition < 0 {
            return Err(AppError::InvalidValue(format!(
                "producer.fixed_partition: {}",
                self.producer.fixed_partition
            )));
        }
        Ok(())
    }
}
