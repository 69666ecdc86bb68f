pub use app_error::{AppError, AppResult};
pub use broker::{Broker, AUTO_CREATE_PARTITIONS};
pub use config::{
    AppConfig, BrokerConfig, ClientConfig, ConsumerConfig, PartitionStrategy, ProducerConfig,
    ENV_PREFIX,
};
pub use shutdown::Shutdown;
pub use tracing_config::{setup_local_tracing, setup_tracing};

mod app_error;
mod broker;
mod config;
mod shutdown;
mod tracing_config;
