mod client;
mod log;
mod message;
mod service;

pub use client::{
    build_partitioner, Consumer, FixedPartitioner, KeyHashPartitioner, Partitioner,
    Producer, RandomPartitioner, RoundRobinPartitioner,
};
pub use log::{Log, NO_OFFSET};
pub use message::{Message, Partition, RecordMetadata, Topic, TopicPartition};
pub use service::{
    setup_local_tracing, setup_tracing, AppConfig, AppError, AppResult, Broker, BrokerConfig,
    ClientConfig, ConsumerConfig, PartitionStrategy, ProducerConfig, Shutdown,
    AUTO_CREATE_PARTITIONS, ENV_PREFIX,
};
