use std::sync::Arc;

use bytes::Bytes;
use tracing::trace;

use crate::message::{Message, RecordMetadata};
use crate::{AppResult, Broker, ClientConfig, ProducerConfig, AUTO_CREATE_PARTITIONS};

use super::partitioner::{build_partitioner, Partitioner};

/// Write-side client. Holds no per-message state, only the broker handle and
/// the partitioning policy.
#[derive(Debug)]
pub struct Producer {
    broker: Arc<Broker>,
    client_config: ClientConfig,
    partitioner: Box<dyn Partitioner>,
}

impl Producer {
    pub fn new(broker: Arc<Broker>, client_config: ClientConfig, config: ProducerConfig) -> Self {
        let partitioner = build_partitioner(config.partition_strategy, config.fixed_partition);
        Self::with_partitioner(broker, client_config, partitioner)
    }

    pub fn with_partitioner(
        broker: Arc<Broker>,
        client_config: ClientConfig,
        partitioner: Box<dyn Partitioner>,
    ) -> Self {
        Producer {
            broker,
            client_config,
            partitioner,
        }
    }

    pub fn client_config(&self) -> &ClientConfig {
        &self.client_config
    }

    pub fn send(&self, topic: &str, payload: impl Into<Bytes>) -> AppResult<RecordMetadata> {
        self.send_record(topic, None, payload.into())
    }

    pub fn send_with_key(
        &self,
        topic: &str,
        key: impl Into<Bytes>,
        payload: impl Into<Bytes>,
    ) -> AppResult<RecordMetadata> {
        self.send_record(topic, Some(key.into()), payload.into())
    }

    /// No retries here: any broker error goes straight back to the caller.
    fn send_record(
        &self,
        topic: &str,
        key: Option<Bytes>,
        payload: Bytes,
    ) -> AppResult<RecordMetadata> {
        let topic_handle = match self.broker.get_topic(topic) {
            Some(existing) => existing,
            None => self.broker.create_topic(topic, AUTO_CREATE_PARTITIONS)?,
        };
        let partition = self.partitioner.partition(
            topic,
            key.as_deref(),
            topic_handle.partition_count(),
        );

        let mut message = Message::new(topic, partition, key, payload);
        self.broker.publish(&mut message)?;
        trace!(
            "sent message {} to {}-{} at offset {}",
            message.id,
            message.topic,
            message.partition,
            message.offset
        );
        Ok(RecordMetadata::from(&message))
    }
}
