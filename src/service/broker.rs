use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, trace};

use crate::message::{Message, Topic};
use crate::{AppError, AppResult, BrokerConfig};

/// Partition count used when a publish targets a topic that does not exist yet.
pub const AUTO_CREATE_PARTITIONS: i32 = 1;

/// Registry of every topic, keyed by name.
///
/// The DashMap only guards inserting and looking up topics; the shard lock is
/// released before any partition is touched, so appends to different partitions
/// never contend on the registry. Each partition serializes its own appends.
#[derive(Debug, Default)]
pub struct Broker {
    topics: DashMap<String, Arc<Topic>>,
    config: BrokerConfig,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BrokerConfig) -> Self {
        Broker {
            topics: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Creates the topic if it does not exist yet.
    ///
    /// Creation is idempotent: when `name` is already registered the existing
    /// topic is returned untouched, whatever `partition_count` was asked for.
    pub fn create_topic(&self, name: &str, partition_count: i32) -> AppResult<Arc<Topic>> {
        // reject misuse even when the topic already exists
        if name.is_empty() || partition_count < 1 {
            return Err(AppError::InvalidArgument(format!(
                "create topic '{name}' with {partition_count} partitions"
            )));
        }

        match self.topics.entry(name.to_string()) {
            Entry::Occupied(entry) => {
                let topic = entry.get().clone();
                if topic.partition_count() != partition_count {
                    debug!(
                        "topic {} already exists with {} partitions, requested {}",
                        name,
                        topic.partition_count(),
                        partition_count
                    );
                }
                Ok(topic)
            }
            Entry::Vacant(entry) => {
                let topic = Arc::new(Topic::new(name, partition_count)?);
                entry.insert(topic.clone());
                info!("created topic {} with {} partitions", name, partition_count);
                Ok(topic)
            }
        }
    }

    pub fn get_topic(&self, name: &str) -> Option<Arc<Topic>> {
        self.topics.get(name).map(|entry| entry.value().clone())
    }

    fn get_or_create_topic(&self, name: &str) -> AppResult<Arc<Topic>> {
        match self.get_topic(name) {
            Some(topic) => Ok(topic),
            None => self.create_topic(name, AUTO_CREATE_PARTITIONS),
        }
    }

    /// Appends the message to `message.partition mod partition_count` of its topic.
    ///
    /// A missing topic is created with a single partition first. On success the
    /// assigned offset is written back into `message` and returned.
    pub fn publish(&self, message: &mut Message) -> AppResult<i64> {
        if message.payload.len() > self.config.max_message_bytes {
            return Err(AppError::AppendFailure(format!(
                "message of {} bytes exceeds max_message_bytes {} on topic {}",
                message.payload.len(),
                self.config.max_message_bytes,
                message.topic
            )));
        }

        let topic = self.get_or_create_topic(&message.topic)?;
        let partition = topic.partition_for(message.partition);
        message.partition = partition.id();

        let offset = partition.append(message.clone())?;
        message.offset = offset;
        trace!(
            "published message {} to {}@{}",
            message.id,
            partition.topic_partition(),
            offset
        );
        Ok(offset)
    }

    /// Names of every registered topic, sorted.
    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .topics
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Barrier;
    use std::thread;

    use super::*;

    #[test]
    fn test_create_topic_is_idempotent() -> AppResult<()> {
        let broker = Broker::new();
        let first = broker.create_topic("orders", 3)?;
        let second = broker.create_topic("orders", 5)?;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.partition_count(), 3);
        assert_eq!(broker.topic_count(), 1);
        Ok(())
    }

    #[test]
    fn test_create_topic_invalid_argument() {
        let broker = Broker::new();
        assert!(matches!(
            broker.create_topic("orders", 0),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            broker.create_topic("orders", -2),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            broker.create_topic("", 1),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(broker.get_topic("orders").is_none());
    }

    #[test]
    fn test_concurrent_create_topic() {
        const THREADS: usize = 16;
        let broker = Broker::new();
        let barrier = Barrier::new(THREADS);

        let topics: Vec<Arc<Topic>> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        broker.create_topic("t", 3).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(broker.topic_count(), 1);
        for topic in &topics {
            assert_eq!(topic.partition_count(), 3);
            assert!(Arc::ptr_eq(topic, &topics[0]));
        }
    }

    #[test]
    fn test_get_topic_missing() {
        let broker = Broker::new();
        assert!(broker.get_topic("nope").is_none());
    }

    #[test]
    fn test_publish_auto_creates_and_appends() -> AppResult<()> {
        let broker = Broker::new();
        let mut message = Message::new("events", 0, None, "hello");

        let offset = broker.publish(&mut message)?;
        assert_eq!(offset, 0);
        assert_eq!(message.offset, 0);

        let topic = broker.get_topic("events").unwrap();
        assert_eq!(topic.partition_count(), AUTO_CREATE_PARTITIONS);
        let stored = topic.partitions()[0].read_from(0);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, message.id);
        Ok(())
    }

    #[test]
    fn test_publish_wraps_partition() -> AppResult<()> {
        let broker = Broker::new();
        broker.create_topic("orders", 3)?;

        let mut message = Message::new("orders", 7, None, "x");
        broker.publish(&mut message)?;
        assert_eq!(message.partition, 1);

        let topic = broker.get_topic("orders").unwrap();
        assert_eq!(topic.partitions()[1].log_end_offset(), 1);
        assert_eq!(topic.partitions()[0].log_end_offset(), 0);
        assert_eq!(topic.partitions()[2].log_end_offset(), 0);
        Ok(())
    }

    #[test]
    fn test_publish_rejects_oversized_payload() {
        let broker = Broker::with_config(BrokerConfig {
            max_message_bytes: 4,
        });
        assert_eq!(broker.config().max_message_bytes, 4);
        let mut message = Message::new("orders", 0, None, "too large");
        assert!(matches!(
            broker.publish(&mut message),
            Err(AppError::AppendFailure(_))
        ));
        assert!(!message.is_appended());
    }

    #[test]
    fn test_partition_isolation_under_load() -> AppResult<()> {
        const PER_PARTITION: usize = 500;
        let broker = Broker::new();
        broker.create_topic("orders", 2)?;

        let offsets: Vec<(i32, i64)> = thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|writer| {
                    let broker = &broker;
                    s.spawn(move || {
                        let partition = writer % 2;
                        (0..PER_PARTITION / 2)
                            .map(|_| {
                                let mut message = Message::new("orders", partition, None, "p");
                                (partition, broker.publish(&mut message).unwrap())
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        for partition in 0..2 {
            let assigned: BTreeSet<i64> = offsets
                .iter()
                .filter(|(p, _)| *p == partition)
                .map(|(_, offset)| *offset)
                .collect();
            assert_eq!(assigned, (0..PER_PARTITION as i64).collect::<BTreeSet<_>>());
        }
        Ok(())
    }

    #[test]
    fn test_topic_names_sorted() -> AppResult<()> {
        let broker = Broker::new();
        broker.create_topic("b", 1)?;
        broker.create_topic("a", 1)?;
        assert_eq!(broker.topic_names(), vec!["a".to_string(), "b".to_string()]);
        Ok(())
    }
}
