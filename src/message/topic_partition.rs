use std::fmt::{Display, Formatter};

use parking_lot::RwLock;
use tracing::trace;

use crate::log::Log;
use crate::AppResult;

use super::Message;

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl Display for TopicPartition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }

    pub fn id(&self) -> String {
        format!("{}-{}", self.topic, self.partition)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }
}

/// One ordered, append-only subdivision of a topic.
///
/// Appends take the write lock for the whole offset assignment, so two
/// concurrent appends can never observe the same log length. Reads take
/// the read lock and copy out a snapshot.
#[derive(Debug)]
pub struct Partition {
    topic_partition: TopicPartition,
    log: RwLock<Log>,
}

impl Partition {
    pub fn new(topic_partition: TopicPartition) -> Self {
        Self {
            topic_partition,
            log: RwLock::new(Log::new()),
        }
    }

    pub fn id(&self) -> i32 {
        self.topic_partition.partition
    }

    pub fn topic_partition(&self) -> &TopicPartition {
        &self.topic_partition
    }

    /// Appends a message and returns the offset it was assigned.
    pub fn append(&self, message: Message) -> AppResult<i64> {
        let mut log = self.log.write();
        let offset = log.append(message)?;
        trace!(
            "message appended to {}, offset: {}, total messages: {}",
            self.topic_partition,
            offset,
            log.len()
        );
        Ok(offset)
    }

    /// Snapshot of every message at or after `offset`.
    pub fn read_from(&self, offset: i64) -> Vec<Message> {
        self.log.read().read_from(offset).to_vec()
    }

    pub fn log_end_offset(&self) -> i64 {
        self.log.read().log_end_offset()
    }
}
