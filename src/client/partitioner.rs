use std::fmt::Debug;
use std::sync::atomic::{AtomicU32, Ordering};

use rand::Rng;

use crate::PartitionStrategy;

/// Picks the partition a produced message is sent to.
pub trait Partitioner: Debug + Send + Sync {
    /// `partition_count` is always at least 1; the result must lie in
    /// `0..partition_count`.
    fn partition(&self, topic: &str, key: Option<&[u8]>, partition_count: i32) -> i32;
}

/// Sends everything to one partition, wrapped onto the topic's partition count.
#[derive(Debug, Default)]
pub struct FixedPartitioner {
    partition: i32,
}

impl FixedPartitioner {
    pub fn new(partition: i32) -> Self {
        Self { partition }
    }
}

impl Partitioner for FixedPartitioner {
    fn partition(&self, _topic: &str, _key: Option<&[u8]>, partition_count: i32) -> i32 {
        self.partition.rem_euclid(partition_count)
    }
}

#[derive(Debug)]
pub struct RoundRobinPartitioner {
    counter: AtomicU32,
}

impl Default for RoundRobinPartitioner {
    fn default() -> Self {
        // random start so that short-lived producers do not all pile onto partition 0
        Self {
            counter: AtomicU32::new(rand::thread_rng().gen_range(0..1 << 16)),
        }
    }
}

impl Partitioner for RoundRobinPartitioner {
    fn partition(&self, _topic: &str, _key: Option<&[u8]>, partition_count: i32) -> i32 {
        let next = self.counter.fetch_add(1, Ordering::Relaxed);
        (next % partition_count as u32) as i32
    }
}

/// Same key, same partition. Keyless messages are spread round-robin.
#[derive(Debug, Default)]
pub struct KeyHashPartitioner {
    fallback: RoundRobinPartitioner,
}

impl Partitioner for KeyHashPartitioner {
    fn partition(&self, topic: &str, key: Option<&[u8]>, partition_count: i32) -> i32 {
        match key {
            Some(key) => (crc32c::crc32c(key) % partition_count as u32) as i32,
            None => self.fallback.partition(topic, None, partition_count),
        }
    }
}

#[derive(Debug, Default)]
pub struct RandomPartitioner;

impl Partitioner for RandomPartitioner {
    fn partition(&self, _topic: &str, _key: Option<&[u8]>, partition_count: i32) -> i32 {
        rand::thread_rng().gen_range(0..partition_count)
    }
}

pub fn build_partitioner(
    strategy: PartitionStrategy,
    fixed_partition: i32,
) -> Box<dyn Partitioner> {
    match strategy {
        PartitionStrategy::Fixed => Box::new(FixedPartitioner::new(fixed_partition)),
        PartitionStrategy::RoundRobin => Box::<RoundRobinPartitioner>::default(),
        PartitionStrategy::KeyHash => Box::<KeyHashPartitioner>::default(),
        PartitionStrategy::Random => Box::new(RandomPartitioner),
    }
}
