use crate::{AppError, AppResult};

use super::{Partition, TopicPartition};

/// A named stream divided into a fixed number of partitions.
///
/// The partition set is decided at creation and never resized.
#[derive(Debug)]
pub struct Topic {
    name: String,
    partitions: Vec<Partition>,
}

impl Topic {
    pub fn new(name: impl Into<String>, partition_count: i32) -> AppResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(AppError::InvalidArgument(
                "topic name must not be empty".to_string(),
            ));
        }
        if partition_count < 1 {
            return Err(AppError::InvalidArgument(format!(
                "topic {name}: partition count must be at least 1, got {partition_count}"
            )));
        }
        let partitions = (0..partition_count)
            .map(|id| Partition::new(TopicPartition::new(name.clone(), id)))
            .collect();
        Ok(Self { name, partitions })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn partition_count(&self) -> i32 {
        self.partitions.len() as i32
    }

    pub fn partition(&self, id: i32) -> Option<&Partition> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.partitions.get(index))
    }

    /// Maps any requested partition number onto an existing partition.
    pub fn partition_for(&self, requested: i32) -> &Partition {
        let index = requested.rem_euclid(self.partition_count()) as usize;
        &self.partitions[index]
    }
}
