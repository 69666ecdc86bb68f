mod record;
mod topic;
mod topic_partition;

pub use record::{Message, RecordMetadata};
pub use topic::Topic;
pub use topic_partition::{Partition, TopicPartition};
