//! Producer and consumer clients talking to an in-process [`crate::Broker`].

mod consumer;
mod partitioner;
mod producer;
mod subscription;

pub use consumer::Consumer;
pub use partitioner::{
    build_partitioner, FixedPartitioner, KeyHashPartitioner, Partitioner, RandomPartitioner,
    RoundRobinPartitioner,
};
pub use producer::Producer;
