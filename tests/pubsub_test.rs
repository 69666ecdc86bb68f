use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use memq::{
    AppResult, Broker, ClientConfig, Consumer, ConsumerConfig, Message, PartitionStrategy,
    Producer, ProducerConfig, TopicPartition,
};
use tokio::time::timeout;

fn client_config() -> ClientConfig {
    ClientConfig {
        group_id: "integration".to_string(),
        ..ClientConfig::default()
    }
}

async fn collect(receiver: &async_channel::Receiver<Message>, count: usize) -> Vec<Message> {
    let mut messages = Vec::with_capacity(count);
    for _ in 0..count {
        let message = timeout(Duration::from_secs(5), receiver.recv())
            .await
            .expect("timed out waiting for message")
            .expect("queue closed");
        messages.push(message);
    }
    messages
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_keyed_multi_partition_ordering() -> AppResult<()> {
    const PARTITIONS: i32 = 4;
    const KEYS: usize = 8;
    const PER_KEY: usize = 25;

    let broker = Arc::new(Broker::new());
    broker.create_topic("payments", PARTITIONS)?;

    let consumer = Consumer::new(
        broker.clone(),
        client_config(),
        ConsumerConfig {
            poll_interval_ms: 5,
            queue_capacity: 16,
        },
    );
    let receiver = consumer.subscribe("payments").await?;

    let producers: Vec<_> = (0..KEYS)
        .map(|key| {
            let producer = Producer::new(
                broker.clone(),
                client_config(),
                ProducerConfig {
                    partition_strategy: PartitionStrategy::KeyHash,
                    fixed_partition: 0,
                },
            );
            tokio::task::spawn_blocking(move || -> AppResult<()> {
                for seq in 0..PER_KEY {
                    producer.send_with_key(
                        "payments",
                        format!("account-{key}"),
                        format!("{key}:{seq}"),
                    )?;
                }
                Ok(())
            })
        })
        .collect();
    for handle in producers {
        handle.await.expect("producer panicked")?;
    }

    let messages = collect(&receiver, KEYS * PER_KEY).await;

    // per partition: contiguous offsets in order; per key: send order kept
    let mut next_offset: HashMap<i32, i64> = HashMap::new();
    let mut next_seq: HashMap<String, usize> = HashMap::new();
    for message in &messages {
        let expected = next_offset.entry(message.partition).or_insert(0);
        assert_eq!(message.offset, *expected);
        *expected += 1;

        let payload = String::from_utf8(message.payload.to_vec()).unwrap();
        let (key, seq) = payload.split_once(':').unwrap();
        let seq: usize = seq.parse().unwrap();
        let expected_seq = next_seq.entry(key.to_string()).or_insert(0);
        assert_eq!(seq, *expected_seq);
        *expected_seq += 1;
    }
    assert_eq!(next_seq.len(), KEYS);

    let total: i64 = (0..PARTITIONS)
        .map(|p| {
            consumer
                .position(&TopicPartition::new("payments", p))
                .unwrap_or(0)
        })
        .sum();
    assert_eq!(total, (KEYS * PER_KEY) as i64);

    consumer.close().await?;
    assert!(receiver.recv().await.is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_independent_brokers() -> AppResult<()> {
    let first = Arc::new(Broker::new());
    let second = Arc::new(Broker::new());

    let producer = Producer::new(first.clone(), client_config(), ProducerConfig::default());
    producer.send("orders", "only-in-first")?;

    assert!(first.get_topic("orders").is_some());
    assert!(second.get_topic("orders").is_none());

    let consumer = Consumer::new(second.clone(), client_config(), ConsumerConfig::default());
    let receiver = consumer.subscribe("orders").await?;
    let nothing = timeout(Duration::from_millis(250), receiver.recv()).await;
    assert!(nothing.is_err());

    consumer.close().await
}
