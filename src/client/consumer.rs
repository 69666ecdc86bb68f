use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::message::{Message, TopicPartition};
use crate::{AppError, AppResult, Broker, ClientConfig, ConsumerConfig};

use super::subscription::{CursorMap, DeliveryTask, SubscriptionHandle};

/// Read-side client.
///
/// Owns one cursor per partition it has read from and one delivery task per
/// subscribed topic. Cursors survive an unsubscribe, so subscribing again
/// resumes where delivery stopped. Consumers never share cursors: two
/// consumers on the same topic each receive every message.
///
/// Dropping the consumer stops all of its delivery tasks.
#[derive(Debug)]
pub struct Consumer {
    broker: Arc<Broker>,
    client_config: ClientConfig,
    config: ConsumerConfig,
    cursors: CursorMap,
    subscriptions: Mutex<HashMap<String, SubscriptionHandle>>,
}

impl Consumer {
    pub fn new(broker: Arc<Broker>, client_config: ClientConfig, config: ConsumerConfig) -> Self {
        if !client_config.auto_commit {
            warn!(
                "auto_commit=false is not supported, group {} will advance cursors on delivery",
                client_config.group_id
            );
        }
        Consumer {
            broker,
            client_config,
            config,
            cursors: Arc::new(RwLock::new(HashMap::new())),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.client_config.group_id
    }

    /// Starts delivering `topic` into a new bounded queue and returns its receiving end.
    ///
    /// The topic does not need to exist yet. The delivery task is spawned on the
    /// current tokio runtime; polled outside of one, this fails with
    /// `IllegalStateError` before anything is registered.
    pub async fn subscribe(&self, topic: &str) -> AppResult<async_channel::Receiver<Message>> {
        if topic.is_empty() {
            return Err(AppError::InvalidArgument(
                "topic name must not be empty".to_string(),
            ));
        }
        // a zero capacity queue cannot be created
        self.config.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| AppError::IllegalStateError(format!("subscribe needs a runtime: {e}")))?;

        let mut subscriptions = self.subscriptions.lock().await;
        if let Some(existing) = subscriptions.get(topic) {
            // a task whose subscriber went away has already exited and can be replaced
            if !existing.is_finished() {
                return Err(AppError::InvalidOperation(format!(
                    "already subscribed to topic {topic}"
                )));
            }
        }

        let (receiver, handle) = DeliveryTask::spawn(
            &runtime,
            topic,
            self.broker.clone(),
            self.cursors.clone(),
            self.config.queue_capacity,
            self.config.poll_interval(),
        );
        subscriptions.insert(topic.to_string(), handle);
        info!(
            "group {} subscribed to topic {}",
            self.client_config.group_id, topic
        );
        Ok(receiver)
    }

    /// Stops delivery for `topic` and waits until its queue is closed.
    ///
    /// Messages already in the queue stay readable. No cursor moves after this
    /// returns.
    pub async fn unsubscribe(&self, topic: &str) -> AppResult<()> {
        let mut subscriptions = self.subscriptions.lock().await;
        let handle = subscriptions.remove(topic).ok_or_else(|| {
            AppError::InvalidOperation(format!("not subscribed to topic {topic}"))
        })?;
        handle.stop().await?;
        info!(
            "group {} unsubscribed from topic {}",
            self.client_config.group_id, topic
        );
        Ok(())
    }

    /// Stops every subscription. The first task failure, if any, is returned
    /// after all tasks have been stopped.
    pub async fn close(&self) -> AppResult<()> {
        let mut subscriptions = self.subscriptions.lock().await;
        let mut result = Ok(());
        for (topic, handle) in subscriptions.drain() {
            if let Err(err) = handle.stop().await {
                warn!("stopping subscription to {} failed: {}", topic, err);
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }

    /// Topics with a registered delivery task, sorted.
    pub async fn subscriptions(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.subscriptions.lock().await.keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Next offset this consumer will read from the partition, if it has read
    /// from it before.
    pub fn position(&self, topic_partition: &TopicPartition) -> Option<i64> {
        self.cursors.read().get(topic_partition).copied()
    }

    pub fn positions(&self) -> HashMap<TopicPartition, i64> {
        self.cursors.read().clone()
    }
}
