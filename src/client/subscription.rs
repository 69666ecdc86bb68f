// Copyright 2025 jonefeewang@gmail.com
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Background delivery of one subscription.
//!
//! Each cycle the task walks every partition of the topic, reads everything past
//! the consumer's cursor and offers it to the bounded queue with `try_send`.
//! A cursor moves one offset per accepted message. The first rejected offer
//! ends the partition's turn for this cycle, so the rejected message and
//! everything after it are offered again on the next cycle, in order.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use async_channel::TrySendError;
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, trace, warn};

use crate::message::{Message, Topic, TopicPartition};
use crate::{AppError, AppResult, Broker, Shutdown};

/// Next offset to read for each partition, shared by a consumer and its tasks.
pub(crate) type CursorMap = Arc<RwLock<HashMap<TopicPartition, i64>>>;

/// Owner side of a running delivery task.
///
/// Dropping the handle drops the stop sender, which also stops the task.
#[derive(Debug)]
pub(crate) struct SubscriptionHandle {
    notify_shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Signals the task and waits until it has exited and closed its queue.
    pub(crate) async fn stop(self) -> AppResult<()> {
        // an error only means the task is already gone
        let _ = self.notify_shutdown.send(());
        self.handle
            .await
            .map_err(|e| AppError::IllegalStateError(format!("delivery task failed: {e}")))
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

pub(crate) struct DeliveryTask {
    topic: String,
    broker: Arc<Broker>,
    cursors: CursorMap,
    sender: async_channel::Sender<Message>,
    shutdown: Shutdown,
    poll_interval: Duration,
}

impl DeliveryTask {
    pub(crate) fn spawn(
        runtime: &Handle,
        topic: &str,
        broker: Arc<Broker>,
        cursors: CursorMap,
        queue_capacity: usize,
        poll_interval: Duration,
    ) -> (async_channel::Receiver<Message>, SubscriptionHandle) {
        let (sender, receiver) = async_channel::bounded(queue_capacity);
        let (notify_shutdown, _) = broadcast::channel(1);

        let task = DeliveryTask {
            topic: topic.to_string(),
            broker,
            cursors,
            sender,
            shutdown: Shutdown::new(notify_shutdown.subscribe()),
            poll_interval,
        };
        let handle = runtime.spawn(task.run());

        (
            receiver,
            SubscriptionHandle {
                notify_shutdown,
                handle,
            },
        )
    }

    async fn run(mut self) {
        info!("started consuming topic: {}", self.topic);

        loop {
            if self.sender.is_closed() {
                debug!("subscriber of topic {} dropped its queue", self.topic);
                break;
            }

            match self.resolve_topic() {
                Ok(topic) => {
                    if self.deliver(&topic).is_break() {
                        break;
                    }
                }
                Err(err) if err.is_transient() => {
                    debug!("{}, retrying in {:?}", err, self.poll_interval)
                }
                Err(err) => warn!("poll of topic {} failed: {}", self.topic, err),
            }

            tokio::select! {
                _ = self.shutdown.recv() => break,
                _ = time::sleep(self.poll_interval) => {}
            }
        }

        // sole sender, so this is the only place the queue gets closed
        self.sender.close();
        info!("stopped consuming topic: {}", self.topic);
    }

    fn resolve_topic(&self) -> AppResult<Arc<Topic>> {
        self.broker
            .get_topic(&self.topic)
            .ok_or_else(|| AppError::NotReady(format!("waiting for topic {}", self.topic)))
    }

    fn deliver(&mut self, topic: &Topic) -> ControlFlow<()> {
        for partition in topic.partitions() {
            let tp = partition.topic_partition();
            let cursor = self.cursors.read().get(tp).copied().unwrap_or(0);

            let messages = partition.read_from(cursor);
            if messages.is_empty() {
                continue;
            }
            trace!(
                "found {} messages in {} starting from offset {}",
                messages.len(),
                tp,
                cursor
            );

            for message in messages {
                if self.shutdown.poll_shutdown() {
                    return ControlFlow::Break(());
                }
                let offset = message.offset;
                match self.sender.try_send(message) {
                    Ok(()) => self.commit(tp, offset),
                    Err(TrySendError::Full(_)) => {
                        let err = AppError::QueueFull(format!("{tp} at offset {offset}"));
                        debug!("{}, retrying on next poll", err);
                        break;
                    }
                    Err(TrySendError::Closed(_)) => return ControlFlow::Break(()),
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// Moves the cursor past a delivered message.
    fn commit(&self, tp: &TopicPartition, delivered: i64) {
        let mut cursors = self.cursors.write();
        let cursor = cursors.entry(tp.clone()).or_insert(0);
        debug_assert_eq!(*cursor, delivered, "cursor of {tp} skipped an offset");
        *cursor = delivered + 1;
    }
}
