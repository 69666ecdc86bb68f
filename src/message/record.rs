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

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::log::NO_OFFSET;

use super::TopicPartition;

/// A single published message.
///
/// `offset` is assigned by the partition at append time and holds
/// [`NO_OFFSET`] until then.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub topic: String,
    pub partition: i32,
    pub key: Option<Bytes>,
    pub payload: Bytes,
    pub timestamp: DateTime<Utc>,
    pub offset: i64,
}

impl Message {
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        key: Option<Bytes>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            partition,
            key,
            payload: payload.into(),
            timestamp: Utc::now(),
            offset: NO_OFFSET,
        }
    }

    pub fn topic_partition(&self) -> TopicPartition {
        TopicPartition::new(self.topic.clone(), self.partition)
    }

    pub fn is_appended(&self) -> bool {
        self.offset != NO_OFFSET
    }
}

/// Where a produced message landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
    pub id: String,
    pub topic_partition: TopicPartition,
    pub offset: i64,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for RecordMetadata {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            topic_partition: message.topic_partition(),
            offset: message.offset,
            timestamp: message.timestamp,
        }
    }
}
