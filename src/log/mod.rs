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

//! Append-only in-memory message log backing a single partition.
//!
//! The log itself is not synchronized; the owning partition serializes
//! access to it (see [`crate::message::Partition`]).

use crate::message::Message;
use crate::{AppError, AppResult};

/// Offset carried by a message that has not been appended yet.
pub const NO_OFFSET: i64 = -1;

/// Ordered sequence of messages where the index of a message equals its offset.
#[derive(Debug, Default)]
pub struct Log {
    messages: Vec<Message>,
}

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the message at the end of the log and stamps it with its offset.
    ///
    /// The assigned offset always equals the log length before the append.
    pub fn append(&mut self, mut message: Message) -> AppResult<i64> {
        let offset = i64::try_from(self.messages.len()).map_err(|_| {
            AppError::AppendFailure(format!(
                "log of {}-{} exhausted its offset space",
                message.topic, message.partition
            ))
        })?;
        message.offset = offset;
        self.messages.push(message);
        Ok(offset)
    }

    /// Messages at or after `offset`, in offset order.
    ///
    /// An offset past the end yields an empty slice; a negative offset
    /// reads from the start of the log.
    pub fn read_from(&self, offset: i64) -> &[Message] {
        let start = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        self.messages.get(start..).unwrap_or(&[])
    }

    /// Offset the next appended message will receive.
    pub fn log_end_offset(&self) -> i64 {
        self.messages.len() as i64
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(payload: &'static str) -> Message {
        Message::new("orders", 0, None, payload)
    }

    #[test]
    fn test_append_assigns_contiguous_offsets() -> AppResult<()> {
        let mut log = Log::new();
        assert!(log.is_empty());

        for expected in 0..5 {
            assert_eq!(log.append(message("m"))?, expected);
        }
        assert_eq!(log.len(), 5);
        assert_eq!(log.log_end_offset(), 5);

        let offsets: Vec<i64> = log.read_from(0).iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![0, 1, 2, 3, 4]);
        Ok(())
    }

    #[test]
    fn test_read_from_middle() -> AppResult<()> {
        let mut log = Log::new();
        log.append(message("A"))?;
        log.append(message("B"))?;
        log.append(message("C"))?;

        let tail = log.read_from(1);
        assert_eq!(tail.len(), 2);
        assert_eq!(&tail[0].payload[..], b"B");
        assert_eq!(&tail[1].payload[..], b"C");
        Ok(())
    }

    #[test]
    fn test_read_past_end_is_empty() -> AppResult<()> {
        let mut log = Log::new();
        assert!(log.read_from(0).is_empty());

        log.append(message("A"))?;
        assert!(log.read_from(1).is_empty());
        assert!(log.read_from(i64::MAX).is_empty());
        assert_eq!(log.read_from(-3).len(), 1);
        Ok(())
    }
}
