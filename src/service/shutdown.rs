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

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Stop signal listener for a background task.
///
/// The task is considered stopped once a value is sent on the paired
/// `broadcast::Sender`, or once every sender has been dropped.
#[derive(Debug)]
pub struct Shutdown {
    is_shutdown: bool,
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    pub fn new(notify: broadcast::Receiver<()>) -> Shutdown {
        Shutdown {
            is_shutdown: false,
            notify,
        }
    }
    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown
    }

    pub async fn recv(&mut self) {
        if self.is_shutdown {
            return;
        }
        let _ = self.notify.recv().await;
        self.is_shutdown = true;
    }

    /// Non-blocking check, used between deliveries inside one poll cycle.
    pub fn poll_shutdown(&mut self) -> bool {
        if self.is_shutdown {
            return true;
        }
        match self.notify.try_recv() {
            Err(TryRecvError::Empty) => false,
            _ => {
                self.is_shutdown = true;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_poll_shutdown_after_signal() {
        let (notify, _) = broadcast::channel(1);
        let mut shutdown = Shutdown::new(notify.subscribe());
        assert!(!shutdown.poll_shutdown());

        notify.send(()).unwrap();
        assert!(shutdown.poll_shutdown());
        assert!(shutdown.is_shutdown());
        // already stopped, returns immediately
        shutdown.recv().await;
    }

    #[tokio::test]
    async fn test_dropped_sender_stops() {
        let (notify, _) = broadcast::channel::<()>(1);
        let mut shutdown = Shutdown::new(notify.subscribe());
        drop(notify);
        shutdown.recv().await;
        assert!(shutdown.is_shutdown());
    }
}
