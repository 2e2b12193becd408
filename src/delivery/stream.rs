// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use super::{DeliveryChannel, DeliveryError};
use crate::models::notification::NotificationPayload;

/// Live-stream sink: one open connection per active client, at-most-once,
/// no durable queue. A payload for a user with no open connection is
/// dropped; a closed connection is pruned so fan-out stops addressing it.
pub struct LiveStreamChannel {
    buffer: usize,
    connections: RwLock<HashMap<String, mpsc::Sender<NotificationPayload>>>,
}

impl LiveStreamChannel {
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Open a connection for a user, replacing any previous one. The
    /// returned receiver ends the association when dropped.
    pub async fn subscribe(&self, user_id: &str) -> mpsc::Receiver<NotificationPayload> {
        let (tx, rx) = mpsc::channel(self.buffer);
        let mut connections = self.connections.write().await;
        if connections.insert(user_id.to_string(), tx).is_some() {
            debug!(user_id, "replaced existing live-stream connection");
        }
        rx
    }

    /// Drop the association for a user, if any
    pub async fn disconnect(&self, user_id: &str) {
        self.connections.write().await.remove(user_id);
    }

    pub async fn open_connections(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[async_trait]
impl DeliveryChannel for LiveStreamChannel {
    fn name(&self) -> &'static str {
        "live-stream"
    }

    async fn deliver(
        &self,
        user_id: &str,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError> {
        let sender = {
            let connections = self.connections.read().await;
            connections.get(user_id).cloned()
        };

        let Some(sender) = sender else {
            // No open sink: at-most-once semantics, drop silently
            return Ok(());
        };

        match sender.try_send(payload.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // Client went away; release the association
                self.connections.write().await.remove(user_id);
                debug!(user_id, "pruned closed live-stream connection");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(user_id, "live-stream buffer full, dropping payload");
                Err(DeliveryError::Rejected {
                    user_id: user_id.to_string(),
                    reason: "stream buffer full".to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn payload(id: i64) -> NotificationPayload {
        NotificationPayload {
            id,
            kind: "comment".to_string(),
            sender_id: Some("alice".to_string()),
            related_post_id: Some("post-1".to_string()),
            title: None,
            body: None,
            metadata: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[tokio::test]
    async fn delivers_to_open_connection() {
        let channel = LiveStreamChannel::new(4);
        let mut rx = channel.subscribe("bob").await;

        channel.deliver("bob", &payload(7)).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, 7);
    }

    #[tokio::test]
    async fn drops_when_no_connection_open() {
        let channel = LiveStreamChannel::new(4);
        // Not an error: at-most-once, nothing to address
        channel.deliver("bob", &payload(1)).await.unwrap();
        assert_eq!(channel.open_connections().await, 0);
    }

    #[tokio::test]
    async fn prunes_closed_connection_on_next_deliver() {
        let channel = LiveStreamChannel::new(4);
        let rx = channel.subscribe("bob").await;
        assert_eq!(channel.open_connections().await, 1);

        drop(rx);
        channel.deliver("bob", &payload(2)).await.unwrap();
        assert_eq!(channel.open_connections().await, 0);
    }

    #[tokio::test]
    async fn full_buffer_is_reported_not_queued() {
        let channel = LiveStreamChannel::new(1);
        let _rx = channel.subscribe("bob").await;

        channel.deliver("bob", &payload(1)).await.unwrap();
        let err = channel.deliver("bob", &payload(2)).await;
        assert!(err.is_err());
    }
}
