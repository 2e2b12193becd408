// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::{DeliveryChannel, DeliveryError};
use crate::models::notification::NotificationPayload;

/// External push provider boundary (implementation out of scope)
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send_push(&self, user_id: &str, payload: &NotificationPayload) -> Result<(), String>;
}

/// Default provider: logs the handoff. Stands in for the real vendor client.
pub struct LogPushProvider;

#[async_trait]
impl PushProvider for LogPushProvider {
    async fn send_push(&self, user_id: &str, payload: &NotificationPayload) -> Result<(), String> {
        debug!(user_id, kind = %payload.kind, id = payload.id, "push notification dispatched");
        Ok(())
    }
}

/// Fire-and-forget push sink. Hands payloads to the external push provider
/// and keeps per-channel sent/failed counters for caller-visible reporting.
pub struct PushChannel {
    provider: Arc<dyn PushProvider>,
    sent: AtomicU64,
    failed: AtomicU64,
}

impl PushChannel {
    pub fn new() -> Self {
        Self::with_provider(Arc::new(LogPushProvider))
    }

    pub fn with_provider(provider: Arc<dyn PushProvider>) -> Self {
        Self {
            provider,
            sent: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Aggregate (sent, failed) counts since startup
    pub fn counts(&self) -> (u64, u64) {
        (
            self.sent.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

impl Default for PushChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryChannel for PushChannel {
    fn name(&self) -> &'static str {
        "push"
    }

    async fn deliver(
        &self,
        user_id: &str,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError> {
        match self.provider.send_push(user_id, payload).await {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(reason) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                Err(DeliveryError::Rejected {
                    user_id: user_id.to_string(),
                    reason,
                })
            }
        }
    }
}
