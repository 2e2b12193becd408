// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

mod push;
mod stream;

pub use push::{LogPushProvider, PushChannel, PushProvider};
pub use stream::LiveStreamChannel;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::notification::NotificationPayload;

/// A delivery sink failure. Counted and logged by the fan-out engine, never
/// escalated to the triggering caller.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("sink rejected payload for {user_id}: {reason}")]
    Rejected { user_id: String, reason: String },
}

/// Capability shared by all delivery sinks; the fan-out engine is
/// sink-agnostic, so new channels (email, SMS) slot in without touching
/// fan-out logic.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(
        &self,
        user_id: &str,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError>;
}
