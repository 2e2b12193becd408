// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::delivery::DeliveryChannel;
use crate::error::{ServiceError, ServiceResult};
use crate::ledger::RelationshipLedger;
use crate::models::notification::{
    NewNotification, NotificationDetail, NotificationEvent, NotificationKind, NotificationPayload,
};
use crate::store::SocialStore;

/// Aggregate outcome of a fan-out. Partial failures are isolated per
/// recipient and surface only here, never as an operation error.
#[derive(Debug, Default, Clone, Serialize)]
pub struct FanoutReport {
    /// Notifications persisted
    pub created: usize,
    /// Candidates filtered out by block/mute rules
    pub skipped: usize,
    /// Successful channel deliveries
    pub sent: usize,
    /// Failed persistence attempts or channel deliveries
    pub failed: usize,
}

/// Notification Fan-out Engine.
///
/// Computes the recipient set for a triggering event (respecting the
/// relationship ledger's block/mute rules), persists one notification per
/// surviving recipient, and forwards each to every delivery channel.
pub struct NotificationEngine {
    store: Arc<dyn SocialStore>,
    ledger: Arc<RelationshipLedger>,
    channels: Vec<Arc<dyn DeliveryChannel>>,
    page_limit: i64,
}

impl NotificationEngine {
    pub fn new(
        store: Arc<dyn SocialStore>,
        ledger: Arc<RelationshipLedger>,
        channels: Vec<Arc<dyn DeliveryChannel>>,
        page_limit: i64,
    ) -> Self {
        Self {
            store,
            ledger,
            channels,
            page_limit,
        }
    }

    /// Fan an event out to its candidate recipients.
    ///
    /// Best-effort per recipient: one recipient's persistence or delivery
    /// failure is logged and counted, and the batch continues.
    pub async fn emit(&self, event: NotificationEvent) -> ServiceResult<FanoutReport> {
        let mut report = FanoutReport::default();
        let mut seen: Vec<&str> = Vec::with_capacity(event.recipient_candidates.len());

        for recipient in &event.recipient_candidates {
            // Duplicate candidates collapse to one notification
            if seen.contains(&recipient.as_str()) {
                continue;
            }
            seen.push(recipient.as_str());

            if let Some(sender) = &event.sender_id {
                // A user never notifies themselves
                if sender == recipient {
                    continue;
                }
                if self.ledger.is_blocked(sender, recipient).await? {
                    debug!(%sender, %recipient, "skipping blocked pair");
                    report.skipped += 1;
                    continue;
                }
                if self.ledger.is_muted(recipient, sender).await? {
                    debug!(%sender, %recipient, "skipping muted sender");
                    report.skipped += 1;
                    continue;
                }
            }

            let new = NewNotification {
                recipient_id: recipient.clone(),
                sender_id: event.sender_id.clone(),
                kind: event.kind.as_str().to_string(),
                related_post_id: event.related_post_id.clone(),
                title: event.title.clone(),
                body: event.body.clone(),
                metadata: event.metadata.clone(),
                is_read: false,
                created_at: Utc::now().naive_utc(),
            };

            let notification = match self.store.insert_notification(new).await {
                Ok(n) => n,
                Err(e) => {
                    warn!(recipient = recipient.as_str(), error = %e,
                          "failed to persist notification, continuing fan-out");
                    report.failed += 1;
                    continue;
                }
            };
            report.created += 1;

            let payload = NotificationPayload::from(&notification);
            for channel in &self.channels {
                match channel.deliver(recipient, &payload).await {
                    Ok(()) => report.sent += 1,
                    Err(e) => {
                        warn!(channel = channel.name(), error = %e,
                              "delivery failed, continuing fan-out");
                        report.failed += 1;
                    }
                }
            }
        }

        debug!(?report, kind = event.kind.as_str(), "fan-out complete");
        Ok(report)
    }

    /// Broadcast to all known users under a system identity. Shares the
    /// emit path; with no peer sender the block/mute filter degenerates to
    /// a no-op, so broadcasts reach blocked pairs too.
    pub async fn broadcast(
        &self,
        title: &str,
        body: &str,
        metadata: Option<serde_json::Value>,
    ) -> ServiceResult<FanoutReport> {
        if title.trim().is_empty() {
            return Err(ServiceError::Validation("Title is required".to_string()));
        }
        if body.trim().is_empty() {
            return Err(ServiceError::Validation("Body is required".to_string()));
        }

        let recipients = self.store.all_user_ids().await?;
        info!(recipients = recipients.len(), title, "broadcasting breaking news");

        self.emit(NotificationEvent {
            kind: NotificationKind::BreakingNews,
            sender_id: None,
            recipient_candidates: recipients,
            related_post_id: None,
            title: Some(title.to_string()),
            body: Some(body.to_string()),
            metadata,
        })
        .await
    }

    /// Newest-first listing, capped at the configured page limit
    pub async fn list_for_user(
        &self,
        user: &str,
        unread_only: bool,
    ) -> ServiceResult<Vec<NotificationDetail>> {
        self.require_user(user).await?;
        Ok(self
            .store
            .list_notifications(user, unread_only, self.page_limit)
            .await?)
    }

    pub async fn unread_count(&self, user: &str) -> ServiceResult<i64> {
        self.require_user(user).await?;
        Ok(self.store.unread_count(user).await?)
    }

    /// Transition one notification to read. Idempotent; only the recipient
    /// may perform it.
    pub async fn mark_read(&self, notification_id: i64, caller: &str) -> ServiceResult<()> {
        let notification = self
            .store
            .get_notification(notification_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Notification not found: {}", notification_id))
            })?;

        if notification.recipient_id != caller {
            return Err(ServiceError::Forbidden(
                "Notification belongs to another user".to_string(),
            ));
        }

        self.store.mark_notification_read(notification_id).await?;
        Ok(())
    }

    /// Bulk transition of every currently-unread notification; returns the
    /// number affected. Repeat calls affect zero.
    pub async fn mark_all_read(&self, user: &str) -> ServiceResult<u64> {
        self.require_user(user).await?;
        Ok(self.store.mark_all_read(user).await?)
    }

    async fn require_user(&self, user: &str) -> ServiceResult<()> {
        self.store
            .get_user(user)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", user)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{DeliveryError, LiveStreamChannel, PushChannel};
    use crate::models::user::NewUser;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    struct Harness {
        store: Arc<MemoryStore>,
        ledger: Arc<RelationshipLedger>,
        engine: NotificationEngine,
        push: Arc<PushChannel>,
        stream: Arc<LiveStreamChannel>,
    }

    async fn harness(users: &[&str]) -> Harness {
        harness_with_channels(users, Vec::new()).await
    }

    async fn harness_with_channels(
        users: &[&str],
        extra: Vec<Arc<dyn DeliveryChannel>>,
    ) -> Harness {
        let store = Arc::new(MemoryStore::new());
        for id in users {
            store
                .upsert_user(NewUser {
                    id: id.to_string(),
                    handle: format!("@{}", id),
                    email: format!("{}@finsight.app", id),
                    display_name: None,
                    avatar_url: None,
                    created_at: Utc::now().naive_utc(),
                })
                .await
                .unwrap();
        }
        let ledger = Arc::new(RelationshipLedger::new(store.clone(), 50));
        let push = Arc::new(PushChannel::new());
        let stream = Arc::new(LiveStreamChannel::new(8));
        let mut channels: Vec<Arc<dyn DeliveryChannel>> =
            vec![push.clone(), stream.clone()];
        channels.extend(extra);
        let engine = NotificationEngine::new(store.clone(), ledger.clone(), channels, 50);
        Harness {
            store,
            ledger,
            engine,
            push,
            stream,
        }
    }

    fn like_event(sender: &str, recipients: &[&str]) -> NotificationEvent {
        NotificationEvent {
            kind: NotificationKind::Like,
            sender_id: Some(sender.to_string()),
            recipient_candidates: recipients.iter().map(|r| r.to_string()).collect(),
            related_post_id: None,
            title: None,
            body: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn block_suppresses_emit_in_both_directions() {
        let h = harness(&["alice", "bob"]).await;
        h.ledger.block("alice", "bob").await.unwrap();

        let report = h.engine.emit(like_event("alice", &["bob"])).await.unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.skipped, 1);

        let report = h.engine.emit(like_event("bob", &["alice"])).await.unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.skipped, 1);

        assert_eq!(h.engine.unread_count("bob").await.unwrap(), 0);
        assert_eq!(h.engine.unread_count("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mute_suppresses_one_direction_only() {
        let h = harness(&["alice", "bob"]).await;
        // alice mutes bob
        h.ledger.mute("alice", "bob").await.unwrap();

        // bob -> alice is silenced
        let report = h.engine.emit(like_event("bob", &["alice"])).await.unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.skipped, 1);

        // alice -> bob still lands
        let report = h.engine.emit(like_event("alice", &["bob"])).await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(h.engine.unread_count("bob").await.unwrap(), 1);
        assert_eq!(h.engine.unread_count("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn follow_event_lands_for_followee() {
        let h = harness(&["alice", "bob"]).await;
        h.ledger.follow("alice", "bob").await.unwrap();

        let report = h
            .engine
            .emit(NotificationEvent {
                kind: NotificationKind::Follow,
                sender_id: Some("alice".to_string()),
                recipient_candidates: vec!["bob".to_string()],
                related_post_id: None,
                title: None,
                body: None,
                metadata: None,
            })
            .await
            .unwrap();
        assert_eq!(report.created, 1);

        let unread = h.engine.list_for_user("bob", true).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].kind, "follow");
        assert!(!unread[0].is_read);
        assert_eq!(unread[0].sender.as_ref().unwrap().id, "alice");
    }

    #[tokio::test]
    async fn listing_enriches_sender_and_post_title() {
        let h = harness(&["alice", "bob"]).await;
        h.store
            .upsert_post(crate::models::content::NewPost {
                id: "post-1".to_string(),
                author_id: "bob".to_string(),
                title: "Fed holds rates".to_string(),
                created_at: Utc::now().naive_utc(),
            })
            .await
            .unwrap();

        h.engine
            .emit(NotificationEvent {
                kind: NotificationKind::Comment,
                sender_id: Some("alice".to_string()),
                recipient_candidates: vec!["bob".to_string()],
                related_post_id: Some("post-1".to_string()),
                title: None,
                body: None,
                metadata: None,
            })
            .await
            .unwrap();

        let items = h.engine.list_for_user("bob", false).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].related_post_title.as_deref(), Some("Fed holds rates"));
        assert_eq!(items[0].sender.as_ref().unwrap().handle, "@alice");
    }

    #[tokio::test]
    async fn mark_read_enforces_ownership_and_is_idempotent() {
        let h = harness(&["alice", "bob"]).await;
        h.engine.emit(like_event("alice", &["bob"])).await.unwrap();
        let id = h.engine.list_for_user("bob", true).await.unwrap()[0].id;

        let err = h.engine.mark_read(id, "alice").await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        h.engine.mark_read(id, "bob").await.unwrap();
        // Second call is a no-op, not an error
        h.engine.mark_read(id, "bob").await.unwrap();
        assert_eq!(h.engine.unread_count("bob").await.unwrap(), 0);

        let err = h.engine.mark_read(9999, "bob").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn mark_all_read_second_call_affects_zero() {
        let h = harness(&["alice", "bob"]).await;
        h.engine.emit(like_event("alice", &["bob"])).await.unwrap();
        h.engine.emit(like_event("alice", &["bob"])).await.unwrap();

        assert_eq!(h.engine.mark_all_read("bob").await.unwrap(), 2);
        assert_eq!(h.engine.mark_all_read("bob").await.unwrap(), 0);

        // A notification created afterwards stays unread
        h.engine.emit(like_event("alice", &["bob"])).await.unwrap();
        assert_eq!(h.engine.unread_count("bob").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn broadcast_bypasses_peer_block_filtering() {
        let h = harness(&["alice", "carol"]).await;
        h.ledger.block("alice", "carol").await.unwrap();

        let report = h
            .engine
            .broadcast("Market Alert", "S&P -3%", None)
            .await
            .unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.skipped, 0);

        assert_eq!(h.engine.unread_count("alice").await.unwrap(), 1);
        assert_eq!(h.engine.unread_count("carol").await.unwrap(), 1);
        let items = h.engine.list_for_user("alice", true).await.unwrap();
        assert_eq!(items[0].kind, "breaking_news");
        assert!(items[0].sender.is_none());
    }

    #[tokio::test]
    async fn broadcast_requires_title_and_body() {
        let h = harness(&["alice"]).await;
        let err = h.engine.broadcast("", "body", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let err = h.engine.broadcast("title", "  ", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn sender_is_not_a_recipient_of_their_own_event() {
        let h = harness(&["alice", "bob"]).await;
        let report = h
            .engine
            .emit(like_event("alice", &["alice", "bob"]))
            .await
            .unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(h.engine.unread_count("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_candidates_collapse() {
        let h = harness(&["alice", "bob"]).await;
        let report = h
            .engine
            .emit(like_event("alice", &["bob", "bob", "bob"]))
            .await
            .unwrap();
        assert_eq!(report.created, 1);
    }

    /// Sink that refuses payloads for one user only
    struct GrudgeChannel;

    #[async_trait]
    impl DeliveryChannel for GrudgeChannel {
        fn name(&self) -> &'static str {
            "grudge"
        }

        async fn deliver(
            &self,
            user_id: &str,
            _payload: &NotificationPayload,
        ) -> Result<(), DeliveryError> {
            if user_id == "bob" {
                return Err(DeliveryError::Rejected {
                    user_id: user_id.to_string(),
                    reason: "refused".to_string(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn one_recipients_delivery_failure_does_not_abort_the_batch() {
        let h = harness_with_channels(&["alice", "bob", "carol"], vec![Arc::new(GrudgeChannel)])
            .await;

        let report = h
            .engine
            .emit(like_event("alice", &["bob", "carol"]))
            .await
            .unwrap();

        // Both notifications persist despite bob's failing sink
        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(h.engine.unread_count("bob").await.unwrap(), 1);
        assert_eq!(h.engine.unread_count("carol").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn emit_reaches_open_live_stream() {
        let h = harness(&["alice", "bob"]).await;
        let mut rx = h.stream.subscribe("bob").await;

        h.engine.emit(like_event("alice", &["bob"])).await.unwrap();

        let payload = rx.recv().await.unwrap();
        assert_eq!(payload.kind, "like");
        assert_eq!(payload.sender_id.as_deref(), Some("alice"));
        // Push channel saw the same fan-out
        assert_eq!(h.push.counts().0, 1);
    }
}
