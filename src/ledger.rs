// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};
use crate::models::blocking::{BlockedDetail, MutedDetail};
use crate::models::social_graph::FollowDetail;
use crate::models::user::User;
use crate::store::SocialStore;

/// Relationship Ledger: directed follow/block/mute edges between users.
///
/// All mutations are idempotent upserts or removals; duplicate concurrent
/// calls converge on one edge. Visibility rules: a block in either direction
/// suppresses notification delivery and follow creation between the pair; a
/// mute is one-directional and silent.
pub struct RelationshipLedger {
    store: Arc<dyn SocialStore>,
    listing_limit: i64,
}

impl RelationshipLedger {
    pub fn new(store: Arc<dyn SocialStore>, listing_limit: i64) -> Self {
        Self {
            store,
            listing_limit,
        }
    }

    async fn require_user(&self, id: &str) -> ServiceResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", id)))
    }

    fn reject_self_edge(a: &str, b: &str, op: &str) -> ServiceResult<()> {
        if a == b {
            return Err(ServiceError::Validation(format!(
                "Cannot {} yourself",
                op
            )));
        }
        Ok(())
    }

    /// Create a follow edge. Returns true if the edge is new.
    pub async fn follow(&self, follower: &str, following: &str) -> ServiceResult<bool> {
        Self::reject_self_edge(follower, following, "follow")?;
        self.require_user(follower).await?;
        self.require_user(following).await?;

        if self.store.block_exists_between(follower, following).await? {
            return Err(ServiceError::Forbidden(
                "Cannot follow a blocked user".to_string(),
            ));
        }

        let created = self.store.upsert_follow(follower, following).await?;
        if created {
            info!(follower, following, "follow edge created");
        } else {
            debug!(follower, following, "follow edge already present");
        }
        Ok(created)
    }

    /// Remove a follow edge; no error if it was absent.
    pub async fn unfollow(&self, follower: &str, following: &str) -> ServiceResult<bool> {
        Self::reject_self_edge(follower, following, "unfollow")?;
        self.require_user(follower).await?;
        self.require_user(following).await?;
        Ok(self.store.remove_follow(follower, following).await?)
    }

    /// Upsert a block edge; revokes follow edges between the pair in both
    /// directions.
    pub async fn block(&self, blocker: &str, blocked: &str) -> ServiceResult<bool> {
        Self::reject_self_edge(blocker, blocked, "block")?;
        self.require_user(blocker).await?;
        self.require_user(blocked).await?;
        let created = self.store.upsert_block(blocker, blocked).await?;
        if created {
            info!(blocker, blocked, "block edge created");
        }
        Ok(created)
    }

    /// Remove a block edge; prior follows are not restored.
    pub async fn unblock(&self, blocker: &str, blocked: &str) -> ServiceResult<bool> {
        Self::reject_self_edge(blocker, blocked, "unblock")?;
        self.require_user(blocker).await?;
        self.require_user(blocked).await?;
        Ok(self.store.remove_block(blocker, blocked).await?)
    }

    pub async fn mute(&self, muter: &str, muted: &str) -> ServiceResult<bool> {
        Self::reject_self_edge(muter, muted, "mute")?;
        self.require_user(muter).await?;
        self.require_user(muted).await?;
        Ok(self.store.upsert_mute(muter, muted).await?)
    }

    pub async fn unmute(&self, muter: &str, muted: &str) -> ServiceResult<bool> {
        Self::reject_self_edge(muter, muted, "unmute")?;
        self.require_user(muter).await?;
        self.require_user(muted).await?;
        Ok(self.store.remove_mute(muter, muted).await?)
    }

    /// Fast-path filter: a block in either direction suppresses visibility.
    pub async fn is_blocked(&self, a: &str, b: &str) -> ServiceResult<bool> {
        Ok(self.store.block_exists_between(a, b).await?)
    }

    /// Directional: true only if `muter` has muted `muted`.
    pub async fn is_muted(&self, muter: &str, muted: &str) -> ServiceResult<bool> {
        Ok(self.store.mute_exists(muter, muted).await?)
    }

    pub async fn is_following(&self, follower: &str, following: &str) -> ServiceResult<bool> {
        Ok(self.store.follow_exists(follower, following).await?)
    }

    pub async fn list_followers(&self, user: &str) -> ServiceResult<Vec<FollowDetail>> {
        self.require_user(user).await?;
        Ok(self.store.list_followers(user, self.listing_limit).await?)
    }

    pub async fn list_following(&self, user: &str) -> ServiceResult<Vec<FollowDetail>> {
        self.require_user(user).await?;
        Ok(self.store.list_following(user, self.listing_limit).await?)
    }

    pub async fn list_blocked(&self, user: &str) -> ServiceResult<Vec<BlockedDetail>> {
        self.require_user(user).await?;
        Ok(self.store.list_blocked(user).await?)
    }

    pub async fn list_muted(&self, user: &str) -> ServiceResult<Vec<MutedDetail>> {
        self.require_user(user).await?;
        Ok(self.store.list_muted(user).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::NewUser;
    use crate::store::MemoryStore;
    use chrono::Utc;

    async fn ledger_with_users(ids: &[&str]) -> RelationshipLedger {
        let store = Arc::new(MemoryStore::new());
        for id in ids {
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
        RelationshipLedger::new(store, 50)
    }

    #[tokio::test]
    async fn double_follow_yields_one_edge() {
        let ledger = ledger_with_users(&["alice", "bob"]).await;

        assert!(ledger.follow("alice", "bob").await.unwrap());
        assert!(!ledger.follow("alice", "bob").await.unwrap());

        let followers = ledger.list_followers("bob").await.unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].id, "alice");
    }

    #[tokio::test]
    async fn self_follow_rejected() {
        let ledger = ledger_with_users(&["alice"]).await;
        let err = ledger.follow("alice", "alice").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn follow_unknown_user_not_found() {
        let ledger = ledger_with_users(&["alice"]).await;
        let err = ledger.follow("alice", "ghost").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn block_removes_follows_in_both_directions() {
        let ledger = ledger_with_users(&["alice", "bob"]).await;
        ledger.follow("alice", "bob").await.unwrap();
        ledger.follow("bob", "alice").await.unwrap();

        ledger.block("alice", "bob").await.unwrap();

        assert!(ledger.list_followers("bob").await.unwrap().is_empty());
        assert!(ledger.list_followers("alice").await.unwrap().is_empty());
        assert!(ledger.is_blocked("bob", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn follow_while_blocked_is_forbidden() {
        let ledger = ledger_with_users(&["alice", "bob"]).await;
        ledger.block("alice", "bob").await.unwrap();

        // Suppressed in both directions
        let err = ledger.follow("bob", "alice").await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let err = ledger.follow("alice", "bob").await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn unblock_does_not_restore_follows() {
        let ledger = ledger_with_users(&["alice", "bob"]).await;
        ledger.follow("alice", "bob").await.unwrap();
        ledger.block("alice", "bob").await.unwrap();
        ledger.unblock("alice", "bob").await.unwrap();

        assert!(!ledger.is_blocked("alice", "bob").await.unwrap());
        assert!(ledger.list_followers("bob").await.unwrap().is_empty());
        assert!(ledger.follow("alice", "bob").await.unwrap());
    }

    #[tokio::test]
    async fn mute_is_directional_and_silent() {
        let ledger = ledger_with_users(&["alice", "bob"]).await;
        ledger.follow("alice", "bob").await.unwrap();
        ledger.mute("alice", "bob").await.unwrap();

        assert!(ledger.is_muted("alice", "bob").await.unwrap());
        assert!(!ledger.is_muted("bob", "alice").await.unwrap());
        // Follow visibility unaffected
        assert_eq!(ledger.list_followers("bob").await.unwrap().len(), 1);

        ledger.unmute("alice", "bob").await.unwrap();
        assert!(!ledger.is_muted("alice", "bob").await.unwrap());
    }

    #[tokio::test]
    async fn blocked_and_muted_listings_carry_profiles() {
        let ledger = ledger_with_users(&["alice", "bob", "carol"]).await;
        ledger.block("alice", "bob").await.unwrap();
        ledger.block("alice", "carol").await.unwrap();
        ledger.mute("alice", "carol").await.unwrap();

        let blocked = ledger.list_blocked("alice").await.unwrap();
        assert_eq!(blocked.len(), 2);
        // Most recent edge first
        assert_eq!(blocked[0].id, "carol");
        assert_eq!(blocked[0].handle, "@carol");

        let muted = ledger.list_muted("alice").await.unwrap();
        assert_eq!(muted.len(), 1);
        assert_eq!(muted[0].email, "carol@finsight.app");
    }
}
