// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::blocking::{BlockedDetail, MutedDetail};
use crate::models::content::{Comment, NewComment, NewPost, Post};
use crate::models::notification::{NewNotification, Notification, NotificationDetail};
use crate::models::social_graph::FollowDetail;
use crate::models::user::{NewUser, User};

/// Errors surfaced by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam shared by the relationship ledger and the fan-out engine.
///
/// Every mutation is an atomic idempotent upsert or conditional update keyed
/// by the natural unique constraint (ordered pair, or notification id), so
/// concurrent duplicate calls converge instead of racing.
#[async_trait]
pub trait SocialStore: Send + Sync {
    // Users
    async fn upsert_user(&self, user: NewUser) -> StoreResult<()>;
    async fn get_user(&self, id: &str) -> StoreResult<Option<User>>;
    async fn all_user_ids(&self) -> StoreResult<Vec<String>>;

    // Follow edges
    /// Returns true if a new edge was created, false if it already existed.
    async fn upsert_follow(&self, follower: &str, following: &str) -> StoreResult<bool>;
    async fn remove_follow(&self, follower: &str, following: &str) -> StoreResult<bool>;
    async fn follow_exists(&self, follower: &str, following: &str) -> StoreResult<bool>;
    async fn list_followers(&self, user: &str, limit: i64) -> StoreResult<Vec<FollowDetail>>;
    async fn list_following(&self, user: &str, limit: i64) -> StoreResult<Vec<FollowDetail>>;

    // Block edges
    /// Upserts the block edge and removes follow edges between the pair in
    /// both directions, as one atomic step.
    async fn upsert_block(&self, blocker: &str, blocked: &str) -> StoreResult<bool>;
    async fn remove_block(&self, blocker: &str, blocked: &str) -> StoreResult<bool>;
    /// True if a block exists in either direction between the pair.
    async fn block_exists_between(&self, a: &str, b: &str) -> StoreResult<bool>;
    async fn list_blocked(&self, user: &str) -> StoreResult<Vec<BlockedDetail>>;

    // Mute edges
    async fn upsert_mute(&self, muter: &str, muted: &str) -> StoreResult<bool>;
    async fn remove_mute(&self, muter: &str, muted: &str) -> StoreResult<bool>;
    /// Directional: true only if `muter` has muted `muted`.
    async fn mute_exists(&self, muter: &str, muted: &str) -> StoreResult<bool>;
    async fn list_muted(&self, user: &str) -> StoreResult<Vec<MutedDetail>>;

    // Notifications
    async fn insert_notification(&self, new: NewNotification) -> StoreResult<Notification>;
    async fn get_notification(&self, id: i64) -> StoreResult<Option<Notification>>;
    async fn list_notifications(
        &self,
        user: &str,
        unread_only: bool,
        limit: i64,
    ) -> StoreResult<Vec<NotificationDetail>>;
    /// Returns true if the row transitioned unread -> read.
    async fn mark_notification_read(&self, id: i64) -> StoreResult<bool>;
    /// Bulk conditional update; returns rows affected.
    async fn mark_all_read(&self, user: &str) -> StoreResult<u64>;
    async fn unread_count(&self, user: &str) -> StoreResult<i64>;

    // Content
    async fn upsert_post(&self, post: NewPost) -> StoreResult<()>;
    async fn get_post(&self, id: &str) -> StoreResult<Option<Post>>;
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<()>;
    async fn get_comment(&self, id: &str) -> StoreResult<Option<Comment>>;
    async fn delete_comment(&self, id: &str) -> StoreResult<bool>;
}
