// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{SocialStore, StoreResult};
use crate::models::blocking::{BlockedDetail, MutedDetail};
use crate::models::content::{Comment, NewComment, NewPost, Post};
use crate::models::notification::{NewNotification, Notification, NotificationDetail};
use crate::models::social_graph::FollowDetail;
use crate::models::user::{NewUser, PublicProfile, User};

/// A directed edge keyed by ordered pair; `seq` breaks timestamp ties so
/// most-recent-first ordering stays deterministic.
#[derive(Debug, Clone)]
struct Edge {
    created_at: NaiveDateTime,
    seq: u64,
}

#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    follows: HashMap<(String, String), Edge>,
    blocks: HashMap<(String, String), Edge>,
    mutes: HashMap<(String, String), Edge>,
    notifications: BTreeMap<i64, Notification>,
    posts: HashMap<String, Post>,
    comments: HashMap<String, Comment>,
    next_notification_id: i64,
    next_seq: u64,
}

impl State {
    fn next_edge(&mut self) -> Edge {
        self.next_seq += 1;
        Edge {
            created_at: Utc::now().naive_utc(),
            seq: self.next_seq,
        }
    }
}

/// In-process store backend. A single write lock makes every upsert atomic,
/// mirroring the unique-constraint guarantees of the Postgres backend.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(a: &str, b: &str) -> (String, String) {
    (a.to_string(), b.to_string())
}

/// Most-recent-edge-first ordering over (other party, edge) pairs
fn sort_recent_first<T>(entries: &mut Vec<(T, Edge)>) {
    entries.sort_by(|a, b| {
        (b.1.created_at, b.1.seq).cmp(&(a.1.created_at, a.1.seq))
    });
}

#[async_trait]
impl SocialStore for MemoryStore {
    async fn upsert_user(&self, user: NewUser) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.users.insert(
            user.id.clone(),
            User {
                id: user.id,
                handle: user.handle,
                email: user.email,
                display_name: user.display_name,
                avatar_url: user.avatar_url,
                created_at: user.created_at,
            },
        );
        Ok(())
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(id).cloned())
    }

    async fn all_user_ids(&self) -> StoreResult<Vec<String>> {
        let state = self.state.read().await;
        let mut ids: Vec<String> = state.users.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn upsert_follow(&self, follower: &str, following: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let k = key(follower, following);
        if state.follows.contains_key(&k) {
            return Ok(false);
        }
        let edge = state.next_edge();
        state.follows.insert(k, edge);
        Ok(true)
    }

    async fn remove_follow(&self, follower: &str, following: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.follows.remove(&key(follower, following)).is_some())
    }

    async fn follow_exists(&self, follower: &str, following: &str) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state.follows.contains_key(&key(follower, following)))
    }

    async fn list_followers(&self, user: &str, limit: i64) -> StoreResult<Vec<FollowDetail>> {
        let state = self.state.read().await;
        let mut entries: Vec<(String, Edge)> = state
            .follows
            .iter()
            .filter(|((_, following), _)| following == user)
            .map(|((follower, _), edge)| (follower.clone(), edge.clone()))
            .collect();
        sort_recent_first(&mut entries);
        Ok(entries
            .into_iter()
            .take(limit as usize)
            .filter_map(|(id, edge)| {
                state.users.get(&id).map(|u| FollowDetail {
                    id: u.id.clone(),
                    handle: u.handle.clone(),
                    display_name: u.display_name.clone(),
                    avatar_url: u.avatar_url.clone(),
                    followed_at: edge.created_at,
                })
            })
            .collect())
    }

    async fn list_following(&self, user: &str, limit: i64) -> StoreResult<Vec<FollowDetail>> {
        let state = self.state.read().await;
        let mut entries: Vec<(String, Edge)> = state
            .follows
            .iter()
            .filter(|((follower, _), _)| follower == user)
            .map(|((_, following), edge)| (following.clone(), edge.clone()))
            .collect();
        sort_recent_first(&mut entries);
        Ok(entries
            .into_iter()
            .take(limit as usize)
            .filter_map(|(id, edge)| {
                state.users.get(&id).map(|u| FollowDetail {
                    id: u.id.clone(),
                    handle: u.handle.clone(),
                    display_name: u.display_name.clone(),
                    avatar_url: u.avatar_url.clone(),
                    followed_at: edge.created_at,
                })
            })
            .collect())
    }

    async fn upsert_block(&self, blocker: &str, blocked: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        // A block revokes mutual visibility: drop follows in both directions
        state.follows.remove(&key(blocker, blocked));
        state.follows.remove(&key(blocked, blocker));
        let k = key(blocker, blocked);
        if state.blocks.contains_key(&k) {
            return Ok(false);
        }
        let edge = state.next_edge();
        state.blocks.insert(k, edge);
        Ok(true)
    }

    async fn remove_block(&self, blocker: &str, blocked: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.blocks.remove(&key(blocker, blocked)).is_some())
    }

    async fn block_exists_between(&self, a: &str, b: &str) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state.blocks.contains_key(&key(a, b)) || state.blocks.contains_key(&key(b, a)))
    }

    async fn list_blocked(&self, user: &str) -> StoreResult<Vec<BlockedDetail>> {
        let state = self.state.read().await;
        let mut entries: Vec<(String, Edge)> = state
            .blocks
            .iter()
            .filter(|((blocker, _), _)| blocker == user)
            .map(|((_, blocked), edge)| (blocked.clone(), edge.clone()))
            .collect();
        sort_recent_first(&mut entries);
        Ok(entries
            .into_iter()
            .filter_map(|(id, edge)| {
                state.users.get(&id).map(|u| BlockedDetail {
                    id: u.id.clone(),
                    handle: u.handle.clone(),
                    email: u.email.clone(),
                    avatar_url: u.avatar_url.clone(),
                    blocked_at: edge.created_at,
                })
            })
            .collect())
    }

    async fn upsert_mute(&self, muter: &str, muted: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let k = key(muter, muted);
        if state.mutes.contains_key(&k) {
            return Ok(false);
        }
        let edge = state.next_edge();
        state.mutes.insert(k, edge);
        Ok(true)
    }

    async fn remove_mute(&self, muter: &str, muted: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.mutes.remove(&key(muter, muted)).is_some())
    }

    async fn mute_exists(&self, muter: &str, muted: &str) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state.mutes.contains_key(&key(muter, muted)))
    }

    async fn list_muted(&self, user: &str) -> StoreResult<Vec<MutedDetail>> {
        let state = self.state.read().await;
        let mut entries: Vec<(String, Edge)> = state
            .mutes
            .iter()
            .filter(|((muter, _), _)| muter == user)
            .map(|((_, muted), edge)| (muted.clone(), edge.clone()))
            .collect();
        sort_recent_first(&mut entries);
        Ok(entries
            .into_iter()
            .filter_map(|(id, edge)| {
                state.users.get(&id).map(|u| MutedDetail {
                    id: u.id.clone(),
                    handle: u.handle.clone(),
                    email: u.email.clone(),
                    avatar_url: u.avatar_url.clone(),
                    muted_at: edge.created_at,
                })
            })
            .collect())
    }

    async fn insert_notification(&self, new: NewNotification) -> StoreResult<Notification> {
        let mut state = self.state.write().await;
        state.next_notification_id += 1;
        let id = state.next_notification_id;
        let notification = Notification {
            id,
            recipient_id: new.recipient_id,
            sender_id: new.sender_id,
            kind: new.kind,
            related_post_id: new.related_post_id,
            title: new.title,
            body: new.body,
            metadata: new.metadata,
            is_read: new.is_read,
            created_at: new.created_at,
        };
        state.notifications.insert(id, notification.clone());
        Ok(notification)
    }

    async fn get_notification(&self, id: i64) -> StoreResult<Option<Notification>> {
        let state = self.state.read().await;
        Ok(state.notifications.get(&id).cloned())
    }

    async fn list_notifications(
        &self,
        user: &str,
        unread_only: bool,
        limit: i64,
    ) -> StoreResult<Vec<NotificationDetail>> {
        let state = self.state.read().await;
        // Ids are monotonic, so reverse id order is newest-first
        Ok(state
            .notifications
            .values()
            .rev()
            .filter(|n| n.recipient_id == user && (!unread_only || !n.is_read))
            .take(limit as usize)
            .map(|n| NotificationDetail {
                id: n.id,
                kind: n.kind.clone(),
                sender: n
                    .sender_id
                    .as_ref()
                    .and_then(|id| state.users.get(id))
                    .map(PublicProfile::from),
                related_post_id: n.related_post_id.clone(),
                related_post_title: n
                    .related_post_id
                    .as_ref()
                    .and_then(|id| state.posts.get(id))
                    .map(|p| p.title.clone()),
                title: n.title.clone(),
                body: n.body.clone(),
                metadata: n.metadata.clone(),
                is_read: n.is_read,
                created_at: n.created_at,
            })
            .collect())
    }

    async fn mark_notification_read(&self, id: i64) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.notifications.get_mut(&id) {
            Some(n) if !n.is_read => {
                n.is_read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_read(&self, user: &str) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for n in state.notifications.values_mut() {
            if n.recipient_id == user && !n.is_read {
                n.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn unread_count(&self, user: &str) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .values()
            .filter(|n| n.recipient_id == user && !n.is_read)
            .count() as i64)
    }

    async fn upsert_post(&self, post: NewPost) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.posts.insert(
            post.id.clone(),
            Post {
                id: post.id,
                author_id: post.author_id,
                title: post.title,
                created_at: post.created_at,
            },
        );
        Ok(())
    }

    async fn get_post(&self, id: &str) -> StoreResult<Option<Post>> {
        let state = self.state.read().await;
        Ok(state.posts.get(id).cloned())
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.comments.insert(
            comment.id.clone(),
            Comment {
                id: comment.id,
                post_id: comment.post_id,
                author_id: comment.author_id,
                body: comment.body,
                created_at: comment.created_at,
            },
        );
        Ok(())
    }

    async fn get_comment(&self, id: &str) -> StoreResult<Option<Comment>> {
        let state = self.state.read().await;
        Ok(state.comments.get(id).cloned())
    }

    async fn delete_comment(&self, id: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.comments.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NotificationKind;

    fn user(id: &str) -> NewUser {
        NewUser {
            id: id.to_string(),
            handle: format!("@{}", id),
            email: format!("{}@finsight.app", id),
            display_name: None,
            avatar_url: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[tokio::test]
    async fn follow_upsert_is_idempotent() {
        let store = MemoryStore::new();
        store.upsert_user(user("a")).await.unwrap();
        store.upsert_user(user("b")).await.unwrap();

        assert!(store.upsert_follow("a", "b").await.unwrap());
        assert!(!store.upsert_follow("a", "b").await.unwrap());

        let followers = store.list_followers("b", 50).await.unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].id, "a");
    }

    #[tokio::test]
    async fn block_drops_follows_both_directions() {
        let store = MemoryStore::new();
        for id in ["a", "b"] {
            store.upsert_user(user(id)).await.unwrap();
        }
        store.upsert_follow("a", "b").await.unwrap();
        store.upsert_follow("b", "a").await.unwrap();

        store.upsert_block("a", "b").await.unwrap();

        assert!(!store.follow_exists("a", "b").await.unwrap());
        assert!(!store.follow_exists("b", "a").await.unwrap());
        assert!(store.block_exists_between("b", "a").await.unwrap());
    }

    #[tokio::test]
    async fn listings_are_most_recent_first() {
        let store = MemoryStore::new();
        for id in ["a", "b", "c"] {
            store.upsert_user(user(id)).await.unwrap();
        }
        store.upsert_follow("b", "a").await.unwrap();
        store.upsert_follow("c", "a").await.unwrap();

        let followers = store.list_followers("a", 50).await.unwrap();
        assert_eq!(followers.len(), 2);
        assert_eq!(followers[0].id, "c");
        assert_eq!(followers[1].id, "b");
    }

    #[tokio::test]
    async fn notification_read_transitions_once() {
        let store = MemoryStore::new();
        store.upsert_user(user("a")).await.unwrap();
        let n = store
            .insert_notification(NewNotification {
                recipient_id: "a".to_string(),
                sender_id: None,
                kind: NotificationKind::BreakingNews.as_str().to_string(),
                related_post_id: None,
                title: Some("Market Alert".to_string()),
                body: Some("S&P -3%".to_string()),
                metadata: None,
                is_read: false,
                created_at: Utc::now().naive_utc(),
            })
            .await
            .unwrap();

        assert!(store.mark_notification_read(n.id).await.unwrap());
        assert!(!store.mark_notification_read(n.id).await.unwrap());
        assert_eq!(store.unread_count("a").await.unwrap(), 0);
    }
}
