// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::{SocialStore, StoreError, StoreResult};
use crate::db::{Database, DbConnection, DbPool};
use crate::models::blocking::{BlockedDetail, MutedDetail, NewBlockEdge, NewMuteEdge};
use crate::models::content::{Comment, NewComment, NewPost, Post};
use crate::models::notification::{NewNotification, Notification, NotificationDetail};
use crate::models::social_graph::{FollowDetail, NewFollowEdge};
use crate::models::user::{NewUser, PublicProfile, User};
use crate::schema::{blocks, comments, follows, mutes, notifications, posts, users};

/// Postgres store backend over the deadpool-managed async connection pool
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.get_pool().clone(),
        }
    }

    async fn conn(&self) -> StoreResult<DbConnection> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

type ProfileRow = (String, String, Option<String>, Option<String>);

fn profile_from_row((id, handle, display_name, avatar_url): ProfileRow) -> PublicProfile {
    PublicProfile {
        id,
        handle,
        display_name,
        avatar_url,
    }
}

#[async_trait]
impl SocialStore for PgStore {
    async fn upsert_user(&self, user: NewUser) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        diesel::insert_into(users::table)
            .values(&user)
            .on_conflict(users::id)
            .do_update()
            .set(&user)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        let mut conn = self.conn().await?;
        let user = users::table
            .filter(users::id.eq(id))
            .first::<User>(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn all_user_ids(&self) -> StoreResult<Vec<String>> {
        let mut conn = self.conn().await?;
        let ids = users::table
            .select(users::id)
            .order_by(users::id.asc())
            .load::<String>(&mut conn)
            .await?;
        Ok(ids)
    }

    async fn upsert_follow(&self, follower: &str, following: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let edge = NewFollowEdge {
            follower_id: follower.to_string(),
            following_id: following.to_string(),
            created_at: Utc::now().naive_utc(),
        };
        let rows = diesel::insert_into(follows::table)
            .values(&edge)
            .on_conflict((follows::follower_id, follows::following_id))
            .do_nothing()
            .execute(&mut conn)
            .await?;
        Ok(rows > 0)
    }

    async fn remove_follow(&self, follower: &str, following: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let rows = diesel::delete(
            follows::table
                .filter(follows::follower_id.eq(follower))
                .filter(follows::following_id.eq(following)),
        )
        .execute(&mut conn)
        .await?;
        Ok(rows > 0)
    }

    async fn follow_exists(&self, follower: &str, following: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let count = follows::table
            .filter(follows::follower_id.eq(follower))
            .filter(follows::following_id.eq(following))
            .count()
            .get_result::<i64>(&mut conn)
            .await?;
        Ok(count > 0)
    }

    async fn list_followers(&self, user: &str, limit: i64) -> StoreResult<Vec<FollowDetail>> {
        let mut conn = self.conn().await?;
        let rows = follows::table
            .inner_join(users::table.on(users::id.eq(follows::follower_id)))
            .filter(follows::following_id.eq(user))
            .select((
                users::id,
                users::handle,
                users::display_name,
                users::avatar_url,
                follows::created_at,
            ))
            .order_by(follows::created_at.desc())
            .then_order_by(follows::id.desc())
            .limit(limit)
            .load::<(String, String, Option<String>, Option<String>, NaiveDateTime)>(&mut conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, handle, display_name, avatar_url, followed_at)| FollowDetail {
                id,
                handle,
                display_name,
                avatar_url,
                followed_at,
            })
            .collect())
    }

    async fn list_following(&self, user: &str, limit: i64) -> StoreResult<Vec<FollowDetail>> {
        let mut conn = self.conn().await?;
        let rows = follows::table
            .inner_join(users::table.on(users::id.eq(follows::following_id)))
            .filter(follows::follower_id.eq(user))
            .select((
                users::id,
                users::handle,
                users::display_name,
                users::avatar_url,
                follows::created_at,
            ))
            .order_by(follows::created_at.desc())
            .then_order_by(follows::id.desc())
            .limit(limit)
            .load::<(String, String, Option<String>, Option<String>, NaiveDateTime)>(&mut conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, handle, display_name, avatar_url, followed_at)| FollowDetail {
                id,
                handle,
                display_name,
                avatar_url,
                followed_at,
            })
            .collect())
    }

    async fn upsert_block(&self, blocker: &str, blocked: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let edge = NewBlockEdge {
            blocker_id: blocker.to_string(),
            blocked_id: blocked.to_string(),
            created_at: Utc::now().naive_utc(),
        };
        // The follow removal and the block upsert commit together
        let created = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    diesel::delete(
                        follows::table.filter(
                            follows::follower_id
                                .eq(blocker)
                                .and(follows::following_id.eq(blocked))
                                .or(follows::follower_id
                                    .eq(blocked)
                                    .and(follows::following_id.eq(blocker))),
                        ),
                    )
                    .execute(conn)
                    .await?;

                    let rows = diesel::insert_into(blocks::table)
                        .values(&edge)
                        .on_conflict((blocks::blocker_id, blocks::blocked_id))
                        .do_nothing()
                        .execute(conn)
                        .await?;
                    Ok(rows > 0)
                }
                .scope_boxed()
            })
            .await?;
        Ok(created)
    }

    async fn remove_block(&self, blocker: &str, blocked: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let rows = diesel::delete(
            blocks::table
                .filter(blocks::blocker_id.eq(blocker))
                .filter(blocks::blocked_id.eq(blocked)),
        )
        .execute(&mut conn)
        .await?;
        Ok(rows > 0)
    }

    async fn block_exists_between(&self, a: &str, b: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let count = blocks::table
            .filter(
                blocks::blocker_id
                    .eq(a)
                    .and(blocks::blocked_id.eq(b))
                    .or(blocks::blocker_id.eq(b).and(blocks::blocked_id.eq(a))),
            )
            .count()
            .get_result::<i64>(&mut conn)
            .await?;
        Ok(count > 0)
    }

    async fn list_blocked(&self, user: &str) -> StoreResult<Vec<BlockedDetail>> {
        let mut conn = self.conn().await?;
        let rows = blocks::table
            .inner_join(users::table.on(users::id.eq(blocks::blocked_id)))
            .filter(blocks::blocker_id.eq(user))
            .select((
                users::id,
                users::handle,
                users::email,
                users::avatar_url,
                blocks::created_at,
            ))
            .order_by(blocks::created_at.desc())
            .then_order_by(blocks::id.desc())
            .load::<(String, String, String, Option<String>, NaiveDateTime)>(&mut conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, handle, email, avatar_url, blocked_at)| BlockedDetail {
                id,
                handle,
                email,
                avatar_url,
                blocked_at,
            })
            .collect())
    }

    async fn upsert_mute(&self, muter: &str, muted: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let edge = NewMuteEdge {
            muter_id: muter.to_string(),
            muted_id: muted.to_string(),
            created_at: Utc::now().naive_utc(),
        };
        let rows = diesel::insert_into(mutes::table)
            .values(&edge)
            .on_conflict((mutes::muter_id, mutes::muted_id))
            .do_nothing()
            .execute(&mut conn)
            .await?;
        Ok(rows > 0)
    }

    async fn remove_mute(&self, muter: &str, muted: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let rows = diesel::delete(
            mutes::table
                .filter(mutes::muter_id.eq(muter))
                .filter(mutes::muted_id.eq(muted)),
        )
        .execute(&mut conn)
        .await?;
        Ok(rows > 0)
    }

    async fn mute_exists(&self, muter: &str, muted: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let count = mutes::table
            .filter(mutes::muter_id.eq(muter))
            .filter(mutes::muted_id.eq(muted))
            .count()
            .get_result::<i64>(&mut conn)
            .await?;
        Ok(count > 0)
    }

    async fn list_muted(&self, user: &str) -> StoreResult<Vec<MutedDetail>> {
        let mut conn = self.conn().await?;
        let rows = mutes::table
            .inner_join(users::table.on(users::id.eq(mutes::muted_id)))
            .filter(mutes::muter_id.eq(user))
            .select((
                users::id,
                users::handle,
                users::email,
                users::avatar_url,
                mutes::created_at,
            ))
            .order_by(mutes::created_at.desc())
            .then_order_by(mutes::id.desc())
            .load::<(String, String, String, Option<String>, NaiveDateTime)>(&mut conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, handle, email, avatar_url, muted_at)| MutedDetail {
                id,
                handle,
                email,
                avatar_url,
                muted_at,
            })
            .collect())
    }

    async fn insert_notification(&self, new: NewNotification) -> StoreResult<Notification> {
        let mut conn = self.conn().await?;
        let notification = diesel::insert_into(notifications::table)
            .values(&new)
            .get_result::<Notification>(&mut conn)
            .await?;
        Ok(notification)
    }

    async fn get_notification(&self, id: i64) -> StoreResult<Option<Notification>> {
        let mut conn = self.conn().await?;
        let notification = notifications::table
            .filter(notifications::id.eq(id))
            .first::<Notification>(&mut conn)
            .await
            .optional()?;
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        user: &str,
        unread_only: bool,
        limit: i64,
    ) -> StoreResult<Vec<NotificationDetail>> {
        let mut conn = self.conn().await?;

        let mut query = notifications::table
            .left_join(users::table.on(users::id.nullable().eq(notifications::sender_id)))
            .left_join(posts::table.on(posts::id.nullable().eq(notifications::related_post_id)))
            .filter(notifications::recipient_id.eq(user))
            .select((
                notifications::id,
                notifications::kind,
                (
                    users::id,
                    users::handle,
                    users::display_name,
                    users::avatar_url,
                )
                    .nullable(),
                notifications::related_post_id,
                posts::title.nullable(),
                notifications::title,
                notifications::body,
                notifications::metadata,
                notifications::is_read,
                notifications::created_at,
            ))
            .order_by(notifications::created_at.desc())
            .then_order_by(notifications::id.desc())
            .limit(limit)
            .into_boxed();

        if unread_only {
            query = query.filter(notifications::is_read.eq(false));
        }

        let rows = query
            .load::<(
                i64,
                String,
                Option<ProfileRow>,
                Option<String>,
                Option<String>,
                Option<String>,
                Option<String>,
                Option<serde_json::Value>,
                bool,
                NaiveDateTime,
            )>(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    id,
                    kind,
                    sender,
                    related_post_id,
                    related_post_title,
                    title,
                    body,
                    metadata,
                    is_read,
                    created_at,
                )| NotificationDetail {
                    id,
                    kind,
                    sender: sender.map(profile_from_row),
                    related_post_id,
                    related_post_title,
                    title,
                    body,
                    metadata,
                    is_read,
                    created_at,
                },
            )
            .collect())
    }

    async fn mark_notification_read(&self, id: i64) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let rows = diesel::update(
            notifications::table
                .filter(notifications::id.eq(id))
                .filter(notifications::is_read.eq(false)),
        )
        .set(notifications::is_read.eq(true))
        .execute(&mut conn)
        .await?;
        Ok(rows > 0)
    }

    async fn mark_all_read(&self, user: &str) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        let rows = diesel::update(
            notifications::table
                .filter(notifications::recipient_id.eq(user))
                .filter(notifications::is_read.eq(false)),
        )
        .set(notifications::is_read.eq(true))
        .execute(&mut conn)
        .await?;
        Ok(rows as u64)
    }

    async fn unread_count(&self, user: &str) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        let count = notifications::table
            .filter(notifications::recipient_id.eq(user))
            .filter(notifications::is_read.eq(false))
            .count()
            .get_result::<i64>(&mut conn)
            .await?;
        Ok(count)
    }

    async fn upsert_post(&self, post: NewPost) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        diesel::insert_into(posts::table)
            .values(&post)
            .on_conflict(posts::id)
            .do_update()
            .set(&post)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_post(&self, id: &str) -> StoreResult<Option<Post>> {
        let mut conn = self.conn().await?;
        let post = posts::table
            .filter(posts::id.eq(id))
            .first::<Post>(&mut conn)
            .await
            .optional()?;
        Ok(post)
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        diesel::insert_into(comments::table)
            .values(&comment)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_comment(&self, id: &str) -> StoreResult<Option<Comment>> {
        let mut conn = self.conn().await?;
        let comment = comments::table
            .filter(comments::id.eq(id))
            .first::<Comment>(&mut conn)
            .await
            .optional()?;
        Ok(comment)
    }

    async fn delete_comment(&self, id: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let rows = diesel::delete(comments::table.filter(comments::id.eq(id)))
            .execute(&mut conn)
            .await?;
        Ok(rows > 0)
    }
}
