// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::user::PublicProfile;
use crate::schema::notifications;

/// Kind of a notification, stored as a lowercase string column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Mention,
    BreakingNews,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Follow => "follow",
            NotificationKind::Mention => "mention",
            NotificationKind::BreakingNews => "breaking_news",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "like" => Some(NotificationKind::Like),
            "comment" => Some(NotificationKind::Comment),
            "follow" => Some(NotificationKind::Follow),
            "mention" => Some(NotificationKind::Mention),
            "breaking_news" => Some(NotificationKind::BreakingNews),
            _ => None,
        }
    }
}

/// Model for a persisted notification
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: String,
    // None for system broadcasts
    pub sender_id: Option<String>,
    pub kind: String,
    pub related_post_id: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

/// DTO for inserting a new notification
#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub recipient_id: String,
    pub sender_id: Option<String>,
    pub kind: String,
    pub related_post_id: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

/// Notification enriched with the sender's profile and related post title
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDetail {
    pub id: i64,
    pub kind: String,
    pub sender: Option<PublicProfile>,
    pub related_post_id: Option<String>,
    pub related_post_title: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

/// A triggering event handed to the fan-out engine
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    // None marks a system identity that cannot be blocked or muted
    pub sender_id: Option<String>,
    pub recipient_candidates: Vec<String>,
    pub related_post_id: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Payload forwarded to delivery channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub id: i64,
    pub kind: String,
    pub sender_id: Option<String>,
    pub related_post_id: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
}

impl From<&Notification> for NotificationPayload {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind.clone(),
            sender_id: n.sender_id.clone(),
            related_post_id: n.related_post_id.clone(),
            title: n.title.clone(),
            body: n.body.clone(),
            metadata: n.metadata.clone(),
            created_at: n.created_at,
        }
    }
}

/// Query parameters for the notifications listing endpoint
#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    pub user_id: Option<String>,
    pub unread: Option<bool>,
}
