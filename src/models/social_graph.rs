// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::follows;

/// Model for a follow edge (directed)
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = follows)]
pub struct FollowEdge {
    pub id: i32,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: NaiveDateTime,
}

/// DTO for creating a new follow edge
#[derive(Debug, Insertable, Serialize, Deserialize)]
#[diesel(table_name = follows)]
pub struct NewFollowEdge {
    pub follower_id: String,
    pub following_id: String,
    pub created_at: NaiveDateTime,
}

/// DTO for listing followers/following with profile details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowDetail {
    pub id: String,
    pub handle: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    // When the relationship was created
    pub followed_at: NaiveDateTime,
}

/// Request body for follow/unfollow/block/unblock/mute/unmute mutations
#[derive(Debug, Deserialize)]
pub struct EdgeRequest {
    pub user_id: Option<String>,
    pub target_id: Option<String>,
}
