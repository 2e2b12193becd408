// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{blocks, mutes};

/// Model for a block edge - blocker revokes mutual visibility with blocked
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = blocks)]
pub struct BlockEdge {
    pub id: i32,
    pub blocker_id: String,
    pub blocked_id: String,
    pub created_at: NaiveDateTime,
}

/// DTO for inserting a new block edge
#[derive(Debug, Insertable, Serialize, Deserialize)]
#[diesel(table_name = blocks)]
pub struct NewBlockEdge {
    pub blocker_id: String,
    pub blocked_id: String,
    pub created_at: NaiveDateTime,
}

/// Model for a mute edge - one-directional, silent
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = mutes)]
pub struct MuteEdge {
    pub id: i32,
    pub muter_id: String,
    pub muted_id: String,
    pub created_at: NaiveDateTime,
}

/// DTO for inserting a new mute edge
#[derive(Debug, Insertable, Serialize, Deserialize)]
#[diesel(table_name = mutes)]
pub struct NewMuteEdge {
    pub muter_id: String,
    pub muted_id: String,
    pub created_at: NaiveDateTime,
}

/// Entry in a blocked-users listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedDetail {
    pub id: String,
    pub handle: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub blocked_at: NaiveDateTime,
}

/// Entry in a muted-users listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutedDetail {
    pub id: String,
    pub handle: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub muted_at: NaiveDateTime,
}
