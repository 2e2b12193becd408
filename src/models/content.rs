// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{comments, posts};

/// Model for a post (title only, used to enrich notifications)
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub created_at: NaiveDateTime,
}

/// DTO for upserting a post record
#[derive(Debug, Clone, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = posts)]
pub struct NewPost {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub created_at: NaiveDateTime,
}

/// Model for a comment, subject to ownership-guarded deletion
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

/// DTO for inserting a comment
#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}
