// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

// Import diesel table macros
use diesel::table;
use diesel::allow_tables_to_appear_in_same_query;

// Canonical user records, created by the external identity flow
table! {
    users (id) {
        id -> Varchar,
        handle -> Varchar,
        email -> Varchar,
        display_name -> Nullable<Varchar>,
        avatar_url -> Nullable<Varchar>,
        created_at -> Timestamp,
    }
}

// Directed follow edges, unique per ordered pair
table! {
    follows (id) {
        id -> Integer,
        follower_id -> Varchar,
        following_id -> Varchar,
        created_at -> Timestamp,
    }
}

// Directed block edges, unique per ordered pair
table! {
    blocks (id) {
        id -> Integer,
        blocker_id -> Varchar,
        blocked_id -> Varchar,
        created_at -> Timestamp,
    }
}

// Directed mute edges, unique per ordered pair
table! {
    mutes (id) {
        id -> Integer,
        muter_id -> Varchar,
        muted_id -> Varchar,
        created_at -> Timestamp,
    }
}

// Notifications, created only by the fan-out engine
table! {
    notifications (id) {
        id -> Bigint,
        recipient_id -> Varchar,
        sender_id -> Nullable<Varchar>,
        kind -> Varchar,
        related_post_id -> Nullable<Varchar>,
        title -> Nullable<Varchar>,
        body -> Nullable<Text>,
        metadata -> Nullable<Jsonb>,
        is_read -> Bool,
        created_at -> Timestamp,
    }
}

// Minimal content records for enrichment and ownership checks
table! {
    posts (id) {
        id -> Varchar,
        author_id -> Varchar,
        title -> Varchar,
        created_at -> Timestamp,
    }
}

table! {
    comments (id) {
        id -> Varchar,
        post_id -> Varchar,
        author_id -> Varchar,
        body -> Text,
        created_at -> Timestamp,
    }
}

// Allow joining the tables if needed
allow_tables_to_appear_in_same_query!(
    users,
    follows,
    blocks,
    mutes,
    notifications,
    posts,
    comments,
);
