// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models::notification::{NotificationEvent, NotificationKind};
use crate::models::social_graph::EdgeRequest;

fn edge_parties(req: EdgeRequest) -> ServiceResult<(String, String)> {
    let user_id = req
        .user_id
        .ok_or_else(|| ServiceError::Authentication("user_id is required".to_string()))?;
    let target_id = req
        .target_id
        .ok_or_else(|| ServiceError::Validation("target_id is required".to_string()))?;
    Ok((user_id, target_id))
}

/// Get the profiles following a user, most recent first
pub async fn get_followers(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ServiceResult<Json<Value>> {
    debug!(user_id = %user_id, "listing followers");
    let followers = state.ledger.list_followers(&user_id).await?;
    let total = followers.len();
    Ok(Json(json!({
        "followers": followers,
        "total": total,
    })))
}

/// Get the profiles a user is following, most recent first
pub async fn get_following(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ServiceResult<Json<Value>> {
    debug!(user_id = %user_id, "listing following");
    let following = state.ledger.list_following(&user_id).await?;
    let total = following.len();
    Ok(Json(json!({
        "following": following,
        "total": total,
    })))
}

/// Create a follow edge; notifies the followee on a new edge
pub async fn follow(
    State(state): State<AppState>,
    Json(req): Json<EdgeRequest>,
) -> ServiceResult<Json<Value>> {
    let (user_id, target_id) = edge_parties(req)?;
    let created = state.ledger.follow(&user_id, &target_id).await?;

    if created {
        // Fan-out is best-effort; a delivery hiccup must not fail the follow
        if let Err(e) = state
            .engine
            .emit(NotificationEvent {
                kind: NotificationKind::Follow,
                sender_id: Some(user_id.clone()),
                recipient_candidates: vec![target_id.clone()],
                related_post_id: None,
                title: None,
                body: None,
                metadata: None,
            })
            .await
        {
            warn!(error = %e, "failed to emit follow notification");
        }
    }

    Ok(Json(json!({ "success": true, "created": created })))
}

/// Remove a follow edge; no error if it was absent
pub async fn unfollow(
    State(state): State<AppState>,
    Json(req): Json<EdgeRequest>,
) -> ServiceResult<Json<Value>> {
    let (user_id, target_id) = edge_parties(req)?;
    let removed = state.ledger.unfollow(&user_id, &target_id).await?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}
