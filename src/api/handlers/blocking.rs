// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::api::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models::social_graph::EdgeRequest;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

fn require_caller(query: UserQuery) -> ServiceResult<String> {
    query
        .user_id
        .ok_or_else(|| ServiceError::Authentication("user_id is required".to_string()))
}

fn edge_parties(req: EdgeRequest) -> ServiceResult<(String, String)> {
    let user_id = req
        .user_id
        .ok_or_else(|| ServiceError::Authentication("user_id is required".to_string()))?;
    let target_id = req
        .target_id
        .ok_or_else(|| ServiceError::Validation("target_id is required".to_string()))?;
    Ok((user_id, target_id))
}

/// Block a user; drops follow edges between the pair in both directions
pub async fn block(
    State(state): State<AppState>,
    Json(req): Json<EdgeRequest>,
) -> ServiceResult<Json<Value>> {
    let (user_id, target_id) = edge_parties(req)?;
    let created = state.ledger.block(&user_id, &target_id).await?;
    Ok(Json(json!({ "success": true, "created": created })))
}

/// Remove a block edge; prior follows are not restored
pub async fn unblock(
    State(state): State<AppState>,
    Json(req): Json<EdgeRequest>,
) -> ServiceResult<Json<Value>> {
    let (user_id, target_id) = edge_parties(req)?;
    let removed = state.ledger.unblock(&user_id, &target_id).await?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}

pub async fn mute(
    State(state): State<AppState>,
    Json(req): Json<EdgeRequest>,
) -> ServiceResult<Json<Value>> {
    let (user_id, target_id) = edge_parties(req)?;
    let created = state.ledger.mute(&user_id, &target_id).await?;
    Ok(Json(json!({ "success": true, "created": created })))
}

pub async fn unmute(
    State(state): State<AppState>,
    Json(req): Json<EdgeRequest>,
) -> ServiceResult<Json<Value>> {
    let (user_id, target_id) = edge_parties(req)?;
    let removed = state.ledger.unmute(&user_id, &target_id).await?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}

/// Get users blocked by the caller, most recent first
pub async fn get_blocked(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ServiceResult<Json<Value>> {
    let user_id = require_caller(query)?;
    debug!(user_id = %user_id, "listing blocked users");
    let blocked = state.ledger.list_blocked(&user_id).await?;
    let total = blocked.len();
    Ok(Json(json!({ "blocked": blocked, "total": total })))
}

/// Get users muted by the caller, most recent first
pub async fn get_muted(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ServiceResult<Json<Value>> {
    let user_id = require_caller(query)?;
    debug!(user_id = %user_id, "listing muted users");
    let muted = state.ledger.list_muted(&user_id).await?;
    let total = muted.len();
    Ok(Json(json!({ "muted": muted, "total": total })))
}
