// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::api::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{NewUser, PublicProfile};

#[derive(Debug, Deserialize)]
pub struct UpsertUserRequest {
    pub id: Option<String>,
    pub handle: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Sync a user record from the external identity flow (idempotent upsert)
pub async fn upsert_user(
    State(state): State<AppState>,
    Json(req): Json<UpsertUserRequest>,
) -> ServiceResult<Json<Value>> {
    let id = req
        .id
        .ok_or_else(|| ServiceError::Validation("id is required".to_string()))?;
    let handle = req
        .handle
        .ok_or_else(|| ServiceError::Validation("handle is required".to_string()))?;
    let email = req
        .email
        .ok_or_else(|| ServiceError::Validation("email is required".to_string()))?;

    debug!(user_id = %id, "upserting user record");
    state
        .store
        .upsert_user(NewUser {
            id: id.clone(),
            handle,
            email,
            display_name: req.display_name,
            avatar_url: req.avatar_url,
            created_at: Utc::now().naive_utc(),
        })
        .await?;

    Ok(Json(json!({ "success": true, "id": id })))
}

/// Public profile projection for a user
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServiceResult<Json<PublicProfile>> {
    let user = state
        .store
        .get_user(&id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", id)))?;
    Ok(Json(PublicProfile::from(&user)))
}
