// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models::content::{NewComment, NewPost};
use crate::models::notification::{NotificationEvent, NotificationKind};

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub user_id: Option<String>,
    pub id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub user_id: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallerRequest {
    pub user_id: Option<String>,
}

fn require_caller(user_id: Option<String>) -> ServiceResult<String> {
    user_id.ok_or_else(|| ServiceError::Authentication("user_id is required".to_string()))
}

fn generated_id(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

/// Record a post (title only; content itself lives upstream)
pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> ServiceResult<Json<Value>> {
    let author_id = require_caller(req.user_id)?;
    let title = req
        .title
        .ok_or_else(|| ServiceError::Validation("title is required".to_string()))?;
    state
        .store
        .get_user(&author_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", author_id)))?;

    let id = req.id.unwrap_or_else(|| generated_id("post"));
    state
        .store
        .upsert_post(NewPost {
            id: id.clone(),
            author_id,
            title,
            created_at: Utc::now().naive_utc(),
        })
        .await?;

    Ok(Json(json!({ "success": true, "id": id })))
}

/// Comment on a post; notifies the post author
pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> ServiceResult<Json<Value>> {
    let author_id = require_caller(req.user_id)?;
    let body = req
        .body
        .ok_or_else(|| ServiceError::Validation("body is required".to_string()))?;
    state
        .store
        .get_user(&author_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", author_id)))?;
    let post = state
        .store
        .get_post(&post_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Post not found: {}", post_id)))?;

    let id = generated_id("comment");
    state
        .store
        .insert_comment(NewComment {
            id: id.clone(),
            post_id: post_id.clone(),
            author_id: author_id.clone(),
            body,
            created_at: Utc::now().naive_utc(),
        })
        .await?;
    debug!(comment_id = %id, post_id = %post_id, "comment created");

    if let Err(e) = state
        .engine
        .emit(NotificationEvent {
            kind: NotificationKind::Comment,
            sender_id: Some(author_id),
            recipient_candidates: vec![post.author_id],
            related_post_id: Some(post_id),
            title: None,
            body: None,
            metadata: None,
        })
        .await
    {
        warn!(error = %e, "failed to emit comment notification");
    }

    Ok(Json(json!({ "success": true, "id": id })))
}

/// Like a post; notifies the post author
pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(req): Json<CallerRequest>,
) -> ServiceResult<Json<Value>> {
    let user_id = require_caller(req.user_id)?;
    state
        .store
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", user_id)))?;
    let post = state
        .store
        .get_post(&post_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Post not found: {}", post_id)))?;

    if let Err(e) = state
        .engine
        .emit(NotificationEvent {
            kind: NotificationKind::Like,
            sender_id: Some(user_id),
            recipient_candidates: vec![post.author_id],
            related_post_id: Some(post_id),
            title: None,
            body: None,
            metadata: None,
        })
        .await
    {
        warn!(error = %e, "failed to emit like notification");
    }

    Ok(Json(json!({ "success": true })))
}

/// Delete a comment; only its author may do so
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Json(req): Json<CallerRequest>,
) -> ServiceResult<Json<Value>> {
    let caller = require_caller(req.user_id)?;
    let comment = state
        .store
        .get_comment(&comment_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Comment not found: {}", comment_id)))?;

    if comment.author_id != caller {
        return Err(ServiceError::Forbidden(
            "Comment belongs to another user".to_string(),
        ));
    }

    state.store.delete_comment(&comment_id).await?;
    Ok(Json(json!({ "success": true })))
}
