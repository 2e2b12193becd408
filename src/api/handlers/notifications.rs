// Copyright (c) Finsight Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::api::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models::notification::NotificationsQuery;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallerRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BreakingNewsRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub ticker: Option<String>,
    pub url: Option<String>,
}

fn require_caller(user_id: Option<String>) -> ServiceResult<String> {
    user_id.ok_or_else(|| ServiceError::Authentication("user_id is required".to_string()))
}

/// Most-recent notifications for a user, capped at the configured page size
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationsQuery>,
) -> ServiceResult<Json<Value>> {
    let user_id = require_caller(query.user_id)?;
    let unread_only = query.unread.unwrap_or(false);
    debug!(user_id = %user_id, unread_only, "listing notifications");

    let notifications = state.engine.list_for_user(&user_id, unread_only).await?;
    let total = notifications.len();
    Ok(Json(json!({
        "notifications": notifications,
        "total": total,
    })))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ServiceResult<Json<Value>> {
    let user_id = require_caller(query.user_id)?;
    let count = state.engine.unread_count(&user_id).await?;
    Ok(Json(json!({ "count": count })))
}

/// Transition a single notification to read (recipient only, idempotent)
pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
    Json(req): Json<CallerRequest>,
) -> ServiceResult<Json<Value>> {
    let caller = require_caller(req.user_id)?;
    state.engine.mark_read(notification_id, &caller).await?;
    Ok(Json(json!({ "success": true })))
}

/// Transition every unread notification for the caller to read
pub async fn mark_all_read(
    State(state): State<AppState>,
    Json(req): Json<CallerRequest>,
) -> ServiceResult<Json<Value>> {
    let caller = require_caller(req.user_id)?;
    let updated = state.engine.mark_all_read(&caller).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Marked {} notifications as read", updated),
        "updated": updated,
    })))
}

/// Broadcast breaking news to all known users under the system identity
pub async fn send_breaking_news(
    State(state): State<AppState>,
    Json(req): Json<BreakingNewsRequest>,
) -> ServiceResult<Json<Value>> {
    let title = req.title.unwrap_or_default();
    let body = req.body.unwrap_or_default();

    let mut meta = serde_json::Map::new();
    if let Some(ticker) = req.ticker {
        meta.insert("ticker".to_string(), Value::String(ticker));
    }
    if let Some(url) = req.url {
        meta.insert("url".to_string(), Value::String(url));
    }
    let metadata = if meta.is_empty() {
        None
    } else {
        Some(Value::Object(meta))
    };

    let report = state.engine.broadcast(&title, &body, metadata).await?;
    info!(
        created = report.created,
        sent = report.sent,
        failed = report.failed,
        "breaking news broadcast complete"
    );

    Ok(Json(json!({
        "success": true,
        "sent": report.sent,
        "failed": report.failed,
    })))
}

/// Live notification stream over SSE. The connection is released when the
/// client disconnects; fan-out then simply finds no open sink.
pub async fn stream_notifications(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ServiceResult<Sse<impl Stream<Item = Result<Event, serde_json::Error>>>> {
    let user_id = require_caller(query.user_id)?;
    state
        .store
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("User not found: {}", user_id)))?;

    info!(user_id = %user_id, "live stream opened");
    let rx = state.stream.subscribe(&user_id).await;
    let stream = ReceiverStream::new(rx)
        .map(|payload| Event::default().event("notification").json_data(&payload));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
