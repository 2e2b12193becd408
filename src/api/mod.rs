mod handlers;

use crate::config::Config;
use crate::delivery::{LiveStreamChannel, PushChannel};
use crate::fanout::NotificationEngine;
use crate::ledger::RelationshipLedger;
use crate::store::SocialStore;
use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SocialStore>,
    pub ledger: Arc<RelationshipLedger>,
    pub engine: Arc<NotificationEngine>,
    pub stream: Arc<LiveStreamChannel>,
    pub push: Arc<PushChannel>,
}

/// Create the router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // General routes
        .route("/health", get(handlers::health::health_check))
        // Identity sync
        .route("/users", post(handlers::users::upsert_user))
        .route("/users/:id", get(handlers::users::get_user))
        // Social graph routes
        .route("/followers/:user_id", get(handlers::social_graph::get_followers))
        .route("/following/:user_id", get(handlers::social_graph::get_following))
        .route("/follow", post(handlers::social_graph::follow))
        .route("/unfollow", post(handlers::social_graph::unfollow))
        .route("/block", post(handlers::blocking::block))
        .route("/unblock", post(handlers::blocking::unblock))
        .route("/mute", post(handlers::blocking::mute))
        .route("/unmute", post(handlers::blocking::unmute))
        .route("/blocked", get(handlers::blocking::get_blocked))
        .route("/muted", get(handlers::blocking::get_muted))
        // Content routes
        .route("/posts", post(handlers::content::create_post))
        .route("/posts/:id/comments", post(handlers::content::create_comment))
        .route("/posts/:id/like", post(handlers::content::like_post))
        .route("/comments/:id", delete(handlers::content::delete_comment))
        // Notification routes
        .route("/notifications", get(handlers::notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(handlers::notifications::unread_count),
        )
        .route(
            "/notifications/read-all",
            post(handlers::notifications::mark_all_read),
        )
        .route(
            "/notifications/:id/read",
            post(handlers::notifications::mark_read),
        )
        .route(
            "/notifications/send-breaking-news",
            post(handlers::notifications::send_breaking_news),
        )
        .route(
            "/notifications/stream",
            get(handlers::notifications::stream_notifications),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the API server
pub async fn start_api_server(state: AppState) -> Result<()> {
    let config = Config::get();

    // Set up CORS
    let cors = if config.api.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::permissive()
    };

    let app = build_router(state).layer(cors);

    // Get bind address
    let addr = format!("{}:{}", config.api.host, config.api.port).parse::<SocketAddr>()?;

    // Start server
    info!("Starting API server on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
