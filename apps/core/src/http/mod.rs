//! HTTP server module

mod dto;
mod error;
mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::health))
        .route("/lessons", get(handlers::lessons))
        .route("/chat", post(handlers::chat))
        .route("/chat/stream", post(handlers::chat_stream))
        .route("/analyzer", post(handlers::analyzer))
        .route("/mindmap", post(handlers::mindmap))
        .route(
            "/session/:thread_id",
            get(handlers::get_session).delete(handlers::clear_session),
        )
        .layer(cors)
        .with_state(state)
}
