pub mod game;
pub mod health;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::sse;
use crate::api::AppState;

/// Create the main API router
pub fn create_api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/matches", create_match_router(state.clone()))
        .route("/health", get(health::health_handler))
        .with_state(state)
}

/// Create match router
fn create_match_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(game::create_match))
        .route("/:matchId", get(game::get_match))
        .route("/:matchId/actions", post(game::submit_action))
        .route("/:matchId/events", get(sse::match_events_handler))
        .with_state(state)
}
