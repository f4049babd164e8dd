pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::matching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Matching API
        .route("/api/v1/match", post(handlers::handle_match))
        .route("/api/v1/shortlist", post(handlers::handle_shortlist))
        .route("/api/v1/expand", post(handlers::handle_expand))
        .route(
            "/api/v1/skills/matrix",
            post(handlers::handle_skill_matrix),
        )
        .with_state(state)
}
