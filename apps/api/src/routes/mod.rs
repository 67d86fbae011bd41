pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::humanize::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/humanize/bullets",
            post(handlers::handle_humanize_bullets),
        )
        .with_state(state)
}
