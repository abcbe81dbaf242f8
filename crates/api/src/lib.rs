//! HTTP surface for the platform core
//!
//! Thin axum handlers over the instance and solve services. Authentication
//! and session handling live upstream; handlers receive the acting identity
//! as a request extension.

mod error;
pub mod routes;
mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health::health))
        .route(
            "/api/challenges/:id/instance",
            post(routes::instances::start)
                .get(routes::instances::status)
                .delete(routes::instances::stop),
        )
        .route(
            "/api/challenges/:id/instance/kill",
            post(routes::instances::kill),
        )
        .route(
            "/api/challenges/:id/submit",
            post(routes::solves::submit_flag),
        )
        .route(
            "/api/challenges/:id/points",
            get(routes::solves::current_points),
        )
        .route(
            "/api/challenges/:id/recalculate",
            post(routes::solves::recalculate),
        )
        .route("/api/events/ws", get(routes::events::subscribe))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
