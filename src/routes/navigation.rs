use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Navigation Router Module
///
/// Endpoints the SPA host router calls before committing a navigation.
/// Nested under `/navigation`.
pub fn navigation_routes() -> Router<AppState> {
    Router::new()
        // GET /navigation/routes
        // The route table and home destinations, for building the client router.
        .route("/routes", get(handlers::get_routes))
        // POST /navigation/evaluate
        // One decision per attempt: allow, or redirect with the target path.
        .route("/evaluate", post(handlers::evaluate_navigation))
}
