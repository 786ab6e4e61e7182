use axum::Router;
use axum::routing::{get, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::SharedState;

/// Route table, also logged at startup.
pub const ROUTES: &[(&str, &str)] = &[
    ("GET", "/health"),
    ("GET", "/api/configuration"),
    ("GET", "/api/configuration/{configname}"),
    ("POST", "/api/configuration/create"),
    ("PUT", "/api/configuration/update/{id}"),
];

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/configuration", get(handlers::list_configurations))
        .route(
            "/api/configuration/{configname}",
            get(handlers::get_configuration),
        )
        .route(
            "/api/configuration/create",
            get(handlers::get_named_create).post(handlers::create_configuration),
        )
        .route(
            "/api/configuration/update/{id}",
            put(handlers::update_configuration),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
