use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Read-only views over the latest cycle report
    let api = Router::new()
        .route("/api/report", get(handlers::report::report))
        .route("/api/opportunities", get(handlers::report::opportunities))
        .route("/api/flows", get(handlers::report::flows))
        .route("/api/whales", get(handlers::whales::list))
        .route("/api/positions", get(handlers::positions::list))
        .route("/api/treasury", get(handlers::treasury::summary));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
