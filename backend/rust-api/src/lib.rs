#![allow(dead_code)]

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to specific origins in production

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes())
        .with_state(app_state)
        .layer(cors)
        // Server-side execution ceiling; clients never enforce their own.
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/data", get(handlers::data::get_data))
        .route("/update", post(handlers::data::update))
        .route("/update-partial", post(handlers::data::update_partial))
        .route("/github-proxy", post(handlers::github::github_proxy))
        .route("/publish-github", post(handlers::github::publish_github))
        .route("/sync-github", post(handlers::github::sync_github))
}
