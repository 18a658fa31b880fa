//! Studio board backend and client.
//!
//! Kanban board and location hierarchy for the studio back-office: a REST
//! backend with SQLite persistence, the pure reorder and inheritance logic,
//! and an async client whose stores apply board moves optimistically.

pub mod api;
pub mod board;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod models;
pub mod tree;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Board
        .route("/kanban", get(api::get_board))
        .route("/kanban/lists", post(api::create_list))
        .route(
            "/kanban/lists/{id}",
            put(api::update_list).delete(api::delete_list),
        )
        .route("/kanban/cards", post(api::create_card))
        .route(
            "/kanban/cards/{id}",
            put(api::update_card).delete(api::delete_card),
        )
        // Hierarchy
        .route("/hierarchy", get(api::get_hierarchy))
        .route("/hierarchy/root", post(api::create_root))
        .route("/hierarchy/{id}/child", post(api::create_child))
        .route(
            "/hierarchy/{id}",
            put(api::update_node).delete(api::delete_node),
        );

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests;
