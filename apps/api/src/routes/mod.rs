pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::assessment::{catalog, handlers};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Assessment API
        .route("/api/v1/assessments", post(handlers::handle_assess))
        .route("/assess", post(handlers::handle_assess))
        // Catalogs
        .route("/api/v1/frameworks", get(catalog::handle_list_frameworks))
        .route("/api/v1/frameworks/:id", get(catalog::handle_get_framework))
        .route("/api/v1/grants", get(catalog::handle_list_grants))
        .layer(DefaultBodyLimit::max(handlers::MAX_REQUEST_BYTES))
        .with_state(state)
}
