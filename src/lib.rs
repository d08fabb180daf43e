pub mod appointment;
pub mod bland_types;
pub mod classify;
pub mod config;
pub mod db_types;
pub mod error;
pub mod handlers;
pub mod memory_store;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod provisioning;
pub mod store;
pub mod types;
pub mod variables;
pub mod vendor;

use crate::types::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn app(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/bland-webhook", post(handlers::bland_webhook))
        .route("/api/create-agent", post(handlers::create_agent))
        .route("/api/provision-number", post(handlers::provision_number))
        .route("/api/toggle-agent", post(handlers::toggle_agent))
        .route("/api/update-agent", post(handlers::update_agent))
        .route("/api/businesses", post(handlers::ensure_business))
        .route("/api/businesses/:id/calls", get(handlers::list_calls))
        .route(
            "/api/businesses/:id/appointments",
            get(handlers::list_appointments),
        )
        .route("/api/businesses/:id/activity", get(handlers::list_activity))
        .route("/", get(|| async { "receptionist-rs is running" }))
        .with_state(app_state)
}
