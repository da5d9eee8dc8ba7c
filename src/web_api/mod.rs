//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes
//! - Camera lifecycle and counter endpoints
//! - MJPEG live view per camera

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let tracker_ok = state.tracker.health_check().await.unwrap_or(false);

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        tracker_connected: tracker_ok,
    };

    Json(response)
}

/// Status endpoint
pub async fn service_status(State(state): State<AppState>) -> impl IntoResponse {
    let cameras = state.registry.list().await;
    let mut running = 0;
    for camera in &cameras {
        if camera.is_running() {
            running += 1;
        }
    }

    Json(json!({
        "service": "trafficount",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "cameras_total": cameras.len(),
        "cameras_running": running
    }))
}
