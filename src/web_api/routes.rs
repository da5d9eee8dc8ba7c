//! API Routes

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;

use crate::annotate::encode_jpeg;
use crate::error::{Error, Result};
use crate::models::{ApiResponse, CameraSummary, CountsResponse};
use crate::state::AppState;

/// Frame pacing for the MJPEG stream (~30 fps ceiling)
const MJPEG_FRAME_INTERVAL: Duration = Duration::from_millis(33);
/// Extra wait when a camera has no frame yet
const MJPEG_ABSENT_RETRY: Duration = Duration::from_millis(100);
const MJPEG_QUALITY: u8 = 80;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/healthz", get(super::health_check))
        .route("/api/status", get(super::service_status))
        // Cameras
        .route("/api/cameras", get(list_cameras))
        .route("/api/cameras/reload", post(reload_cameras))
        .route("/api/cameras/:id", get(get_camera))
        .route("/api/cameras/:id/counts", get(get_counts))
        .route("/api/cameras/:id/start", post(start_camera))
        .route("/api/cameras/:id/stop", post(stop_camera))
        // Live view
        .route("/video_feed/:id", get(video_feed))
        .with_state(state)
}

async fn camera_summary(
    runtime: &std::sync::Arc<crate::camera_registry::CameraRuntime>,
) -> CameraSummary {
    CameraSummary {
        camera_id: runtime.config.camera_id.clone(),
        name: runtime.config.name.clone(),
        location: runtime.config.location.clone(),
        state: runtime.state().await,
        counts: runtime.counters.snapshot(),
        last_error: runtime.last_error().await,
    }
}

async fn list_cameras(State(state): State<AppState>) -> impl IntoResponse {
    let mut summaries = Vec::new();
    for runtime in state.registry.list().await {
        summaries.push(camera_summary(&runtime).await);
    }
    Json(ApiResponse::success(summaries))
}

async fn get_camera(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let runtime = state.registry.get(&id).await?;
    Ok(Json(ApiResponse::success(camera_summary(&runtime).await)))
}

async fn get_counts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let runtime = state.registry.get(&id).await?;
    Ok(Json(ApiResponse::success(CountsResponse {
        camera_id: id,
        counts: runtime.counters.snapshot(),
    })))
}

async fn start_camera(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let started = state.registry.start(&id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "camera_id": id, "started": started }),
    )))
}

async fn stop_camera(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let stopped = state.registry.stop(&id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "camera_id": id, "stopped": stopped }),
    )))
}

/// Refetch the camera list from the configuration backend
///
/// New and stopped cameras are (re)registered; ids with a running worker
/// keep their existing registration. Workers are not auto-started here.
async fn reload_cameras(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let cameras = state.config_source.fetch_cameras().await?;
    let mut registered = 0;
    for camera in cameras {
        if state.registry.register(camera).await {
            registered += 1;
        }
    }
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "registered": registered }),
    )))
}

/// One MJPEG part: boundary, part headers, JPEG payload
fn mjpeg_chunk(jpeg: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(jpeg.len() + 128);
    chunk.extend_from_slice(
        format!(
            "--frame\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
            jpeg.len()
        )
        .as_bytes(),
    );
    chunk.extend_from_slice(jpeg);
    chunk.extend_from_slice(b"\r\n");
    chunk
}

/// MJPEG live view for one camera
///
/// Streams the latest cached annotated frame at a fixed pace. Frames that
/// fail to encode are skipped; a camera with no frame yet just waits, so a
/// freshly started worker picks up seamlessly.
async fn video_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    // Viewing a camera (re)starts its worker; a 404 for unknown cameras
    // comes out of the registry lookup inside start.
    state.registry.start(&id).await?;

    let stream = futures::stream::unfold((state, id), |(state, id)| async move {
        loop {
            tokio::time::sleep(MJPEG_FRAME_INTERVAL).await;

            match state.frame_cache.get(&id).await {
                Some(frame) => match encode_jpeg(&frame, MJPEG_QUALITY) {
                    Ok(jpeg) => {
                        let chunk = Bytes::from(mjpeg_chunk(&jpeg));
                        return Some((
                            Ok::<_, std::convert::Infallible>(chunk),
                            (state, id),
                        ));
                    }
                    Err(e) => {
                        tracing::warn!(camera_id = %id, error = %e, "MJPEG encode failed");
                    }
                },
                None => {
                    tokio::time::sleep(MJPEG_ABSENT_RETRY).await;
                }
            }
        }
    });

    Response::builder()
        .header(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=frame",
        )
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .map_err(|e| Error::Internal(format!("stream response build failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mjpeg_chunk_format() {
        let jpeg = vec![0xFF, 0xD8, 0xAA, 0xFF, 0xD9];
        let chunk = mjpeg_chunk(&jpeg);
        let text = String::from_utf8_lossy(&chunk[..chunk.len() - jpeg.len() - 2]);

        assert!(text.starts_with("--frame\r\n"));
        assert!(text.contains("Content-Type: image/jpeg\r\n"));
        assert!(text.contains("Content-Length: 5\r\n\r\n"));
        assert!(chunk.ends_with(b"\r\n"));
    }

    #[test]
    fn test_mjpeg_chunk_carries_payload_verbatim() {
        let jpeg = vec![1, 2, 3, 4];
        let chunk = mjpeg_chunk(&jpeg);
        let payload_start = chunk.len() - jpeg.len() - 2;
        assert_eq!(&chunk[payload_start..payload_start + jpeg.len()], &jpeg[..]);
    }
}
