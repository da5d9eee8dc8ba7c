//! Application state
//!
//! Holds all shared components and state

use crate::camera_registry::CameraRegistry;
use crate::config_source::ConfigSource;
use crate::event_emitter::EventEmitter;
use crate::frame_cache::FrameCache;
use crate::tracker_client::TrackerClient;
use std::sync::Arc;
use std::time::Instant;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Configuration backend base URL
    pub config_url: String,
    /// Tracker service base URL
    pub tracker_url: String,
    /// Detection event sink base URL
    pub event_sink_url: String,
    /// Server port
    pub port: u16,
    /// Server host
    pub host: String,
    /// Processing resolution
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_url: std::env::var("CONFIG_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            tracker_url: std::env::var("TRACKER_URL")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            event_sink_url: std::env::var("EVENT_SINK_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            frame_width: std::env::var("FRAME_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(640),
            frame_height: std::env::var("FRAME_HEIGHT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(360),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Camera configuration backend
    pub config_source: Arc<ConfigSource>,
    /// Tracker service client
    pub tracker: Arc<TrackerClient>,
    /// Latest annotated frame per camera
    pub frame_cache: Arc<FrameCache>,
    /// Detection event sink
    pub emitter: Arc<EventEmitter>,
    /// Camera runtimes and lifecycle
    pub registry: Arc<CameraRegistry>,
    /// Process start time (for uptime reporting)
    pub started_at: Instant,
}
