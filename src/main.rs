//! Trafficount - multi-camera vehicle counting service
//!
//! Main entry point.

use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trafficount::{
    camera_registry::CameraRegistry,
    camera_worker::{WorkerDeps, WorkerSettings},
    config_source::ConfigSource,
    event_emitter::EventEmitter,
    frame_cache::FrameCache,
    state::{AppConfig, AppState},
    stream_reader::ReaderSettings,
    tracker_client::TrackerClient,
    web_api,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trafficount=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Trafficount v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        config_url = %config.config_url,
        tracker_url = %config.tracker_url,
        event_sink_url = %config.event_sink_url,
        frame_width = config.frame_width,
        frame_height = config.frame_height,
        "Configuration loaded"
    );

    // Initialize components
    let config_source = Arc::new(ConfigSource::new(config.config_url.clone()));
    let tracker = Arc::new(TrackerClient::new(config.tracker_url.clone()));
    let frame_cache = Arc::new(FrameCache::new());
    let emitter = Arc::new(EventEmitter::new(config.event_sink_url.clone()));

    let settings = WorkerSettings {
        reader: ReaderSettings {
            width: config.frame_width,
            height: config.frame_height,
            ..ReaderSettings::default()
        },
        ..WorkerSettings::default()
    };

    let registry = Arc::new(CameraRegistry::new(WorkerDeps {
        tracker: tracker.clone(),
        frame_cache: frame_cache.clone(),
        emitter: emitter.clone(),
        settings,
    }));

    if tracker.health_check().await.unwrap_or(false) {
        tracing::info!(tracker_url = %config.tracker_url, "Tracker reachable");
    } else {
        tracing::warn!(tracker_url = %config.tracker_url, "Tracker not reachable at startup");
    }

    // Load cameras and start workers; a failed fetch leaves the service
    // serving its API with an empty registry
    match config_source.fetch_cameras().await {
        Ok(cameras) => {
            for camera in cameras {
                let camera_id = camera.camera_id.clone();
                registry.register(camera).await;
                if let Err(e) = registry.start(&camera_id).await {
                    tracing::error!(camera_id = %camera_id, error = %e, "Camera start failed");
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Camera configuration fetch failed, starting with no cameras");
        }
    }

    // Create application state
    let state = AppState {
        config,
        config_source,
        tracker,
        frame_cache,
        emitter,
        registry,
        started_at: Instant::now(),
    };

    let app = web_api::create_router(state.clone())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
