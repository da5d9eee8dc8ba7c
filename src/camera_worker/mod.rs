//! CameraWorker - Per-Camera Processing Loop
//!
//! ## Responsibilities
//!
//! - Drive one camera end to end: read, track, count, annotate, publish
//! - Recover from stream loss without losing counters or track state
//!
//! The worker owns its camera's counting pipeline for its whole lifetime.
//! Stream loss drops it into RECOVERING and a fresh reader is opened; only
//! a failed tracker session open or an explicit stop request ends the
//! worker. Per-frame errors skip the frame, never the stream.

use crate::annotate::{annotate, encode_jpeg};
use crate::camera_registry::{CameraRuntime, WorkerState};
use crate::counting::{CountingLine, CountingPipeline};
use crate::error::Result;
use crate::event_emitter::{DetectionEvent, EventEmitter};
use crate::frame::Frame;
use crate::frame_cache::FrameCache;
use crate::stream_reader::{ReaderSettings, StreamReader};
use crate::tracker_client::TrackerClient;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Worker tuning shared by all cameras
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub reader: ReaderSettings,
    /// Pause between reader reopen attempts after a stream ends
    pub recover_interval: Duration,
    /// Track entries unseen for this many frames are evicted
    pub max_unseen_frames: u64,
    pub jpeg_quality: u8,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            reader: ReaderSettings::default(),
            recover_interval: Duration::from_secs(5),
            max_unseen_frames: 300,
            jpeg_quality: 80,
        }
    }
}

/// Shared services handed to every worker
#[derive(Clone)]
pub struct WorkerDeps {
    pub tracker: Arc<TrackerClient>,
    pub frame_cache: Arc<FrameCache>,
    pub emitter: Arc<EventEmitter>,
    pub settings: WorkerSettings,
}

/// Run one camera's worker until stop is requested or startup fails
///
/// Caller must have claimed the runtime's start slot; this function owns
/// the running flag from entry and clears state on every exit path.
pub async fn run(runtime: Arc<CameraRuntime>, deps: WorkerDeps) {
    let camera_id = runtime.config.camera_id.clone();
    runtime.set_state(WorkerState::Loading).await;
    runtime.set_last_error(None).await;

    // Session open is the expensive model load; failure is fatal for
    // this worker, unlike stream loss.
    if let Err(e) = deps.tracker.open_session(&camera_id).await {
        tracing::error!(camera_id = %camera_id, error = %e, "Tracker session open failed");
        runtime.set_last_error(Some(e.to_string())).await;
        runtime.set_state(WorkerState::Stopped).await;
        runtime.request_stop();
        return;
    }

    let line = CountingLine::new(
        runtime.config.line_start,
        runtime.config.line_end,
        runtime.config.invert_direction,
    );
    // One pipeline per worker lifetime; track state and counters survive
    // stream reconnects.
    let mut pipeline = CountingPipeline::new(
        line,
        runtime.config.direction_mode,
        deps.settings.max_unseen_frames,
    );

    while runtime.is_running() {
        let mut reader = match StreamReader::open(&runtime.config, &deps.settings.reader) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::warn!(camera_id = %camera_id, error = %e, "Stream open failed");
                runtime.set_last_error(Some(e.to_string())).await;
                runtime.set_state(WorkerState::Recovering).await;
                tokio::time::sleep(deps.settings.recover_interval).await;
                continue;
            }
        };

        runtime.set_state(WorkerState::Running).await;
        runtime.set_last_error(None).await;
        tracing::info!(camera_id = %camera_id, "Camera stream running");

        while runtime.is_running() {
            match reader.next_frame().await {
                Some(frame) => {
                    if let Err(e) =
                        process_frame(&runtime, &deps, &mut pipeline, &line, frame).await
                    {
                        // Skipped frame, not a stream failure
                        tracing::warn!(camera_id = %camera_id, error = %e, "Frame skipped");
                    }
                }
                None => break,
            }
        }

        if runtime.is_running() {
            tracing::warn!(camera_id = %camera_id, "Stream ended, recovering");
            runtime
                .set_last_error(Some("stream ended".to_string()))
                .await;
            runtime.set_state(WorkerState::Recovering).await;
            tokio::time::sleep(deps.settings.recover_interval).await;
        }
    }

    // Drop the reader before clearing the cache so viewers never see a
    // stale frame from a stopped camera.
    deps.frame_cache.clear(&camera_id).await;
    runtime.set_state(WorkerState::Stopped).await;
    runtime.request_stop();
    tracing::info!(camera_id = %camera_id, "Camera worker stopped");
}

async fn process_frame(
    runtime: &Arc<CameraRuntime>,
    deps: &WorkerDeps,
    pipeline: &mut CountingPipeline,
    line: &CountingLine,
    frame: Frame,
) -> Result<()> {
    let camera_id = &runtime.config.camera_id;

    let jpeg = encode_jpeg(&frame, deps.settings.jpeg_quality)?;
    let boxes = deps.tracker.track(camera_id, jpeg).await?;
    let crossings = pipeline.process(&boxes);

    let annotated = annotate(&frame, &boxes, line, !crossings.is_empty());

    let snapshot = if crossings.is_empty() {
        None
    } else {
        Some(encode_jpeg(&annotated, deps.settings.jpeg_quality)?)
    };

    deps.frame_cache.set(camera_id, Arc::new(annotated)).await;

    for crossing in crossings {
        runtime.counters.increment(crossing.class, crossing.direction);
        tracing::info!(
            camera_id = %camera_id,
            track_id = crossing.track_id,
            vehicle_class = %crossing.class.label(),
            direction = %crossing.direction.as_str(),
            "Vehicle counted"
        );

        emit_event(&deps.emitter, camera_id, &crossing, snapshot.clone());
    }

    Ok(())
}

fn emit_event(
    emitter: &Arc<EventEmitter>,
    camera_id: &str,
    crossing: &crate::counting::Crossing,
    snapshot: Option<Vec<u8>>,
) {
    emitter.emit(DetectionEvent {
        camera_id: camera_id.to_string(),
        vehicle_class: crossing.class.label().to_string(),
        direction: crossing.direction,
        timestamp: Utc::now(),
        snapshot,
    });
}
