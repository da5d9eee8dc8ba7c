//! CameraRegistry - Per-Camera Runtime and Lifecycle
//!
//! ## Responsibilities
//!
//! - Hold the runtime record (config, state, counters) for every camera
//! - Start and stop camera workers idempotently
//!
//! Start uses an atomic compare-exchange on the running flag, so two
//! concurrent start requests for the same camera spawn exactly one worker.

use crate::camera_worker::{self, WorkerDeps};
use crate::config_source::CameraConfig;
use crate::counting::VehicleCounters;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Observable worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkerState {
    Stopped,
    Loading,
    Running,
    Recovering,
}

/// Runtime record for one camera
pub struct CameraRuntime {
    pub config: CameraConfig,
    running: AtomicBool,
    state: RwLock<WorkerState>,
    last_error: RwLock<Option<String>>,
    pub counters: VehicleCounters,
}

impl CameraRuntime {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            running: AtomicBool::new(false),
            state: RwLock::new(WorkerState::Stopped),
            last_error: RwLock::new(None),
            counters: VehicleCounters::new(),
        }
    }

    /// Claim the start slot; only one caller wins per stopped->running edge
    pub fn try_begin_start(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Ask the worker to stop at its next loop check
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub async fn set_state(&self, state: WorkerState) {
        *self.state.write().await = state;
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub async fn set_last_error(&self, error: Option<String>) {
        *self.last_error.write().await = error;
    }
}

/// All cameras known to this instance
pub struct CameraRegistry {
    cameras: RwLock<HashMap<String, Arc<CameraRuntime>>>,
    deps: WorkerDeps,
}

impl CameraRegistry {
    pub fn new(deps: WorkerDeps) -> Self {
        Self {
            cameras: RwLock::new(HashMap::new()),
            deps,
        }
    }

    /// Register a camera
    ///
    /// Returns `false` if the id already has a running worker; the
    /// existing registration is kept so that worker stays reachable
    /// through the registry and no second worker can be started for the
    /// same id. Stopped registrations are replaced.
    pub async fn register(&self, config: CameraConfig) -> bool {
        let camera_id = config.camera_id.clone();
        let mut cameras = self.cameras.write().await;

        if let Some(existing) = cameras.get(&camera_id) {
            if existing.is_running() {
                tracing::warn!(
                    camera_id = %camera_id,
                    "Camera already running, keeping existing registration"
                );
                return false;
            }
        }

        cameras.insert(camera_id.clone(), Arc::new(CameraRuntime::new(config)));
        tracing::info!(camera_id = %camera_id, "Camera registered");
        true
    }

    pub async fn get(&self, camera_id: &str) -> Result<Arc<CameraRuntime>> {
        self.cameras
            .read()
            .await
            .get(camera_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("camera {} not registered", camera_id)))
    }

    pub async fn list(&self) -> Vec<Arc<CameraRuntime>> {
        let mut cameras: Vec<_> = self.cameras.read().await.values().cloned().collect();
        cameras.sort_by(|a, b| a.config.camera_id.cmp(&b.config.camera_id));
        cameras
    }

    /// Start a camera's worker
    ///
    /// Returns `Ok(true)` if a worker was spawned, `Ok(false)` if one was
    /// already running. The spawned worker owns the running flag from here.
    pub async fn start(&self, camera_id: &str) -> Result<bool> {
        let runtime = self.get(camera_id).await?;

        if !runtime.try_begin_start() {
            tracing::debug!(camera_id = %camera_id, "Camera already running");
            return Ok(false);
        }

        let deps = self.deps.clone();
        let worker_runtime = runtime.clone();
        tokio::spawn(async move {
            camera_worker::run(worker_runtime, deps).await;
        });

        tracing::info!(camera_id = %camera_id, "Camera worker started");
        Ok(true)
    }

    /// Request a camera's worker to stop
    ///
    /// Returns `Ok(true)` if the worker was running. The worker observes
    /// the flag at its next loop check and shuts down cleanly.
    pub async fn stop(&self, camera_id: &str) -> Result<bool> {
        let runtime = self.get(camera_id).await?;
        let was_running = runtime.is_running();
        runtime.request_stop();

        if was_running {
            tracing::info!(camera_id = %camera_id, "Camera stop requested");
        }
        Ok(was_running)
    }
}
