//! trafficount - Multi-Camera Vehicle Counting Server
//!
//! ## Architecture (9 Components)
//!
//! 1. ConfigSource - camera list from the external configuration backend
//! 2. StreamReader - restartable frame sequences (ffmpeg pipe / HTTP snapshot)
//! 3. TrackerClient - external detector/tracker adapter
//! 4. Counting - line-crossing detection, track state, per-class counters
//! 5. CameraWorker - per-camera processing loop (state machine)
//! 6. CameraRegistry - runtime state table, start/stop supervision
//! 7. FrameCache - latest annotated frame per camera
//! 8. EventEmitter - fire-and-forget detection event dispatch
//! 9. WebAPI - REST endpoints + MJPEG video feeds
//!
//! ## Design Principles
//!
//! - One worker task per camera; cameras are fully independent
//! - Cooperative cancellation via the registry's running flag
//! - The frame cache is the only state shared between worker and server

pub mod annotate;
pub mod camera_registry;
pub mod camera_worker;
pub mod config_source;
pub mod counting;
pub mod error;
pub mod event_emitter;
pub mod frame;
pub mod frame_cache;
pub mod models;
pub mod state;
pub mod stream_reader;
pub mod tracker_client;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
