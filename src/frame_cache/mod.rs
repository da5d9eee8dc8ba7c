//! FrameCache - Latest Annotated Frame per Camera
//!
//! ## Responsibilities
//!
//! - Hold the most recent annotated frame for each camera
//! - Serve whole-frame reads to the MJPEG layer without tearing
//!
//! Single slot per camera. Each write replaces the previous frame; readers
//! get an `Arc` to a complete frame, never a partially written one. Slots
//! are created lazily on first access and cleared when a worker stops.

use crate::frame::Frame;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

type Slot = Arc<Mutex<Option<Arc<Frame>>>>;

/// Per-camera single-slot frame cache
pub struct FrameCache {
    slots: RwLock<HashMap<String, Slot>>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the slot for a camera
    async fn slot(&self, camera_id: &str) -> Slot {
        // Fast path: read lock only
        {
            let slots = self.slots.read().await;
            if let Some(slot) = slots.get(camera_id) {
                return slot.clone();
            }
        }

        let mut slots = self.slots.write().await;
        slots
            .entry(camera_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Replace the cached frame for a camera
    pub async fn set(&self, camera_id: &str, frame: Arc<Frame>) {
        let slot = self.slot(camera_id).await;
        let mut guard = slot.lock().await;
        *guard = Some(frame);
    }

    /// Latest frame for a camera, `None` if absent
    pub async fn get(&self, camera_id: &str) -> Option<Arc<Frame>> {
        let slot = self.slot(camera_id).await;
        let guard = slot.lock().await;
        guard.clone()
    }

    /// Clear the cached frame so viewers do not see a stale image
    pub async fn clear(&self, camera_id: &str) {
        let slot = self.slot(camera_id).await;
        let mut guard = slot.lock().await;
        *guard = None;
    }
}

impl Default for FrameCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_frame(value: u8) -> Frame {
        Frame::from_raw(4, 4, vec![value; Frame::byte_len(4, 4)]).unwrap()
    }

    #[tokio::test]
    async fn test_empty_cache_returns_none() {
        let cache = FrameCache::new();
        assert!(cache.get("cam-001").await.is_none());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = FrameCache::new();
        cache.set("cam-001", Arc::new(uniform_frame(7))).await;

        let frame = cache.get("cam-001").await.unwrap();
        assert!(frame.data.iter().all(|&b| b == 7));
    }

    #[tokio::test]
    async fn test_set_replaces_previous_frame() {
        let cache = FrameCache::new();
        cache.set("cam-001", Arc::new(uniform_frame(1))).await;
        cache.set("cam-001", Arc::new(uniform_frame(2))).await;

        let frame = cache.get("cam-001").await.unwrap();
        assert!(frame.data.iter().all(|&b| b == 2));
    }

    #[tokio::test]
    async fn test_cameras_are_independent() {
        let cache = FrameCache::new();
        cache.set("cam-001", Arc::new(uniform_frame(1))).await;
        cache.set("cam-002", Arc::new(uniform_frame(2))).await;

        assert!(cache.get("cam-001").await.unwrap().data[0] == 1);
        assert!(cache.get("cam-002").await.unwrap().data[0] == 2);
    }

    #[tokio::test]
    async fn test_clear_removes_frame() {
        let cache = FrameCache::new();
        cache.set("cam-001", Arc::new(uniform_frame(1))).await;
        cache.clear("cam-001").await;
        assert!(cache.get("cam-001").await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_writers_never_tear() {
        let cache = Arc::new(FrameCache::new());

        let mut writers = Vec::new();
        for value in 0..8u8 {
            let cache = cache.clone();
            writers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    cache.set("cam-001", Arc::new(uniform_frame(value))).await;
                }
            }));
        }

        let reader = {
            let cache = cache.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    if let Some(frame) = cache.get("cam-001").await {
                        // Every observed frame is uniform, i.e. written whole
                        let first = frame.data[0];
                        assert!(frame.data.iter().all(|&b| b == first));
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        for w in writers {
            w.await.unwrap();
        }
        reader.await.unwrap();
    }
}
