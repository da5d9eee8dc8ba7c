//! Track state store
//!
//! Per-camera mapping from tracker-assigned identifier to the last
//! observed centroid. Entries unseen for too many frames are evicted so
//! long-running cameras do not accumulate dead tracks.

use super::line::Point;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct TrackEntry {
    centroid: Point,
    last_seen_frame: u64,
}

/// Last-known centroid per track identifier
#[derive(Debug)]
pub struct TrackStore {
    entries: HashMap<i64, TrackEntry>,
    /// Entries unseen for more than this many frames are evicted
    max_unseen_frames: u64,
}

impl TrackStore {
    pub fn new(max_unseen_frames: u64) -> Self {
        Self {
            entries: HashMap::new(),
            max_unseen_frames,
        }
    }

    /// Record the current centroid for a track, returning the previous one
    ///
    /// Returns `None` the first time a track identifier is observed. The
    /// stored centroid is unconditionally overwritten.
    pub fn observe(&mut self, track_id: i64, centroid: Point, frame_no: u64) -> Option<Point> {
        let prev = self.entries.insert(
            track_id,
            TrackEntry {
                centroid,
                last_seen_frame: frame_no,
            },
        );
        prev.map(|e| e.centroid)
    }

    /// Drop entries unseen for more than `max_unseen_frames`
    pub fn evict_stale(&mut self, frame_no: u64) {
        let max_unseen = self.max_unseen_frames;
        let before = self.entries.len();
        self.entries
            .retain(|_, e| frame_no.saturating_sub(e.last_seen_frame) <= max_unseen);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::debug!(evicted = evicted, frame_no = frame_no, "Evicted stale tracks");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
