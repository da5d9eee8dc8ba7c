//! Counting - Line-Crossing Vehicle Counting
//!
//! ## Responsibilities
//!
//! - Classify tracked-object movement against a configured counting line
//! - Maintain per-track last-centroid state with stale eviction
//! - Accumulate per-class IN/OUT counters readable by the web layer
//!
//! The pipeline is pure with respect to I/O: the camera worker feeds it
//! tracker output and acts on the crossings it returns.

pub mod line;
pub mod track_store;

pub use line::{side, CountingLine, Direction, DirectionMode, Point};
pub use track_store::TrackStore;

use crate::tracker_client::TrackedBox;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Vehicle classes counted by this system
///
/// Class ids follow the detector's COCO-style mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Car,
    Motorcycle,
    Bus,
    Truck,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 4] = [
        VehicleClass::Car,
        VehicleClass::Motorcycle,
        VehicleClass::Bus,
        VehicleClass::Truck,
    ];

    /// Map a detector class id to a vehicle class
    pub fn from_class_id(class_id: i64) -> Option<Self> {
        match class_id {
            2 => Some(Self::Car),
            3 => Some(Self::Motorcycle),
            5 => Some(Self::Bus),
            7 => Some(Self::Truck),
            _ => None,
        }
    }

    /// Wire/display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Motorcycle => "motorcycle",
            Self::Bus => "bus",
            Self::Truck => "truck",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Car => 0,
            Self::Motorcycle => 1,
            Self::Bus => 2,
            Self::Truck => 3,
        }
    }
}

/// One detected line crossing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub track_id: i64,
    pub class: VehicleClass,
    pub direction: Direction,
}

/// Per-class IN/OUT counters
///
/// Written only by the owning camera worker; atomics let status endpoints
/// read without touching worker state.
#[derive(Debug, Default)]
pub struct VehicleCounters {
    inbound: [AtomicU64; 4],
    outbound: [AtomicU64; 4],
}

/// Serializable counter snapshot for one class
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClassCounts {
    pub class: VehicleClass,
    #[serde(rename = "in")]
    pub count_in: u64,
    #[serde(rename = "out")]
    pub count_out: u64,
}

impl VehicleCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, class: VehicleClass, direction: Direction) {
        let slot = match direction {
            Direction::In => &self.inbound[class.index()],
            Direction::Out => &self.outbound[class.index()],
        };
        slot.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, class: VehicleClass, direction: Direction) -> u64 {
        match direction {
            Direction::In => self.inbound[class.index()].load(Ordering::Relaxed),
            Direction::Out => self.outbound[class.index()].load(Ordering::Relaxed),
        }
    }

    pub fn snapshot(&self) -> Vec<ClassCounts> {
        VehicleClass::ALL
            .iter()
            .map(|&class| ClassCounts {
                class,
                count_in: self.get(class, Direction::In),
                count_out: self.get(class, Direction::Out),
            })
            .collect()
    }
}

/// Per-camera counting pipeline
///
/// Owns the track state and frame counter for one camera. Fed one batch of
/// tracker boxes per frame, returns the crossings that frame produced (at
/// most one per track per frame). State survives stream reconnects because
/// the worker keeps the pipeline across its recovery loop.
#[derive(Debug)]
pub struct CountingPipeline {
    line: CountingLine,
    mode: DirectionMode,
    tracks: TrackStore,
    frame_no: u64,
}

impl CountingPipeline {
    pub fn new(line: CountingLine, mode: DirectionMode, max_unseen_frames: u64) -> Self {
        Self {
            line,
            mode,
            tracks: TrackStore::new(max_unseen_frames),
            frame_no: 0,
        }
    }

    /// Process one frame's tracker output
    pub fn process(&mut self, boxes: &[TrackedBox]) -> Vec<Crossing> {
        self.frame_no += 1;
        let mut crossings = Vec::new();

        for tracked in boxes {
            let Some(class) = VehicleClass::from_class_id(tracked.class_id) else {
                continue;
            };
            let centroid = tracked.centroid();
            let prev = self.tracks.observe(tracked.track_id, centroid, self.frame_no);

            if let Some(prev) = prev {
                if let Some(direction) = self.line.crossing(prev, centroid) {
                    if self.mode.allows(direction) {
                        crossings.push(Crossing {
                            track_id: tracked.track_id,
                            class,
                            direction,
                        });
                    }
                }
            }
        }

        self.tracks.evict_stale(self.frame_no);
        crossings
    }

    /// Number of live track entries (for status/debugging)
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(track_id: i64, class_id: i64, cx: f32, cy: f32) -> TrackedBox {
        TrackedBox {
            x1: cx - 10.0,
            y1: cy - 10.0,
            x2: cx + 10.0,
            y2: cy + 10.0,
            track_id,
            class_id,
            confidence: 0.9,
        }
    }

    fn pipeline(mode: DirectionMode) -> CountingPipeline {
        let line = CountingLine::new(Point::new(0.0, 200.0), Point::new(640.0, 200.0), false);
        CountingPipeline::new(line, mode, 300)
    }

    #[test]
    fn test_monotonic_traversal_counts_exactly_once() {
        let mut p = pipeline(DirectionMode::Both);
        // Track 5 approaches, lingers above the line, then crosses downward
        assert!(p.process(&[boxed(5, 2, 100.0, 100.0)]).is_empty());
        assert!(p.process(&[boxed(5, 2, 100.0, 150.0)]).is_empty());
        assert!(p.process(&[boxed(5, 2, 100.0, 190.0)]).is_empty());
        let crossings = p.process(&[boxed(5, 2, 100.0, 250.0)]);
        assert_eq!(
            crossings,
            vec![Crossing {
                track_id: 5,
                class: VehicleClass::Car,
                direction: Direction::Out,
            }]
        );
        // Staying below the line afterwards produces nothing further
        assert!(p.process(&[boxed(5, 2, 100.0, 300.0)]).is_empty());
        assert!(p.process(&[boxed(5, 2, 100.0, 350.0)]).is_empty());
    }

    #[test]
    fn test_first_sighting_never_crosses() {
        let mut p = pipeline(DirectionMode::Both);
        // A box appearing below the line with no history is not a crossing
        assert!(p.process(&[boxed(9, 2, 100.0, 250.0)]).is_empty());
    }

    #[test]
    fn test_track_id_change_is_a_new_object() {
        let mut p = pipeline(DirectionMode::Both);
        p.process(&[boxed(1, 2, 100.0, 150.0)]);
        // The tracker re-identifies the object as id 2 after it crossed
        let crossings = p.process(&[boxed(2, 2, 100.0, 250.0)]);
        assert!(crossings.is_empty());
    }

    #[test]
    fn test_direction_mode_filters_counts() {
        let mut p = pipeline(DirectionMode::In);
        p.process(&[boxed(1, 2, 100.0, 150.0)]);
        // Downward crossing is OUT, suppressed by IN mode
        assert!(p.process(&[boxed(1, 2, 100.0, 250.0)]).is_empty());
        // Upward crossing is IN, counted
        let crossings = p.process(&[boxed(1, 2, 100.0, 150.0)]);
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].direction, Direction::In);
    }

    #[test]
    fn test_both_mode_single_direction_per_crossing() {
        let mut p = pipeline(DirectionMode::Both);
        p.process(&[boxed(1, 2, 100.0, 150.0)]);
        let crossings = p.process(&[boxed(1, 2, 100.0, 250.0)]);
        // Exactly one crossing in exactly one direction
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].direction, Direction::Out);
    }

    #[test]
    fn test_unknown_class_is_ignored() {
        let mut p = pipeline(DirectionMode::Both);
        p.process(&[boxed(1, 42, 100.0, 150.0)]);
        assert!(p.process(&[boxed(1, 42, 100.0, 250.0)]).is_empty());
        assert_eq!(p.track_count(), 0);
    }

    #[test]
    fn test_multiple_tracks_same_frame() {
        let mut p = pipeline(DirectionMode::Both);
        p.process(&[boxed(1, 2, 100.0, 150.0), boxed(2, 7, 200.0, 250.0)]);
        let crossings = p.process(&[boxed(1, 2, 100.0, 250.0), boxed(2, 7, 200.0, 150.0)]);
        assert_eq!(crossings.len(), 2);
        assert!(crossings.contains(&Crossing {
            track_id: 1,
            class: VehicleClass::Car,
            direction: Direction::Out,
        }));
        assert!(crossings.contains(&Crossing {
            track_id: 2,
            class: VehicleClass::Truck,
            direction: Direction::In,
        }));
    }

    #[test]
    fn test_stale_tracks_evicted_from_pipeline() {
        let line = CountingLine::new(Point::new(0.0, 200.0), Point::new(640.0, 200.0), false);
        let mut p = CountingPipeline::new(line, DirectionMode::Both, 3);
        p.process(&[boxed(1, 2, 100.0, 150.0)]);
        assert_eq!(p.track_count(), 1);
        // Four empty frames exceed the 3-frame unseen budget
        for _ in 0..4 {
            p.process(&[]);
        }
        assert_eq!(p.track_count(), 0);
    }

    #[test]
    fn test_state_preserved_across_stream_gap() {
        let mut p = pipeline(DirectionMode::Both);
        p.process(&[boxed(1, 2, 100.0, 150.0)]);
        // Short reader outage: empty frames, below the eviction budget
        for _ in 0..10 {
            p.process(&[]);
        }
        // The track's last centroid survived, so the crossing still counts
        let crossings = p.process(&[boxed(1, 2, 100.0, 250.0)]);
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].direction, Direction::Out);
    }

    #[test]
    fn test_counters_increment_and_snapshot() {
        let counters = VehicleCounters::new();
        counters.increment(VehicleClass::Car, Direction::In);
        counters.increment(VehicleClass::Car, Direction::In);
        counters.increment(VehicleClass::Bus, Direction::Out);

        assert_eq!(counters.get(VehicleClass::Car, Direction::In), 2);
        assert_eq!(counters.get(VehicleClass::Car, Direction::Out), 0);
        assert_eq!(counters.get(VehicleClass::Bus, Direction::Out), 1);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.len(), 4);
        let car = snapshot
            .iter()
            .find(|c| c.class == VehicleClass::Car)
            .unwrap();
        assert_eq!(car.count_in, 2);
        assert_eq!(car.count_out, 0);
    }

    #[test]
    fn test_class_id_mapping() {
        assert_eq!(VehicleClass::from_class_id(2), Some(VehicleClass::Car));
        assert_eq!(
            VehicleClass::from_class_id(3),
            Some(VehicleClass::Motorcycle)
        );
        assert_eq!(VehicleClass::from_class_id(5), Some(VehicleClass::Bus));
        assert_eq!(VehicleClass::from_class_id(7), Some(VehicleClass::Truck));
        assert_eq!(VehicleClass::from_class_id(0), None);
    }
}
