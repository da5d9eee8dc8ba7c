//! Line-crossing detection
//!
//! Pure 2-D geometry: a crossing is a strict sign change of the side
//! function between two consecutive centroid samples of the same track.

use serde::{Deserialize, Serialize};

/// 2-D point (pixel coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Crossing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Wire label ("IN" / "OUT")
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }
}

/// Which crossing directions a camera counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DirectionMode {
    In,
    Out,
    Both,
}

impl DirectionMode {
    /// Parse from a config record, defaulting to BOTH
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "IN" => Self::In,
            "OUT" => Self::Out,
            _ => Self::Both,
        }
    }

    /// Whether crossings in the given direction are counted
    pub fn allows(&self, direction: Direction) -> bool {
        match self {
            Self::In => direction == Direction::In,
            Self::Out => direction == Direction::Out,
            Self::Both => true,
        }
    }
}

/// Signed orientation of point `p` relative to the directed segment `a -> b`
///
/// Zero means `p` lies exactly on the line through `a` and `b`.
pub fn side(p: Point, a: Point, b: Point) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// A configured counting line with its sign-to-direction mapping
#[derive(Debug, Clone, Copy)]
pub struct CountingLine {
    pub a: Point,
    pub b: Point,
    /// Swaps which side flip maps to IN vs OUT; line orientation plus this
    /// flag fully control direction semantics per camera.
    pub invert_direction: bool,
}

impl CountingLine {
    pub fn new(a: Point, b: Point, invert_direction: bool) -> Self {
        Self {
            a,
            b,
            invert_direction,
        }
    }

    /// Classify the move `prev -> curr` against this line
    ///
    /// Returns `Some(direction)` iff the side function strictly changes
    /// sign. A sample landing exactly on the line (side == 0) never
    /// registers as either side, so it neither triggers nor cancels a
    /// crossing.
    pub fn crossing(&self, prev: Point, curr: Point) -> Option<Direction> {
        let s1 = side(prev, self.a, self.b);
        let s2 = side(curr, self.a, self.b);
        if s1 * s2 >= 0.0 {
            return None;
        }

        // Default mapping: negative -> positive side flip is OUT (for a
        // left-to-right horizontal line that makes downward movement OUT,
        // matching the deployed camera conventions).
        let direction = if s1 < 0.0 {
            Direction::Out
        } else {
            Direction::In
        };

        Some(if self.invert_direction {
            match direction {
                Direction::In => Direction::Out,
                Direction::Out => Direction::In,
            }
        } else {
            direction
        })
    }
}
