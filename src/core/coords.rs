//! Axial hex coordinates for the map graph

use serde::{Deserialize, Serialize};
use std::fmt;

/// Axial coordinate on the hex map. Ordering is derived so coordinate pairs
/// can be normalized deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub q: i32,
    pub r: i32,
}

/// The six axial direction offsets, clockwise from east.
const DIRECTIONS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

impl Coord {
    pub const fn new(q: i32, r: i32) -> Self {
        Coord { q, r }
    }

    pub fn neighbors(&self) -> [Coord; 6] {
        let mut out = [*self; 6];
        for (slot, (dq, dr)) in out.iter_mut().zip(DIRECTIONS) {
            *slot = Coord::new(slot.q + dq, slot.r + dr);
        }
        out
    }

    pub fn is_adjacent(&self, other: Coord) -> bool {
        self.distance(other) == 1
    }

    /// Hex grid distance between two axial coordinates.
    pub fn distance(&self, other: Coord) -> i32 {
        let dq = self.q - other.q;
        let dr = self.r - other.r;
        (dq.abs() + dr.abs() + (dq + dr).abs()) / 2
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}
