//! Player identity and per-player game data

use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-supplied player identity. The kernel trusts these to be validated
/// by its caller and only requires them to be distinct within one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    pub const fn new(id: u32) -> Self {
        PlayerId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable per-player data, stored under the `players` state key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub money: i64,
    /// Locomotive level: maximum delivery path length in links.
    pub loco: u8,
}

pub const STARTING_MONEY: i64 = 10;

impl PlayerState {
    pub fn new(id: PlayerId) -> Self {
        PlayerState {
            id,
            money: STARTING_MONEY,
            loco: 1,
        }
    }
}
