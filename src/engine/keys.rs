//! The kernel's state keys and typed access helpers
//!
//! All mutable game data lives in the state store under these keys. Keys
//! that exist only inside one phase (`movesRemaining`, `locoUsed`,
//! `buildsDone`) are deleted on phase exit, so their absence in a snapshot
//! says which phase the game is in mid-round.

use crate::core::{CityGoods, Coord, Good, Link, PlayerId, PlayerState};
use crate::engine::phase::Phase;
use crate::state::{Key, StateStore};
use crate::{EngineError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const PLAYERS: Key<Vec<PlayerState>> = Key::new("players");
pub const PLAYER_ORDER: Key<Vec<PlayerId>> = Key::new("playerOrder");
pub const CURRENT_PLAYER: Key<PlayerId> = Key::new("currentPlayer");
pub const PHASE: Key<Phase> = Key::new("phase");
pub const ROUND: Key<u32> = Key::new("round");
pub const TURN_INDEX: Key<usize> = Key::new("turnIndex");
pub const ENDED: Key<bool> = Key::new("ended");
pub const LINKS: Key<Vec<Link>> = Key::new("links");
pub const GOODS: Key<Vec<CityGoods>> = Key::new("goods");
pub const BAG: Key<Vec<Good>> = Key::new("bag");

// Per-phase transient keys.
pub const MOVES_REMAINING: Key<u32> = Key::new("movesRemaining");
pub const LOCO_USED: Key<bool> = Key::new("locoUsed");
pub const BUILDS_DONE: Key<u32> = Key::new("buildsDone");

/// Write a key whether or not it is already present. The state machine uses
/// this for keys that outlive a single phase but not a single game.
pub fn upsert<T: Serialize + DeserializeOwned>(
    store: &StateStore,
    key: Key<T>,
    value: T,
) -> Result<()> {
    if store.contains(key) {
        store.set(key, value)
    } else {
        store.init(key, value)
    }
}

/// Delete a key if it is present.
pub fn delete_if_present<T>(store: &StateStore, key: Key<T>) -> Result<()> {
    if store.contains(key) {
        store.delete(key)?;
    }
    Ok(())
}

pub fn current_player(store: &StateStore) -> Result<PlayerId> {
    store.get(CURRENT_PLAYER)
}

pub fn player(store: &StateStore, id: PlayerId) -> Result<PlayerState> {
    store
        .get(PLAYERS)?
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| EngineError::invariant(format!("no such player: {id}")))
}

pub fn update_player(
    store: &StateStore,
    id: PlayerId,
    mutate: impl FnOnce(&mut PlayerState),
) -> Result<()> {
    let mut players = store.get(PLAYERS)?;
    let target = players
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| EngineError::invariant(format!("no such player: {id}")))?;
    mutate(target);
    store.set(PLAYERS, players)
}

/// Goods currently on a stop. Unknown stops are a player-facing error: the
/// coordinate came from action input.
pub fn goods_at(store: &StateStore, coord: Coord) -> Result<Vec<Good>> {
    store
        .get(GOODS)?
        .into_iter()
        .find(|row| row.coord == coord)
        .map(|row| row.goods)
        .ok_or_else(|| EngineError::invalid(format!("no stop at {coord}")))
}

/// Remove one cube of the given color from a stop. The cube's presence has
/// been validated already, so a miss here is a kernel bug.
pub fn take_good(store: &StateStore, coord: Coord, good: Good) -> Result<()> {
    let mut rows = store.get(GOODS)?;
    let row = rows
        .iter_mut()
        .find(|row| row.coord == coord)
        .ok_or_else(|| EngineError::invariant(format!("no goods row for {coord}")))?;
    let idx = row
        .goods
        .iter()
        .position(|g| *g == good)
        .ok_or_else(|| EngineError::invariant(format!("no {good} cube at {coord}")))?;
    row.goods.remove(idx);
    store.set(GOODS, rows)
}

/// Place a cube on a stop.
pub fn add_good(store: &StateStore, coord: Coord, good: Good) -> Result<()> {
    let mut rows = store.get(GOODS)?;
    let row = rows
        .iter_mut()
        .find(|row| row.coord == coord)
        .ok_or_else(|| EngineError::invariant(format!("no goods row for {coord}")))?;
    row.goods.push(good);
    store.set(GOODS, rows)
}
