//! Board-domain value types shared across the engine

pub mod board;
pub mod coords;
pub mod good;
pub mod player;

pub use board::{BoardMap, City, CityGoods, Link};
pub use coords::Coord;
pub use good::Good;
pub use player::{PlayerId, PlayerState};
