//! steamrail - a rules kernel for turn-based rail delivery games
//!
//! The crate separates a small generic kernel (state store, action
//! pipeline, phase machine, route search) from per-map variant modules
//! that override its extension points. Engine calls are stateless: the
//! caller holds the serialized game snapshot and passes it into every
//! call, and the engine wipes its own memory afterwards. Replaying the
//! same snapshot and action always yields byte-identical output, which is
//! the contract save files and undo stacks rely on.

pub mod core;
pub mod engine;
pub mod error;
pub mod log;
pub mod memory;
pub mod overrides;
pub mod random;
pub mod state;
pub mod variant;

pub use error::{EngineError, Result};
