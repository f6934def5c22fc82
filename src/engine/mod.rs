//! The rules kernel: state keys, actions, phases, routes, and the
//! stateless call envelope.

pub mod actions;
pub mod delegator;
pub mod game;
pub mod keys;
pub mod moves;
pub mod phase;
pub mod processor;
pub mod rules;

pub use actions::{ActionName, ActionProcessor};
pub use delegator::PhaseDelegator;
pub use game::{GameContext, GameEngine};
pub use moves::{calculate_income, Delivery, MoveSearcher, MoveValidator};
pub use phase::{Phase, RoundEngine};
pub use processor::{EngineDelegator, EngineProcessor, GameResult};
