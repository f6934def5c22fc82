//! Stateless call envelope and the variant registry
//!
//! Every public entry point follows the same contract: hydrate the engine's
//! memory-managed stores from the caller's snapshot, run, capture the
//! outgoing snapshot and log lines, then wipe memory so nothing leaks into
//! the next call. Callers are the only keepers of game state; the engine
//! singletons carry none between calls.

use crate::core::PlayerId;
use crate::engine::game::GameEngine;
use crate::engine::keys;
use crate::engine::moves::Delivery;
use crate::variant::{standard_variants, Variant};
use crate::{EngineError, Result};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// The outcome of one engine call: the complete successor state plus the
/// facts a caller needs without parsing the snapshot.
#[derive(Debug, Clone)]
pub struct GameResult {
    /// Serialized successor state. Byte-identical replays feed this back in.
    pub snapshot: String,
    pub has_ended: bool,
    pub active_player: Option<PlayerId>,
    /// False once the call consumed randomness, so undo stacks know this
    /// step cannot be replayed backwards.
    pub reversible: bool,
    pub logs: Vec<String>,
}

/// One variant's engine behind the stateless envelope.
pub struct EngineProcessor {
    engine: GameEngine,
}

impl EngineProcessor {
    pub fn for_variant(variant: &dyn Variant) -> Result<Self> {
        Ok(EngineProcessor {
            engine: GameEngine::for_variant(variant)?,
        })
    }

    pub fn start(&self, player_ids: &[PlayerId], seed: u64) -> Result<GameResult> {
        self.enveloped(|engine| {
            engine.start_game(player_ids, seed)?;
            Self::finish(engine)
        })
    }

    pub fn process_action(
        &self,
        snapshot: &str,
        action: &str,
        data: &Value,
    ) -> Result<GameResult> {
        let name = action.parse()?;
        self.enveloped(|engine| {
            engine.store().merge(snapshot)?;
            engine.random().load(engine.store())?;
            engine.execute(name, data)?;
            Self::finish(engine)
        })
    }

    /// Every legal delivery for a player on a snapshot. Read-only; the
    /// snapshot is not advanced.
    pub fn enumerate_deliveries(&self, snapshot: &str, player: PlayerId) -> Result<Vec<Delivery>> {
        self.enveloped(|engine| {
            engine.store().merge(snapshot)?;
            engine.enumerate_deliveries(player)
        })
    }

    /// Run one call and wipe memory afterwards, pass or fail.
    fn enveloped<T>(&self, call: impl FnOnce(&GameEngine) -> Result<T>) -> Result<T> {
        let out = call(&self.engine);
        self.engine.reset_memory();
        out
    }

    fn finish(engine: &GameEngine) -> Result<GameResult> {
        engine.random().save(engine.store())?;
        engine.store().flush_listeners();
        Ok(GameResult {
            snapshot: engine.store().serialize()?,
            has_ended: engine.has_ended_state()?,
            active_player: engine.active_player()?,
            reversible: engine.random().reversible(),
            logs: engine.flush_log(),
        })
    }
}

/// Front door keyed by variant name. Processors are built lazily, once per
/// variant, and reused for every subsequent call.
pub struct EngineDelegator {
    variants: FxHashMap<&'static str, Rc<dyn Variant>>,
    processors: RefCell<FxHashMap<&'static str, Rc<EngineProcessor>>>,
}

impl EngineDelegator {
    pub fn new() -> Self {
        EngineDelegator {
            variants: FxHashMap::default(),
            processors: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn with_standard_variants() -> Self {
        let mut delegator = Self::new();
        for variant in standard_variants() {
            delegator.register(variant);
        }
        delegator
    }

    pub fn register(&mut self, variant: Rc<dyn Variant>) {
        self.variants.insert(variant.key(), variant);
    }

    pub fn variant_keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.variants.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    fn processor(&self, variant_key: &str) -> Result<Rc<EngineProcessor>> {
        if let Some(found) = self.processors.borrow().get(variant_key) {
            return Ok(found.clone());
        }
        let variant = self
            .variants
            .get(variant_key)
            .ok_or_else(|| EngineError::UnknownVariant(variant_key.to_string()))?;
        let processor = Rc::new(EngineProcessor::for_variant(variant.as_ref())?);
        self.processors
            .borrow_mut()
            .insert(variant.key(), processor.clone());
        Ok(processor)
    }

    pub fn start(&self, variant_key: &str, player_ids: &[PlayerId], seed: u64) -> Result<GameResult> {
        self.processor(variant_key)?.start(player_ids, seed)
    }

    pub fn process_action(
        &self,
        variant_key: &str,
        snapshot: &str,
        action: &str,
        data: &Value,
    ) -> Result<GameResult> {
        self.processor(variant_key)?
            .process_action(snapshot, action, data)
    }

    pub fn enumerate_deliveries(
        &self,
        variant_key: &str,
        snapshot: &str,
        player: PlayerId,
    ) -> Result<Vec<Delivery>> {
        self.processor(variant_key)?
            .enumerate_deliveries(snapshot, player)
    }

    /// Read the ended flag straight off a snapshot, no engine call needed.
    pub fn has_ended(snapshot: &str) -> Result<bool> {
        let parsed: Value = serde_json::from_str(snapshot)
            .map_err(|e| EngineError::Serialization(e.to_string()))?;
        parsed
            .get(keys::ENDED.name())
            .and_then(Value::as_bool)
            .ok_or_else(|| EngineError::invalid("snapshot has no ended flag"))
    }
}

impl Default for EngineDelegator {
    fn default() -> Self {
        Self::with_standard_variants()
    }
}
