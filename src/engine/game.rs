//! Per-variant game engine façade
//!
//! A [`GameEngine`] is built once per variant key and reused across calls
//! and across games: it owns the resolved component singletons plus the
//! memory-managed stores, and it holds no game-specific data outside of
//! [`Memory`]-registered members (which the envelope resets after every
//! call).

use crate::core::{BoardMap, CityGoods, PlayerId, PlayerState};
use crate::engine::actions::ActionName;
use crate::engine::delegator::PhaseDelegator;
use crate::engine::keys;
use crate::engine::moves::{Delivery, MoveSearcher};
use crate::engine::phase::RoundEngine;
use crate::engine::rules::{
    self, DeliveryPolicyPoint, GrowthRulesPoint, MoveValidatorPoint, PhasePlanPoint, SetupHook,
    SetupHookPoint,
};
use crate::log::GameLog;
use crate::memory::Memory;
use crate::overrides::OverrideResolver;
use crate::random::RandomService;
use crate::state::StateStore;
use crate::variant::Variant;
use crate::{EngineError, Result};
use serde_json::Value;
use std::ops::RangeInclusive;
use std::rc::Rc;

/// The explicit per-call context threaded through every component method.
/// All mutation goes through interior-mutable members, so a shared reference
/// is enough everywhere and per-call isolation stays provable.
pub struct GameContext<'a> {
    pub store: &'a StateStore,
    pub log: &'a GameLog,
    pub random: &'a RandomService,
    pub map: &'a BoardMap,
}

pub struct GameEngine {
    store: Rc<StateStore>,
    memory: Memory,
    log: Rc<GameLog>,
    random: Rc<RandomService>,
    map: BoardMap,
    delegator: PhaseDelegator,
    rounds: RoundEngine,
    setup: Rc<dyn SetupHook>,
    searcher: MoveSearcher,
    player_range: RangeInclusive<usize>,
    // Kept alive so late resolutions (tests, tooling) hit the same
    // singletons the engine was built from.
    #[allow(dead_code)]
    resolver: OverrideResolver,
}

impl GameEngine {
    /// Resolve all components for one variant and assemble the engine.
    pub fn for_variant(variant: &dyn Variant) -> Result<Self> {
        let mut resolver = OverrideResolver::new();
        rules::install_standard(&mut resolver);
        variant.install(&mut resolver)?;

        let memory = Memory::new();
        let store = Rc::new(StateStore::new());
        memory.register(store.clone());
        let log = Rc::new(GameLog::new());
        memory.register(log.clone());
        let random = Rc::new(RandomService::new());
        memory.register(random.clone());

        let delegator = PhaseDelegator::from_resolver(&resolver)?;
        let rounds = RoundEngine::new(
            resolver.resolve::<PhasePlanPoint>()?,
            resolver.resolve::<GrowthRulesPoint>()?,
            resolver.resolve::<DeliveryPolicyPoint>()?,
        );
        let searcher = MoveSearcher::new(resolver.resolve::<MoveValidatorPoint>()?);
        let setup = resolver.resolve::<SetupHookPoint>()?;

        Ok(GameEngine {
            store,
            memory,
            log,
            random,
            map: variant.board(),
            delegator,
            rounds,
            setup,
            searcher,
            player_range: variant.player_range(),
            resolver,
        })
    }

    pub fn ctx(&self) -> GameContext<'_> {
        GameContext {
            store: &self.store,
            log: &self.log,
            random: &self.random,
            map: &self.map,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn random(&self) -> &RandomService {
        &self.random
    }

    pub fn reset_memory(&self) {
        self.memory.reset_all();
    }

    pub fn flush_log(&self) -> Vec<String> {
        self.log.flush()
    }

    /// Build the initial game state and run the variant starter hook.
    pub fn start_game(&self, player_ids: &[PlayerId], seed: u64) -> Result<()> {
        if !self.player_range.contains(&player_ids.len()) {
            return Err(EngineError::invalid(format!(
                "this variant plays with {} to {} players, got {}",
                self.player_range.start(),
                self.player_range.end(),
                player_ids.len()
            )));
        }
        for (idx, id) in player_ids.iter().enumerate() {
            if player_ids[..idx].contains(id) {
                return Err(EngineError::invalid(format!("duplicate player id {id}")));
            }
        }

        let store = &*self.store;
        self.random.init_state(store, seed)?;
        store.init(keys::ENDED, false)?;
        store.init(
            keys::PLAYERS,
            player_ids.iter().map(|id| PlayerState::new(*id)).collect(),
        )?;
        store.init(keys::PLAYER_ORDER, player_ids.to_vec())?;
        store.init(keys::LINKS, Vec::new())?;

        // Shuffle the bag and seed each city's starting cubes from it.
        let mut bag = self.map.bag().to_vec();
        self.random.shuffle(&mut bag);
        let mut rows = Vec::with_capacity(self.map.cities().len());
        for city in self.map.cities() {
            let mut goods = Vec::new();
            for _ in 0..self.map.starting_cubes() {
                match bag.pop() {
                    Some(good) => goods.push(good),
                    None => break,
                }
            }
            rows.push(CityGoods {
                coord: city.coord,
                goods,
            });
        }
        store.init(keys::GOODS, rows)?;
        store.init(keys::BAG, bag)?;

        let ctx = self.ctx();
        ctx.log.log(format!(
            "A new game begins with {} players.",
            player_ids.len()
        ));
        self.setup.setup(&ctx)?;
        self.rounds.begin_game(&ctx)
    }

    /// Run one already-merged action through the pipeline.
    pub fn execute(&self, name: ActionName, raw: &Value) -> Result<()> {
        if self.store.get(keys::ENDED)? {
            return Err(EngineError::invalid("the game has ended"));
        }
        let ctx = self.ctx();
        let turn_done = self.delegator.dispatch(&ctx, name, raw)?;
        self.rounds.after_action(&ctx, turn_done)
    }

    pub fn has_ended_state(&self) -> Result<bool> {
        self.store.get(keys::ENDED)
    }

    pub fn active_player(&self) -> Result<Option<PlayerId>> {
        self.store.get_opt(keys::CURRENT_PLAYER)
    }

    /// Enumerate every legal delivery for a player on the merged state.
    /// Advisory only - not part of the validation hot path.
    pub fn enumerate_deliveries(&self, player: PlayerId) -> Result<Vec<Delivery>> {
        self.searcher.find_all_routes(&self.ctx(), player)
    }
}
