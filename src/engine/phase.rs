//! Round and phase state machine
//!
//! Rounds run the variant's phase list in order; input phases give every
//! player one turn in seating order, auto phases run to completion with no
//! input. The machine stores its position (`round`, `phase`, `turnIndex`,
//! `currentPlayer`) in the state store like any other game data, so a
//! snapshot alone pins down whose input comes next.

use crate::engine::game::GameContext;
use crate::engine::keys;
use crate::engine::rules::{DeliveryPolicy, GrowthRules, PhasePlan};
use crate::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Building,
    Moving,
    Growth,
}

impl Phase {
    /// Auto phases run entirely inside the kernel; no action is legal
    /// while one is notionally current.
    pub fn needs_input(&self) -> bool {
        !matches!(self, Phase::Growth)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Building => f.write_str("Building"),
            Phase::Moving => f.write_str("Moving"),
            Phase::Growth => f.write_str("Growth"),
        }
    }
}

/// Drives the round/phase/turn cycle. Stateless apart from its resolved
/// policies; all position lives in the store.
pub struct RoundEngine {
    plan: Rc<dyn PhasePlan>,
    growth: Rc<dyn GrowthRules>,
    delivery: Rc<dyn DeliveryPolicy>,
}

impl RoundEngine {
    pub fn new(
        plan: Rc<dyn PhasePlan>,
        growth: Rc<dyn GrowthRules>,
        delivery: Rc<dyn DeliveryPolicy>,
    ) -> Self {
        RoundEngine {
            plan,
            growth,
            delivery,
        }
    }

    /// Open round one and advance to the first input phase.
    pub fn begin_game(&self, ctx: &GameContext) -> Result<()> {
        ctx.store.init(keys::ROUND, 1)?;
        ctx.log.log("=== Round 1 ===");
        self.enter_phases(ctx, 0)
    }

    /// Advance the machine after a dispatched action. A false `turn_done`
    /// keeps the same player on; true rotates to the next player, and past
    /// the last player, to the next phase.
    pub fn after_action(&self, ctx: &GameContext, turn_done: bool) -> Result<()> {
        if !turn_done {
            return Ok(());
        }
        let order = ctx.store.get(keys::PLAYER_ORDER)?;
        let next = ctx.store.get(keys::TURN_INDEX)? + 1;
        if next < order.len() {
            ctx.store.set(keys::TURN_INDEX, next)?;
            ctx.store.set(keys::CURRENT_PLAYER, order[next])?;
            return self.begin_turn(ctx);
        }
        self.exit_phase(ctx)?;
        let current = ctx.store.get(keys::PHASE)?;
        let pos = self
            .plan
            .phases()
            .iter()
            .position(|p| *p == current)
            .ok_or_else(|| EngineError::invariant(format!("phase {current} not in plan")))?;
        self.enter_phases(ctx, pos + 1)
    }

    /// Walk the phase list from `start`, running auto phases inline, until
    /// an input phase opens or the round limit ends the game. Wrapping past
    /// the end of the list closes the round.
    fn enter_phases(&self, ctx: &GameContext, start: usize) -> Result<()> {
        let phases = self.plan.phases();
        if phases.is_empty() {
            return Err(EngineError::invariant("the phase plan is empty"));
        }
        let order = ctx.store.get(keys::PLAYER_ORDER)?;
        let mut pos = start;
        loop {
            if pos >= phases.len() {
                let round = ctx.store.get(keys::ROUND)? + 1;
                if round > self.plan.round_limit(order.len()) {
                    return self.end_game(ctx);
                }
                ctx.store.set(keys::ROUND, round)?;
                ctx.log.log(format!("=== Round {round} ==="));
                pos = 0;
                continue;
            }
            let phase = phases[pos];
            keys::upsert(ctx.store, keys::PHASE, phase)?;
            if !phase.needs_input() {
                self.growth.grow(ctx)?;
                pos += 1;
                continue;
            }
            keys::upsert(ctx.store, keys::TURN_INDEX, 0)?;
            let first = *order
                .first()
                .ok_or_else(|| EngineError::invariant("empty player order"))?;
            keys::upsert(ctx.store, keys::CURRENT_PLAYER, first)?;
            return self.begin_turn(ctx);
        }
    }

    /// Seed the acting player's per-turn budget keys for the current phase.
    fn begin_turn(&self, ctx: &GameContext) -> Result<()> {
        let phase = ctx.store.get(keys::PHASE)?;
        let player = keys::current_player(ctx.store)?;
        match phase {
            Phase::Building => {
                keys::upsert(ctx.store, keys::BUILDS_DONE, 0)?;
            }
            Phase::Moving => {
                keys::upsert(ctx.store, keys::MOVES_REMAINING, self.delivery.moves_per_turn())?;
                keys::upsert(ctx.store, keys::LOCO_USED, false)?;
            }
            Phase::Growth => {
                return Err(EngineError::invariant("no turns inside an auto phase"));
            }
        }
        ctx.log
            .log(format!("Player {player} is up in the {phase} phase."));
        Ok(())
    }

    /// Transient per-phase keys vanish on exit so snapshots taken between
    /// phases carry no stale budgets.
    fn exit_phase(&self, ctx: &GameContext) -> Result<()> {
        keys::delete_if_present(ctx.store, keys::BUILDS_DONE)?;
        keys::delete_if_present(ctx.store, keys::MOVES_REMAINING)?;
        keys::delete_if_present(ctx.store, keys::LOCO_USED)?;
        Ok(())
    }

    fn end_game(&self, ctx: &GameContext) -> Result<()> {
        ctx.store.set(keys::ENDED, true)?;
        keys::delete_if_present(ctx.store, keys::PHASE)?;
        keys::delete_if_present(ctx.store, keys::CURRENT_PLAYER)?;
        keys::delete_if_present(ctx.store, keys::TURN_INDEX)?;
        let round = ctx.store.get(keys::ROUND)?;
        ctx.log.log(format!("The game ends after round {round}."));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BoardMap, City, CityGoods, Coord, Good, PlayerId};
    use crate::engine::rules::{StandardDeliveryPolicy, StandardGrowthRules};
    use crate::log::GameLog;
    use crate::random::RandomService;
    use crate::state::StateStore;
    use smallvec::{smallvec, SmallVec};

    struct TwoPhasePlan;

    impl PhasePlan for TwoPhasePlan {
        fn phases(&self) -> SmallVec<[Phase; 4]> {
            smallvec![Phase::Building, Phase::Growth]
        }

        fn round_limit(&self, _player_count: usize) -> u32 {
            2
        }
    }

    fn test_map() -> BoardMap {
        let a = Coord { q: 0, r: 0 };
        let b = Coord { q: 1, r: 0 };
        BoardMap::new(
            vec![
                City {
                    name: "Avon".into(),
                    coord: a,
                    color: Good::Red,
                },
                City {
                    name: "Bray".into(),
                    coord: b,
                    color: Good::Blue,
                },
            ],
            vec![(a, b)],
            vec![Good::Red, Good::Blue, Good::Yellow, Good::Purple],
            0,
        )
    }

    struct Fixture {
        store: StateStore,
        log: GameLog,
        random: RandomService,
        map: BoardMap,
    }

    impl Fixture {
        fn new(players: usize) -> Self {
            let store = StateStore::new();
            let random = RandomService::new();
            random.init_state(&store, 7).unwrap();
            let order: Vec<PlayerId> = (0..players as u32).map(PlayerId::new).collect();
            store.init(keys::ENDED, false).unwrap();
            store.init(keys::PLAYER_ORDER, order).unwrap();
            let map = test_map();
            let rows: Vec<CityGoods> = map
                .cities()
                .iter()
                .map(|c| CityGoods {
                    coord: c.coord,
                    goods: Vec::new(),
                })
                .collect();
            store.init(keys::GOODS, rows).unwrap();
            store
                .init(keys::BAG, vec![Good::Red, Good::Blue, Good::Yellow])
                .unwrap();
            Fixture {
                store,
                log: GameLog::new(),
                random,
                map,
            }
        }

        fn ctx(&self) -> GameContext<'_> {
            GameContext {
                store: &self.store,
                log: &self.log,
                random: &self.random,
                map: &self.map,
            }
        }

        fn rounds(&self, plan: Rc<dyn PhasePlan>) -> RoundEngine {
            RoundEngine::new(
                plan,
                Rc::new(StandardGrowthRules::new()),
                Rc::new(StandardDeliveryPolicy),
            )
        }
    }

    #[test]
    fn test_phase_needs_input() {
        assert!(Phase::Building.needs_input());
        assert!(Phase::Moving.needs_input());
        assert!(!Phase::Growth.needs_input());
    }

    #[test]
    fn test_begin_game_opens_first_phase() {
        let fx = Fixture::new(2);
        let rounds = fx.rounds(Rc::new(TwoPhasePlan));
        rounds.begin_game(&fx.ctx()).unwrap();

        assert_eq!(fx.store.get(keys::ROUND).unwrap(), 1);
        assert_eq!(fx.store.get(keys::PHASE).unwrap(), Phase::Building);
        assert_eq!(fx.store.get(keys::CURRENT_PLAYER).unwrap(), PlayerId::new(0));
        assert_eq!(fx.store.get(keys::BUILDS_DONE).unwrap(), 0);
    }

    #[test]
    fn test_turn_rotation_and_continuation() {
        let fx = Fixture::new(3);
        let rounds = fx.rounds(Rc::new(TwoPhasePlan));
        rounds.begin_game(&fx.ctx()).unwrap();

        // An unfinished turn keeps the same player on.
        rounds.after_action(&fx.ctx(), false).unwrap();
        assert_eq!(fx.store.get(keys::CURRENT_PLAYER).unwrap(), PlayerId::new(0));

        rounds.after_action(&fx.ctx(), true).unwrap();
        assert_eq!(fx.store.get(keys::CURRENT_PLAYER).unwrap(), PlayerId::new(1));
        assert_eq!(fx.store.get(keys::TURN_INDEX).unwrap(), 1);
    }

    #[test]
    fn test_auto_phase_runs_and_round_wraps() {
        let fx = Fixture::new(2);
        let rounds = fx.rounds(Rc::new(TwoPhasePlan));
        rounds.begin_game(&fx.ctx()).unwrap();

        // Both players finish the Building phase; Growth runs inline and
        // round two's Building phase opens.
        rounds.after_action(&fx.ctx(), true).unwrap();
        rounds.after_action(&fx.ctx(), true).unwrap();

        assert_eq!(fx.store.get(keys::ROUND).unwrap(), 2);
        assert_eq!(fx.store.get(keys::PHASE).unwrap(), Phase::Building);
        assert_eq!(fx.store.get(keys::CURRENT_PLAYER).unwrap(), PlayerId::new(0));
        // Growth drew two cubes from a three-cube bag.
        assert_eq!(fx.store.get(keys::BAG).unwrap().len(), 1);
        assert!(!fx.random.reversible());
    }

    #[test]
    fn test_round_limit_ends_game() {
        let fx = Fixture::new(2);
        let rounds = fx.rounds(Rc::new(TwoPhasePlan));
        rounds.begin_game(&fx.ctx()).unwrap();

        // Two rounds of two turns each.
        for _ in 0..4 {
            rounds.after_action(&fx.ctx(), true).unwrap();
        }

        assert!(fx.store.get(keys::ENDED).unwrap());
        assert!(!fx.store.contains(keys::PHASE));
        assert!(!fx.store.contains(keys::CURRENT_PLAYER));
        assert!(!fx.store.contains(keys::BUILDS_DONE));
    }
}
