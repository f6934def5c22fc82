//! Overridable rules policies and their extension points
//!
//! These are the seams a variant reaches through to change behavior: small
//! stateless trait objects resolved once per variant. Anything resembling a
//! map-specific policy (ownership rules for traversal, acceptance rules,
//! growth behavior) lives behind one of these traits rather than in the
//! kernel pipeline itself.

use crate::core::{BoardMap, City, Coord, Good, Link, PlayerId};
use crate::engine::actions::{
    ActionProcessor, StandardBuild, StandardLoco, StandardMove, StandardPass,
};
use crate::engine::game::GameContext;
use crate::engine::keys;
use crate::engine::moves::MoveValidator;
use crate::engine::phase::Phase;
use crate::overrides::{ExtensionPoint, OverrideResolver};
use crate::Result;
use smallvec::{smallvec, SmallVec};
use std::rc::Rc;

/// Phase order and round limit for one variant.
pub trait PhasePlan {
    fn phases(&self) -> SmallVec<[Phase; 4]>;
    fn round_limit(&self, player_count: usize) -> u32;
}

pub struct StandardPhasePlan;

impl PhasePlan for StandardPhasePlan {
    fn phases(&self) -> SmallVec<[Phase; 4]> {
        smallvec![Phase::Building, Phase::Moving, Phase::Growth]
    }

    fn round_limit(&self, player_count: usize) -> u32 {
        match player_count {
            0..=3 => 10,
            4 => 8,
            5 => 7,
            _ => 6,
        }
    }
}

/// Track-building costs and limits.
pub trait BuildRules {
    fn link_cost(&self, map: &BoardMap, from: Coord, to: Coord) -> i64;
    fn max_builds_per_turn(&self) -> u32;
}

pub struct StandardBuildRules;

impl BuildRules for StandardBuildRules {
    fn link_cost(&self, _map: &BoardMap, _from: Coord, _to: Coord) -> i64 {
        4
    }

    fn max_builds_per_turn(&self) -> u32 {
        3
    }
}

/// Delivery legality knobs: acceptance, traversal, budgets.
pub trait DeliveryPolicy {
    /// Whether a city takes delivery of a good.
    fn city_accepts(&self, city: &City, good: Good) -> bool;
    /// Whether the acting player may move a good across a built link.
    fn can_traverse(&self, link: &Link, player: PlayerId) -> bool;
    /// Deliveries available to a player per Moving-phase turn.
    fn moves_per_turn(&self) -> u32;
    /// Highest reachable locomotive level.
    fn loco_cap(&self) -> u8;
}

pub struct StandardDeliveryPolicy;

impl DeliveryPolicy for StandardDeliveryPolicy {
    fn city_accepts(&self, city: &City, good: Good) -> bool {
        city.color == good
    }

    fn can_traverse(&self, link: &Link, player: PlayerId) -> bool {
        match link.owner {
            Some(owner) => owner == player,
            None => true, // neutral track is open to everyone
        }
    }

    fn moves_per_turn(&self) -> u32 {
        2
    }

    fn loco_cap(&self) -> u8 {
        6
    }
}

/// Goods growth: how cubes leave the bag and land on the board.
pub trait GrowthRules {
    fn grow(&self, ctx: &GameContext) -> Result<()>;
}

/// Draws a fixed number of cubes from the bag onto random cities. Drawing
/// from the bag reveals hidden information, so it goes through the random
/// service and marks the call non-reversible.
pub struct StandardGrowthRules {
    cubes_per_round: u32,
}

impl StandardGrowthRules {
    pub fn new() -> Self {
        StandardGrowthRules { cubes_per_round: 2 }
    }
}

impl Default for StandardGrowthRules {
    fn default() -> Self {
        Self::new()
    }
}

impl GrowthRules for StandardGrowthRules {
    fn grow(&self, ctx: &GameContext) -> Result<()> {
        let city_count = ctx.map.cities().len();
        if city_count == 0 {
            return Ok(());
        }
        for _ in 0..self.cubes_per_round {
            let mut bag = ctx.store.get(keys::BAG)?;
            if bag.is_empty() {
                ctx.log.log("The goods bag is empty.");
                break;
            }
            let good = bag.remove(ctx.random.pick(bag.len()));
            ctx.store.set(keys::BAG, bag)?;

            let city = &ctx.map.cities()[ctx.random.pick(city_count)];
            keys::add_good(ctx.store, city.coord, good)?;
            ctx.log
                .log(format!("A {good} cube appears at {}.", city.name));
        }
        Ok(())
    }
}

/// Variant starter hook, run once at the end of `start` setup.
pub trait SetupHook {
    fn setup(&self, ctx: &GameContext) -> Result<()>;
}

pub struct NoSetup;

impl SetupHook for NoSetup {
    fn setup(&self, _ctx: &GameContext) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Extension points
// ---------------------------------------------------------------------------

pub enum PhasePlanPoint {}
impl ExtensionPoint for PhasePlanPoint {
    type Api = dyn PhasePlan;
    const NAME: &'static str = "phase plan";
}

pub enum BuildRulesPoint {}
impl ExtensionPoint for BuildRulesPoint {
    type Api = dyn BuildRules;
    const NAME: &'static str = "build rules";
}

pub enum DeliveryPolicyPoint {}
impl ExtensionPoint for DeliveryPolicyPoint {
    type Api = dyn DeliveryPolicy;
    const NAME: &'static str = "delivery policy";
}

pub enum GrowthRulesPoint {}
impl ExtensionPoint for GrowthRulesPoint {
    type Api = dyn GrowthRules;
    const NAME: &'static str = "growth rules";
}

pub enum SetupHookPoint {}
impl ExtensionPoint for SetupHookPoint {
    type Api = dyn SetupHook;
    const NAME: &'static str = "setup hook";
}

pub enum MoveValidatorPoint {}
impl ExtensionPoint for MoveValidatorPoint {
    type Api = MoveValidator;
    const NAME: &'static str = "move validator";
}

// Whole-processor points, for variants that replace an action outright
// rather than tuning its policies.

pub enum BuildActionPoint {}
impl ExtensionPoint for BuildActionPoint {
    type Api = dyn ActionProcessor;
    const NAME: &'static str = "build action";
}

pub enum MoveActionPoint {}
impl ExtensionPoint for MoveActionPoint {
    type Api = dyn ActionProcessor;
    const NAME: &'static str = "move action";
}

pub enum LocoActionPoint {}
impl ExtensionPoint for LocoActionPoint {
    type Api = dyn ActionProcessor;
    const NAME: &'static str = "loco action";
}

pub enum PassActionPoint {}
impl ExtensionPoint for PassActionPoint {
    type Api = dyn ActionProcessor;
    const NAME: &'static str = "pass action";
}

/// Install the kernel's default binding for every point. Called before
/// `Variant::install`, which may override any subset.
pub fn install_standard(resolver: &mut OverrideResolver) {
    resolver.bind::<PhasePlanPoint>(|_| Ok(Rc::new(StandardPhasePlan) as Rc<dyn PhasePlan>));
    resolver.bind::<BuildRulesPoint>(|_| Ok(Rc::new(StandardBuildRules) as Rc<dyn BuildRules>));
    resolver.bind::<DeliveryPolicyPoint>(|_| {
        Ok(Rc::new(StandardDeliveryPolicy) as Rc<dyn DeliveryPolicy>)
    });
    resolver
        .bind::<GrowthRulesPoint>(|_| Ok(Rc::new(StandardGrowthRules::new()) as Rc<dyn GrowthRules>));
    resolver.bind::<SetupHookPoint>(|_| Ok(Rc::new(NoSetup) as Rc<dyn SetupHook>));
    resolver.bind::<MoveValidatorPoint>(|r| {
        Ok(Rc::new(MoveValidator::new(r.resolve::<DeliveryPolicyPoint>()?)))
    });
    resolver.bind::<BuildActionPoint>(|r| {
        Ok(Rc::new(StandardBuild::new(r.resolve::<BuildRulesPoint>()?))
            as Rc<dyn ActionProcessor>)
    });
    resolver.bind::<MoveActionPoint>(|r| {
        Ok(Rc::new(StandardMove::new(r.resolve::<MoveValidatorPoint>()?))
            as Rc<dyn ActionProcessor>)
    });
    resolver.bind::<LocoActionPoint>(|r| {
        Ok(Rc::new(StandardLoco::new(r.resolve::<DeliveryPolicyPoint>()?))
            as Rc<dyn ActionProcessor>)
    });
    resolver.bind::<PassActionPoint>(|_| Ok(Rc::new(StandardPass) as Rc<dyn ActionProcessor>));
}
