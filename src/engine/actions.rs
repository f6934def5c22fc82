//! Game actions: names, the processor contract, and the standard processors
//!
//! Every action runs the same pipeline: strict input parse, legality check
//! against the current state (no mutation), then effect application. A
//! processor's `process` returns whether the acting player's turn is
//! finished - multi-step turns (several builds, several deliveries) return
//! false until their budget is spent.

use crate::core::Link;
use crate::engine::game::GameContext;
use crate::engine::keys;
use crate::engine::moves::{calculate_income, Delivery, MoveValidator};
use crate::engine::rules::{BuildRules, DeliveryPolicy};
use crate::{EngineError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Closed set of action names. Unknown names fail at parse time, before any
/// dispatch machinery runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionName {
    Build,
    MoveGood,
    Locomotive,
    Pass,
}

impl ActionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::Build => "build",
            ActionName::MoveGood => "move",
            ActionName::Locomotive => "loco",
            ActionName::Pass => "pass",
        }
    }
}

impl FromStr for ActionName {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "build" => Ok(ActionName::Build),
            "move" => Ok(ActionName::MoveGood),
            "loco" => Ok(ActionName::Locomotive),
            "pass" => Ok(ActionName::Pass),
            other => Err(EngineError::invalid(format!("unknown action '{other}'"))),
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The capability every game action implements.
///
/// `validate` must not mutate state; `process` may assume `validate` has
/// just passed. Side effects are confined to state-store writes and log
/// appends, and randomness goes through the random service so replay
/// determinism is preserved.
pub trait ActionProcessor {
    fn name(&self) -> ActionName;

    /// Whether this action is currently offerable at all, independent of who
    /// is asking.
    fn can_emit(&self, ctx: &GameContext) -> bool;

    fn validate(&self, ctx: &GameContext, raw: &Value) -> Result<()>;

    /// Apply effects. Returns true when the acting player's turn is done.
    fn process(&self, ctx: &GameContext, raw: &Value) -> Result<bool>;
}

/// Strict parse of untrusted action input. Unknown, missing and mistyped
/// fields fail here, not deeper in validation.
fn assert_input<T: DeserializeOwned>(name: ActionName, raw: &Value) -> Result<T> {
    serde_json::from_value(raw.clone())
        .map_err(|e| EngineError::invalid(format!("malformed {name} input: {e}")))
}

/// Inputs for actions that carry no data. `null` and `{}` are both accepted.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmptyInput {}

fn assert_empty(name: ActionName, raw: &Value) -> Result<()> {
    if raw.is_null() {
        return Ok(());
    }
    assert_input::<EmptyInput>(name, raw).map(|_| ())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildInput {
    pub from: crate::core::Coord,
    pub to: crate::core::Coord,
}

/// Claim one buildable connection for the acting player.
pub struct StandardBuild {
    rules: Rc<dyn BuildRules>,
}

impl StandardBuild {
    pub fn new(rules: Rc<dyn BuildRules>) -> Self {
        StandardBuild { rules }
    }
}

impl ActionProcessor for StandardBuild {
    fn name(&self) -> ActionName {
        ActionName::Build
    }

    fn can_emit(&self, ctx: &GameContext) -> bool {
        match ctx.store.get_opt(keys::BUILDS_DONE) {
            Ok(Some(done)) => done < self.rules.max_builds_per_turn(),
            _ => false,
        }
    }

    fn validate(&self, ctx: &GameContext, raw: &Value) -> Result<()> {
        let input: BuildInput = assert_input(self.name(), raw)?;
        if input.from == input.to {
            return Err(EngineError::invalid("a link needs two distinct stops"));
        }
        for coord in [input.from, input.to] {
            if ctx.map.city_at(coord).is_none() {
                return Err(EngineError::invalid(format!("no stop at {coord}")));
            }
        }
        if !ctx.map.connection_allowed(input.from, input.to) {
            return Err(EngineError::invalid(format!(
                "no buildable connection between {} and {}",
                ctx.map.stop_name(input.from),
                ctx.map.stop_name(input.to)
            )));
        }
        let links = ctx.store.get(keys::LINKS)?;
        if links.iter().any(|l| l.connects(input.from, input.to)) {
            return Err(EngineError::invalid(format!(
                "the link between {} and {} is already built",
                ctx.map.stop_name(input.from),
                ctx.map.stop_name(input.to)
            )));
        }
        let player = keys::current_player(ctx.store)?;
        let cost = self.rules.link_cost(ctx.map, input.from, input.to);
        if keys::player(ctx.store, player)?.money < cost {
            return Err(EngineError::invalid(format!(
                "building this link costs {cost} and you cannot afford it"
            )));
        }
        Ok(())
    }

    fn process(&self, ctx: &GameContext, raw: &Value) -> Result<bool> {
        let input: BuildInput = assert_input(self.name(), raw)?;
        let player = keys::current_player(ctx.store)?;
        let cost = self.rules.link_cost(ctx.map, input.from, input.to);

        keys::update_player(ctx.store, player, |p| p.money -= cost)?;
        ctx.store.update(keys::LINKS, |links: &mut Vec<Link>| {
            links.push(Link::new(input.from, input.to, Some(player)));
        })?;
        let done = ctx.store.get(keys::BUILDS_DONE)? + 1;
        ctx.store.set(keys::BUILDS_DONE, done)?;

        ctx.log.log(format!(
            "Player {player} builds a link from {} to {} for {cost}.",
            ctx.map.stop_name(input.from),
            ctx.map.stop_name(input.to)
        ));
        Ok(done >= self.rules.max_builds_per_turn())
    }
}

/// Deliver one cube along a validated route. Traversal and acceptance
/// policy is the validator's concern; this processor only applies effects.
pub struct StandardMove {
    validator: Rc<MoveValidator>,
}

impl StandardMove {
    pub fn new(validator: Rc<MoveValidator>) -> Self {
        StandardMove { validator }
    }
}

impl ActionProcessor for StandardMove {
    fn name(&self) -> ActionName {
        ActionName::MoveGood
    }

    fn can_emit(&self, ctx: &GameContext) -> bool {
        matches!(ctx.store.get_opt(keys::MOVES_REMAINING), Ok(Some(n)) if n > 0)
    }

    fn validate(&self, ctx: &GameContext, raw: &Value) -> Result<()> {
        let delivery: Delivery = assert_input(self.name(), raw)?;
        let player = keys::current_player(ctx.store)?;
        if ctx.store.get(keys::MOVES_REMAINING)? == 0 {
            return Err(EngineError::invalid("no deliveries left this turn"));
        }
        self.validator.validate(ctx, player, &delivery)
    }

    fn process(&self, ctx: &GameContext, raw: &Value) -> Result<bool> {
        let delivery: Delivery = assert_input(self.name(), raw)?;
        let player = keys::current_player(ctx.store)?;

        keys::take_good(ctx.store, delivery.origin, delivery.good)?;

        let links = ctx.store.get(keys::LINKS)?;
        let income = calculate_income(&links, &delivery);
        let mut owners: Vec<_> = income.iter().collect();
        owners.sort_by_key(|(id, _)| id.as_u32());
        for (owner, earned) in owners {
            keys::update_player(ctx.store, *owner, |p| p.money += *earned as i64)?;
            ctx.log
                .log(format!("Player {owner} earns {earned} for carrying the cube."));
        }

        let remaining = ctx.store.get(keys::MOVES_REMAINING)? - 1;
        ctx.store.set(keys::MOVES_REMAINING, remaining)?;

        let dest = delivery.destination().map(|c| ctx.map.stop_name(c));
        ctx.log.log(format!(
            "Player {player} delivers a {} cube from {} to {}.",
            delivery.good,
            ctx.map.stop_name(delivery.origin),
            dest.unwrap_or_else(|| "nowhere".to_string())
        ));
        Ok(remaining == 0)
    }
}

/// Raise the locomotive level instead of making a delivery.
pub struct StandardLoco {
    policy: Rc<dyn DeliveryPolicy>,
}

impl StandardLoco {
    pub fn new(policy: Rc<dyn DeliveryPolicy>) -> Self {
        StandardLoco { policy }
    }
}

impl ActionProcessor for StandardLoco {
    fn name(&self) -> ActionName {
        ActionName::Locomotive
    }

    fn can_emit(&self, ctx: &GameContext) -> bool {
        let moves_left = matches!(ctx.store.get_opt(keys::MOVES_REMAINING), Ok(Some(n)) if n > 0);
        let unused = matches!(ctx.store.get_opt(keys::LOCO_USED), Ok(Some(false)));
        moves_left && unused
    }

    fn validate(&self, ctx: &GameContext, raw: &Value) -> Result<()> {
        assert_empty(self.name(), raw)?;
        if ctx.store.get(keys::LOCO_USED)? {
            return Err(EngineError::invalid(
                "the locomotive can only be upgraded once per turn",
            ));
        }
        if ctx.store.get(keys::MOVES_REMAINING)? == 0 {
            return Err(EngineError::invalid("no deliveries left this turn"));
        }
        let player = keys::current_player(ctx.store)?;
        if keys::player(ctx.store, player)?.loco >= self.policy.loco_cap() {
            return Err(EngineError::invalid(format!(
                "the locomotive is already at its cap of {}",
                self.policy.loco_cap()
            )));
        }
        Ok(())
    }

    fn process(&self, ctx: &GameContext, _raw: &Value) -> Result<bool> {
        let player = keys::current_player(ctx.store)?;
        keys::update_player(ctx.store, player, |p| p.loco += 1)?;
        ctx.store.set(keys::LOCO_USED, true)?;
        let remaining = ctx.store.get(keys::MOVES_REMAINING)? - 1;
        ctx.store.set(keys::MOVES_REMAINING, remaining)?;

        let level = keys::player(ctx.store, player)?.loco;
        ctx.log
            .log(format!("Player {player} upgrades the locomotive to level {level}."));
        Ok(remaining == 0)
    }
}

/// End the acting player's turn without further effect.
pub struct StandardPass;

impl ActionProcessor for StandardPass {
    fn name(&self) -> ActionName {
        ActionName::Pass
    }

    fn can_emit(&self, _ctx: &GameContext) -> bool {
        true
    }

    fn validate(&self, _ctx: &GameContext, raw: &Value) -> Result<()> {
        assert_empty(self.name(), raw)
    }

    fn process(&self, ctx: &GameContext, _raw: &Value) -> Result<bool> {
        let player = keys::current_player(ctx.store)?;
        ctx.log.log(format!("Player {player} passes."));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_name_round_trip() {
        for name in [
            ActionName::Build,
            ActionName::MoveGood,
            ActionName::Locomotive,
            ActionName::Pass,
        ] {
            assert_eq!(name.as_str().parse::<ActionName>().unwrap(), name);
        }
    }

    #[test]
    fn test_unknown_action_rejected() {
        let err = "teleport".parse::<ActionName>().unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_strict_input_rejects_unknown_fields() {
        let raw = serde_json::json!({
            "from": {"q": 0, "r": 0},
            "to": {"q": 1, "r": 0},
            "speed": 9
        });
        let err = assert_input::<BuildInput>(ActionName::Build, &raw).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_input_accepts_null_and_object() {
        assert!(assert_empty(ActionName::Pass, &Value::Null).is_ok());
        assert!(assert_empty(ActionName::Pass, &serde_json::json!({})).is_ok());
        assert!(assert_empty(ActionName::Pass, &serde_json::json!({"x": 1})).is_err());
    }
}
