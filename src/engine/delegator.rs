//! Action dispatch gated by the current phase
//!
//! The delegator owns the resolved processor for each action name and is
//! the single place where "is this action available right now" is decided.
//! Rejections deliberately use one flat message so callers cannot probe
//! hidden state by comparing refusals.

use crate::engine::actions::{ActionName, ActionProcessor};
use crate::engine::game::GameContext;
use crate::engine::keys;
use crate::engine::phase::Phase;
use crate::engine::rules::{BuildActionPoint, LocoActionPoint, MoveActionPoint, PassActionPoint};
use crate::overrides::OverrideResolver;
use crate::{EngineError, Result};
use serde_json::Value;
use std::rc::Rc;

pub struct PhaseDelegator {
    build: Rc<dyn ActionProcessor>,
    move_good: Rc<dyn ActionProcessor>,
    loco: Rc<dyn ActionProcessor>,
    pass: Rc<dyn ActionProcessor>,
}

impl PhaseDelegator {
    pub fn from_resolver(resolver: &OverrideResolver) -> Result<Self> {
        Ok(PhaseDelegator {
            build: resolver.resolve::<BuildActionPoint>()?,
            move_good: resolver.resolve::<MoveActionPoint>()?,
            loco: resolver.resolve::<LocoActionPoint>()?,
            pass: resolver.resolve::<PassActionPoint>()?,
        })
    }

    fn processor(&self, name: ActionName) -> &Rc<dyn ActionProcessor> {
        match name {
            ActionName::Build => &self.build,
            ActionName::MoveGood => &self.move_good,
            ActionName::Locomotive => &self.loco,
            ActionName::Pass => &self.pass,
        }
    }

    /// Which action names a phase admits at all, before per-processor
    /// availability.
    fn allowed_in(phase: Phase, name: ActionName) -> bool {
        match phase {
            Phase::Building => matches!(name, ActionName::Build | ActionName::Pass),
            Phase::Moving => matches!(
                name,
                ActionName::MoveGood | ActionName::Locomotive | ActionName::Pass
            ),
            Phase::Growth => false,
        }
    }

    /// Gate, validate, process. Returns the processor's turn-done flag.
    pub fn dispatch(&self, ctx: &GameContext, name: ActionName, raw: &Value) -> Result<bool> {
        let phase = ctx
            .store
            .get_opt(keys::PHASE)?
            .ok_or_else(|| EngineError::invalid("not your turn to do that"))?;
        let processor = self.processor(name);
        if !Self::allowed_in(phase, name) || !processor.can_emit(ctx) {
            return Err(EngineError::invalid("not your turn to do that"));
        }
        processor.validate(ctx, raw)?;
        processor.process(ctx, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_admits_matching_actions() {
        assert!(PhaseDelegator::allowed_in(Phase::Building, ActionName::Build));
        assert!(PhaseDelegator::allowed_in(Phase::Building, ActionName::Pass));
        assert!(!PhaseDelegator::allowed_in(Phase::Building, ActionName::MoveGood));

        assert!(PhaseDelegator::allowed_in(Phase::Moving, ActionName::MoveGood));
        assert!(PhaseDelegator::allowed_in(Phase::Moving, ActionName::Locomotive));
        assert!(!PhaseDelegator::allowed_in(Phase::Moving, ActionName::Build));

        for name in [
            ActionName::Build,
            ActionName::MoveGood,
            ActionName::Locomotive,
            ActionName::Pass,
        ] {
            assert!(!PhaseDelegator::allowed_in(Phase::Growth, name));
        }
    }
}
