//! Delivery routes: validation, income, and exhaustive search
//!
//! A route is a cube's origin plus the ordered stops it passes through.
//! [`MoveValidator`] checks complete routes (the move action's legality
//! check) and partial ones (the searcher's pruning check). [`MoveSearcher`]
//! enumerates every legal delivery by depth-first extension over built
//! track; the no-revisit rule and the locomotive cap bound the search.

use crate::core::board::link_between;
use crate::core::{Coord, Good, Link, PlayerId};
use crate::engine::game::GameContext;
use crate::engine::keys;
use crate::engine::rules::DeliveryPolicy;
use crate::{EngineError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::rc::Rc;

/// One cube's journey. Serializes with the same shape the move action
/// accepts, so an enumerated route can be fed straight back as input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Delivery {
    pub good: Good,
    pub origin: Coord,
    pub stops: SmallVec<[Coord; 8]>,
}

impl Delivery {
    pub fn destination(&self) -> Option<Coord> {
        self.stops.last().copied()
    }

    /// The route's link endpoints in travel order.
    pub fn hops(&self) -> impl Iterator<Item = (Coord, Coord)> + '_ {
        std::iter::once(self.origin)
            .chain(self.stops.iter().copied())
            .zip(self.stops.iter().copied())
    }
}

/// Checks routes against built track and the delivery policy.
pub struct MoveValidator {
    policy: Rc<dyn DeliveryPolicy>,
}

impl MoveValidator {
    pub fn new(policy: Rc<dyn DeliveryPolicy>) -> Self {
        MoveValidator { policy }
    }

    /// Full legality: a partial-valid route whose destination accepts the
    /// cube.
    pub fn validate(&self, ctx: &GameContext, player: PlayerId, delivery: &Delivery) -> Result<()> {
        let dest = delivery
            .destination()
            .ok_or_else(|| EngineError::invalid("a delivery needs at least one stop"))?;
        self.validate_partial(ctx, player, delivery)?;
        let city = ctx
            .map
            .city_at(dest)
            .ok_or_else(|| EngineError::invalid(format!("no stop at {dest}")))?;
        if !self.policy.city_accepts(city, delivery.good) {
            return Err(EngineError::invalid(format!(
                "{} does not accept {} cubes",
                city.name, delivery.good
            )));
        }
        Ok(())
    }

    /// Prefix legality, without requiring the final stop to accept the
    /// cube. A failing prefix can never be extended into a legal route, so
    /// the searcher prunes on this.
    pub fn validate_partial(
        &self,
        ctx: &GameContext,
        player: PlayerId,
        delivery: &Delivery,
    ) -> Result<()> {
        if !keys::goods_at(ctx.store, delivery.origin)?.contains(&delivery.good) {
            return Err(EngineError::invalid(format!(
                "no {} cube at {}",
                delivery.good,
                ctx.map.stop_name(delivery.origin)
            )));
        }
        let mut visited: SmallVec<[Coord; 8]> = SmallVec::new();
        visited.push(delivery.origin);
        let links = ctx.store.get(keys::LINKS)?;
        for (from, to) in delivery.hops() {
            if visited.contains(&to) {
                return Err(EngineError::invalid(format!(
                    "a delivery cannot revisit {}",
                    ctx.map.stop_name(to)
                )));
            }
            visited.push(to);
            let link = link_between(&links, from, to).ok_or_else(|| {
                EngineError::invalid(format!(
                    "no built link between {} and {}",
                    ctx.map.stop_name(from),
                    ctx.map.stop_name(to)
                ))
            })?;
            if !self.policy.can_traverse(link, player) {
                return Err(EngineError::invalid(format!(
                    "you cannot move goods over the link between {} and {}",
                    ctx.map.stop_name(from),
                    ctx.map.stop_name(to)
                )));
            }
        }

        let loco = keys::player(ctx.store, player)?.loco;
        if delivery.stops.len() > loco as usize {
            return Err(EngineError::invalid(format!(
                "a route of {} links needs a level-{} locomotive, yours is level {loco}",
                delivery.stops.len(),
                delivery.stops.len()
            )));
        }
        Ok(())
    }
}

/// Exhaustive route enumerator, advisory only. Seeds one candidate per
/// (city, distinct good) pair and extends depth-first along built links.
pub struct MoveSearcher {
    validator: Rc<MoveValidator>,
}

impl MoveSearcher {
    pub fn new(validator: Rc<MoveValidator>) -> Self {
        MoveSearcher { validator }
    }

    pub fn find_all_routes(&self, ctx: &GameContext, player: PlayerId) -> Result<Vec<Delivery>> {
        let links = ctx.store.get(keys::LINKS)?;
        let rows = ctx.store.get(keys::GOODS)?;
        let mut out = Vec::new();
        for row in &rows {
            let mut seen: SmallVec<[Good; 5]> = SmallVec::new();
            for good in &row.goods {
                if seen.contains(good) {
                    continue;
                }
                seen.push(*good);
                let seed = Delivery {
                    good: *good,
                    origin: row.coord,
                    stops: SmallVec::new(),
                };
                self.extend(ctx, player, &links, &seed, &mut out)?;
            }
        }
        Ok(out)
    }

    /// Try every built link out of the route's current end. A candidate that
    /// fails the partial check is dead along with all its extensions.
    fn extend(
        &self,
        ctx: &GameContext,
        player: PlayerId,
        links: &[Link],
        current: &Delivery,
        out: &mut Vec<Delivery>,
    ) -> Result<()> {
        let end = current.destination().unwrap_or(current.origin);
        for link in links {
            let Some(next) = link.other_end(end) else {
                continue;
            };
            let mut candidate = current.clone();
            candidate.stops.push(next);
            if self
                .validator
                .validate_partial(ctx, player, &candidate)
                .is_err()
            {
                continue;
            }
            if self.validator.validate(ctx, player, &candidate).is_ok() {
                out.push(candidate.clone());
            }
            self.extend(ctx, player, links, &candidate, out)?;
        }
        Ok(())
    }
}

/// One coin per traversed link to that link's owner. Neutral links pay
/// nobody.
pub fn calculate_income(links: &[Link], delivery: &Delivery) -> FxHashMap<PlayerId, u32> {
    let mut income = FxHashMap::default();
    for (from, to) in delivery.hops() {
        if let Some(link) = link_between(links, from, to) {
            if let Some(owner) = link.owner {
                *income.entry(owner).or_insert(0) += 1;
            }
        }
    }
    income
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BoardMap, City, CityGoods, PlayerState};
    use crate::engine::rules::StandardDeliveryPolicy;
    use crate::log::GameLog;
    use crate::random::RandomService;
    use crate::state::StateStore;

    const A: Coord = Coord { q: 0, r: 0 };
    const B: Coord = Coord { q: 1, r: 0 };
    const C: Coord = Coord { q: 2, r: 0 };
    const D: Coord = Coord { q: 1, r: 1 };

    fn line_map() -> BoardMap {
        BoardMap::new(
            vec![
                City::new("Avon", A, Good::Red),
                City::new("Bray", B, Good::Blue),
                City::new("Cole", C, Good::Yellow),
                City::new("Dunn", D, Good::Red),
            ],
            vec![(A, B), (B, C), (B, D), (A, D)],
            Vec::new(),
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
        /// Two players; player 0 has the given locomotive level. Cubes and
        /// links are seeded by each test.
        fn new(loco: u8, links: Vec<Link>, goods: Vec<(Coord, Vec<Good>)>) -> Self {
            let store = StateStore::new();
            let map = line_map();
            let mut players = vec![
                PlayerState::new(PlayerId::new(0)),
                PlayerState::new(PlayerId::new(1)),
            ];
            players[0].loco = loco;
            store.init(keys::PLAYERS, players).unwrap();
            store.init(keys::LINKS, links).unwrap();
            let rows: Vec<CityGoods> = map
                .cities()
                .iter()
                .map(|c| CityGoods {
                    coord: c.coord,
                    goods: goods
                        .iter()
                        .find(|(coord, _)| *coord == c.coord)
                        .map(|(_, g)| g.clone())
                        .unwrap_or_default(),
                })
                .collect();
            store.init(keys::GOODS, rows).unwrap();
            Fixture {
                store,
                log: GameLog::new(),
                random: RandomService::new(),
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

        fn validator(&self) -> MoveValidator {
            MoveValidator::new(Rc::new(StandardDeliveryPolicy))
        }
    }

    fn delivery(good: Good, origin: Coord, stops: &[Coord]) -> Delivery {
        Delivery {
            good,
            origin,
            stops: stops.iter().copied().collect(),
        }
    }

    fn owned(a: Coord, b: Coord, owner: u32) -> Link {
        Link::new(a, b, Some(PlayerId::new(owner)))
    }

    #[test]
    fn test_hops_pair_consecutive_stops() {
        let d = delivery(Good::Blue, A, &[B, C]);
        let hops: Vec<_> = d.hops().collect();
        assert_eq!(hops, vec![(A, B), (B, C)]);
    }

    #[test]
    fn test_validate_accepts_matching_destination() {
        let fx = Fixture::new(2, vec![owned(A, B, 0)], vec![(A, vec![Good::Blue])]);
        let v = fx.validator();
        v.validate(&fx.ctx(), PlayerId::new(0), &delivery(Good::Blue, A, &[B]))
            .unwrap();
    }

    #[test]
    fn test_validate_rejects_wrong_color_destination() {
        let fx = Fixture::new(2, vec![owned(A, B, 0)], vec![(A, vec![Good::Yellow])]);
        let v = fx.validator();
        let err = v
            .validate(&fx.ctx(), PlayerId::new(0), &delivery(Good::Yellow, A, &[B]))
            .unwrap_err();
        assert!(err.to_string().contains("does not accept"));
    }

    #[test]
    fn test_validate_rejects_missing_cube_and_link() {
        let fx = Fixture::new(2, vec![owned(A, B, 0)], vec![(A, vec![Good::Blue])]);
        let v = fx.validator();
        assert!(v
            .validate(&fx.ctx(), PlayerId::new(0), &delivery(Good::Red, A, &[B]))
            .is_err());
        assert!(v
            .validate(&fx.ctx(), PlayerId::new(0), &delivery(Good::Blue, A, &[D]))
            .is_err());
    }

    #[test]
    fn test_validate_enforces_loco_and_revisit() {
        let fx = Fixture::new(
            1,
            vec![owned(A, B, 0), owned(B, C, 0)],
            vec![(A, vec![Good::Yellow])],
        );
        let v = fx.validator();
        // Two links on a level-one locomotive.
        let err = v
            .validate(&fx.ctx(), PlayerId::new(0), &delivery(Good::Yellow, A, &[B, C]))
            .unwrap_err();
        assert!(err.to_string().contains("locomotive"));

        // Returning to the origin is a revisit.
        let fx = Fixture::new(
            3,
            vec![owned(A, B, 0), owned(B, D, 0), owned(A, D, 0)],
            vec![(A, vec![Good::Red])],
        );
        let err = fx
            .validator()
            .validate(&fx.ctx(), PlayerId::new(0), &delivery(Good::Red, A, &[B, D, A]))
            .unwrap_err();
        assert!(err.to_string().contains("revisit"));
    }

    #[test]
    fn test_validate_rejects_foreign_track() {
        let fx = Fixture::new(2, vec![owned(A, B, 1)], vec![(A, vec![Good::Blue])]);
        let err = fx
            .validator()
            .validate(&fx.ctx(), PlayerId::new(0), &delivery(Good::Blue, A, &[B]))
            .unwrap_err();
        assert!(err.to_string().contains("cannot move goods"));
    }

    #[test]
    fn test_neutral_track_is_open() {
        let fx = Fixture::new(
            2,
            vec![Link::new(A, B, None)],
            vec![(A, vec![Good::Blue])],
        );
        fx.validator()
            .validate(&fx.ctx(), PlayerId::new(0), &delivery(Good::Blue, A, &[B]))
            .unwrap();
    }

    #[test]
    fn test_income_splits_by_link_owner() {
        let links = vec![owned(A, B, 0), owned(B, C, 0), owned(B, D, 1)];
        let d = delivery(Good::Red, C, &[B, D]);
        let income = calculate_income(&links, &d);
        assert_eq!(income.get(&PlayerId::new(0)), Some(&1));
        assert_eq!(income.get(&PlayerId::new(1)), Some(&1));

        let d = delivery(Good::Yellow, A, &[B, C]);
        let income = calculate_income(&links, &d);
        assert_eq!(income.get(&PlayerId::new(0)), Some(&2));
        assert_eq!(income.get(&PlayerId::new(1)), None);

        // Three hops owned [0, 0, 1] pay {0: 2, 1: 1}.
        let d = delivery(Good::Red, D, &[B, C, A]);
        let links = vec![owned(D, B, 0), owned(B, C, 0), owned(C, A, 1)];
        let income = calculate_income(&links, &d);
        assert_eq!(income.get(&PlayerId::new(0)), Some(&2));
        assert_eq!(income.get(&PlayerId::new(1)), Some(&1));
    }

    #[test]
    fn test_search_is_sound() {
        let fx = Fixture::new(
            2,
            vec![owned(A, B, 0), owned(B, C, 0), owned(B, D, 1)],
            vec![(A, vec![Good::Blue, Good::Yellow]), (C, vec![Good::Red])],
        );
        let searcher = MoveSearcher::new(Rc::new(fx.validator()));
        let routes = searcher.find_all_routes(&fx.ctx(), PlayerId::new(0)).unwrap();
        assert!(!routes.is_empty());
        let v = fx.validator();
        for route in &routes {
            v.validate(&fx.ctx(), PlayerId::new(0), route).unwrap();
        }
    }

    #[test]
    fn test_search_is_complete_on_small_board() {
        // Player 0 owns A-B and B-C; a blue cube at A and a yellow cube at
        // A. Legal deliveries for a level-2 locomotive are exactly blue to
        // Bray and yellow through Bray to Cole.
        let fx = Fixture::new(
            2,
            vec![owned(A, B, 0), owned(B, C, 0)],
            vec![(A, vec![Good::Blue, Good::Yellow])],
        );
        let searcher = MoveSearcher::new(Rc::new(fx.validator()));
        let mut routes = searcher.find_all_routes(&fx.ctx(), PlayerId::new(0)).unwrap();
        routes.sort_by_key(|r| (r.good.as_str(), r.stops.len()));

        assert_eq!(
            routes,
            vec![
                delivery(Good::Blue, A, &[B]),
                delivery(Good::Yellow, A, &[B, C]),
            ]
        );
    }

    #[test]
    fn test_delivery_serde_matches_action_input() {
        let d = delivery(Good::Blue, A, &[B]);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "good": "Blue",
                "origin": {"q": 0, "r": 0},
                "stops": [{"q": 1, "r": 0}]
            })
        );
        let back: Delivery = serde_json::from_value(json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_search_distinct_goods_only() {
        // Two blue cubes at A yield one blue route, not two.
        let fx = Fixture::new(2, vec![owned(A, B, 0)], vec![(A, vec![Good::Blue, Good::Blue])]);
        let searcher = MoveSearcher::new(Rc::new(fx.validator()));
        let routes = searcher.find_all_routes(&fx.ctx(), PlayerId::new(0)).unwrap();
        assert_eq!(routes, vec![delivery(Good::Blue, A, &[B])]);
    }

    #[test]
    fn test_partial_route_valid_without_acceptance() {
        let fx = Fixture::new(2, vec![owned(A, B, 0)], vec![(A, vec![Good::Yellow])]);
        let v = fx.validator();
        let d = delivery(Good::Yellow, A, &[B]);
        // Bray is blue, so the full route fails but the prefix stands.
        assert!(v.validate(&fx.ctx(), PlayerId::new(0), &d).is_err());
        v.validate_partial(&fx.ctx(), PlayerId::new(0), &d).unwrap();

        let empty = delivery(Good::Yellow, A, &[]);
        assert!(v.validate(&fx.ctx(), PlayerId::new(0), &empty).is_err());
        v.validate_partial(&fx.ctx(), PlayerId::new(0), &empty).unwrap();
    }
}
