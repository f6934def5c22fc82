//! Variant modules: a board plus rule overrides
//!
//! A variant contributes its starting board and, optionally, replacement
//! bindings for any extension point. The kernel installs its standard
//! bindings first; `install` runs after and may override any subset.

use crate::core::{BoardMap, City, Coord, Good};
use crate::overrides::OverrideResolver;
use crate::Result;
use std::ops::RangeInclusive;
use std::rc::Rc;

pub trait Variant {
    /// Stable registry key, used by callers to select the variant.
    fn key(&self) -> &'static str;

    /// The static starting board. Built fresh per engine; the board never
    /// mutates during play.
    fn board(&self) -> BoardMap;

    fn player_range(&self) -> RangeInclusive<usize>;

    /// Override extension-point bindings. The default variant changes
    /// nothing.
    fn install(&self, _resolver: &mut OverrideResolver) -> Result<()> {
        Ok(())
    }
}

/// The variants the stock engine ships with.
pub fn standard_variants() -> Vec<Rc<dyn Variant>> {
    vec![Rc::new(Heartland) as Rc<dyn Variant>]
}

/// A small demonstration map over the American midwest. Standard rules
/// throughout; it exists to exercise the kernel, not to balance a game.
pub struct Heartland;

const CHICAGO: Coord = Coord { q: 0, r: 0 };
const PITTSBURGH: Coord = Coord { q: 1, r: 0 };
const NEW_YORK: Coord = Coord { q: 2, r: 0 };
const ST_LOUIS: Coord = Coord { q: 0, r: 1 };
const LOUISVILLE: Coord = Coord { q: 1, r: 1 };
const ATLANTA: Coord = Coord { q: 2, r: 1 };

impl Variant for Heartland {
    fn key(&self) -> &'static str {
        "heartland"
    }

    fn board(&self) -> BoardMap {
        let cities = vec![
            City::new("Chicago", CHICAGO, Good::Red),
            City::new("Pittsburgh", PITTSBURGH, Good::Blue),
            City::new("New York", NEW_YORK, Good::Yellow),
            City::new("St. Louis", ST_LOUIS, Good::Purple),
            City::new("Louisville", LOUISVILLE, Good::Black),
            City::new("Atlanta", ATLANTA, Good::Red),
        ];
        let connections = vec![
            (CHICAGO, PITTSBURGH),
            (PITTSBURGH, NEW_YORK),
            (ST_LOUIS, LOUISVILLE),
            (LOUISVILLE, ATLANTA),
            (CHICAGO, ST_LOUIS),
            (PITTSBURGH, LOUISVILLE),
            (NEW_YORK, ATLANTA),
            (PITTSBURGH, ST_LOUIS),
            (NEW_YORK, LOUISVILLE),
        ];
        let mut bag = Vec::with_capacity(Good::ALL.len() * 8);
        for good in Good::ALL {
            bag.extend(std::iter::repeat(good).take(8));
        }
        BoardMap::new(cities, connections, bag, 2)
    }

    fn player_range(&self) -> RangeInclusive<usize> {
        3..=6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartland_board_is_consistent() {
        let board = Heartland.board();
        assert_eq!(board.cities().len(), 6);
        for (a, b) in board.connections() {
            assert!(board.city_at(*a).is_some());
            assert!(board.city_at(*b).is_some());
        }
        // 2 starting cubes per city leave 28 in the bag after setup; the
        // full bag holds 8 of each color.
        assert_eq!(board.bag().len(), 40);
        assert_eq!(board.starting_cubes(), 2);
    }
}
