//! Board graph: cities, buildable connections, built track
//!
//! A [`BoardMap`] is the static per-variant starting board: which cities
//! exist, which connections may be built, and the goods-bag composition.
//! Built track ([`Link`]) and the cubes sitting on cities ([`CityGoods`])
//! are mutable game data and live in the state store.

use crate::core::{Coord, Good, PlayerId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A stop on the map. The color decides which goods the city accepts under
/// the standard delivery policy.
#[derive(Debug, Clone)]
pub struct City {
    pub name: String,
    pub coord: Coord,
    pub color: Good,
}

impl City {
    pub fn new(name: impl Into<String>, coord: Coord, color: Good) -> Self {
        City {
            name: name.into(),
            coord,
            color,
        }
    }
}

/// A built track segment between two stops. Endpoints are stored normalized
/// (smaller coordinate first) so a link has one identity regardless of
/// traversal direction. `owner` is absent for neutral track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub from: Coord,
    pub to: Coord,
    pub owner: Option<PlayerId>,
}

impl Link {
    pub fn new(a: Coord, b: Coord, owner: Option<PlayerId>) -> Self {
        let (from, to) = normalize_pair(a, b);
        Link { from, to, owner }
    }

    pub fn connects(&self, a: Coord, b: Coord) -> bool {
        let (x, y) = normalize_pair(a, b);
        self.from == x && self.to == y
    }

    /// The endpoint opposite `from`, if `from` is an endpoint at all.
    pub fn other_end(&self, end: Coord) -> Option<Coord> {
        if end == self.from {
            Some(self.to)
        } else if end == self.to {
            Some(self.from)
        } else {
            None
        }
    }
}

/// Cubes currently sitting on one city. Rows are kept in board city order so
/// snapshots serialize deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityGoods {
    pub coord: Coord,
    pub goods: Vec<Good>,
}

/// Static starting board for one variant.
#[derive(Debug, Clone)]
pub struct BoardMap {
    cities: Vec<City>,
    by_coord: FxHashMap<Coord, usize>,
    connections: Vec<(Coord, Coord)>,
    bag: Vec<Good>,
    starting_cubes: u8,
}

impl BoardMap {
    pub fn new(
        cities: Vec<City>,
        connections: Vec<(Coord, Coord)>,
        bag: Vec<Good>,
        starting_cubes: u8,
    ) -> Self {
        let by_coord = cities
            .iter()
            .enumerate()
            .map(|(idx, city)| (city.coord, idx))
            .collect();
        let connections = connections
            .into_iter()
            .map(|(a, b)| normalize_pair(a, b))
            .collect();
        BoardMap {
            cities,
            by_coord,
            connections,
            bag,
            starting_cubes,
        }
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn city_at(&self, coord: Coord) -> Option<&City> {
        self.by_coord.get(&coord).map(|idx| &self.cities[*idx])
    }

    /// Display name for a stop, falling back to the raw coordinate.
    pub fn stop_name(&self, coord: Coord) -> String {
        match self.city_at(coord) {
            Some(city) => city.name.clone(),
            None => coord.to_string(),
        }
    }

    pub fn connection_allowed(&self, a: Coord, b: Coord) -> bool {
        let pair = normalize_pair(a, b);
        self.connections.iter().any(|c| *c == pair)
    }

    pub fn connections(&self) -> &[(Coord, Coord)] {
        &self.connections
    }

    /// Goods-bag composition for game setup.
    pub fn bag(&self) -> &[Good] {
        &self.bag
    }

    /// Cubes seeded onto each city at game start.
    pub fn starting_cubes(&self) -> u8 {
        self.starting_cubes
    }
}

/// Normalize an unordered coordinate pair to a canonical order.
pub fn normalize_pair(a: Coord, b: Coord) -> (Coord, Coord) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Find the built link joining two stops, if any.
pub fn link_between(links: &[Link], a: Coord, b: Coord) -> Option<&Link> {
    links.iter().find(|l| l.connects(a, b))
}
