//! Benchmarks for exhaustive route enumeration.
//!
//! The searcher is the only piece of the kernel with combinatorial cost, so
//! it gets the benchmark. A ring board with spokes gives routes that branch
//! and rejoin, which is the worst case for the no-revisit pruning.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::rc::Rc;
use steamrail::core::{BoardMap, City, CityGoods, Coord, Good, Link, PlayerId, PlayerState};
use steamrail::engine::keys;
use steamrail::engine::rules::StandardDeliveryPolicy;
use steamrail::engine::{GameContext, MoveSearcher, MoveValidator};
use steamrail::log::GameLog;
use steamrail::random::RandomService;
use steamrail::state::StateStore;

/// A ring of `n` cities with every ring link built, plus chords every third
/// city, all owned by player 0.
fn ring_fixture(n: u32, loco: u8) -> (BoardMap, StateStore) {
    let coords: Vec<Coord> = (0..n).map(|i| Coord { q: i as i32, r: 0 }).collect();
    let cities: Vec<City> = coords
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let color = Good::ALL[i % Good::ALL.len()];
            City::new(format!("Stop {i}"), *c, color)
        })
        .collect();

    let mut connections = Vec::new();
    let mut links = Vec::new();
    let owner = Some(PlayerId::new(0));
    for i in 0..n as usize {
        let next = (i + 1) % n as usize;
        connections.push((coords[i], coords[next]));
        links.push(Link::new(coords[i], coords[next], owner));
        if i % 3 == 0 {
            let across = (i + n as usize / 2) % n as usize;
            connections.push((coords[i], coords[across]));
            links.push(Link::new(coords[i], coords[across], owner));
        }
    }

    let store = StateStore::new();
    let mut player = PlayerState::new(PlayerId::new(0));
    player.loco = loco;
    store.init(keys::PLAYERS, vec![player]).unwrap();
    store.init(keys::LINKS, links).unwrap();
    let rows: Vec<CityGoods> = coords
        .iter()
        .enumerate()
        .map(|(i, c)| CityGoods {
            coord: *c,
            goods: vec![Good::ALL[(i + 1) % Good::ALL.len()]],
        })
        .collect();
    store.init(keys::GOODS, rows).unwrap();

    let map = BoardMap::new(cities, connections, Vec::new(), 0);
    (map, store)
}

fn bench_route_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_search");
    let log = GameLog::new();
    let random = RandomService::new();

    for (cities, loco) in [(8u32, 3u8), (12, 4), (16, 6)] {
        let (map, store) = ring_fixture(cities, loco);
        let searcher = MoveSearcher::new(Rc::new(MoveValidator::new(Rc::new(
            StandardDeliveryPolicy,
        ))));
        group.bench_with_input(
            BenchmarkId::new("find_all_routes", format!("{cities}c_loco{loco}")),
            &(map, store),
            |b, (map, store)| {
                let ctx = GameContext {
                    store,
                    log: &log,
                    random: &random,
                    map,
                };
                b.iter(|| {
                    let routes = searcher.find_all_routes(&ctx, PlayerId::new(0)).unwrap();
                    black_box(routes)
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_route_search);
criterion_main!(benches);
