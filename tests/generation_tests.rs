//! Map generation validation tests
//!
//! Both strategies must leave the grid in a consistent state: zeroed road
//! attributes on non-road tiles, a usable zone index, derived direction
//! masks that never point into buildings, and a rebuilt road graph.

use city_sim::simulation::{
    zoning_compatible, CityCore, Direction, GenStrategy, TileKind, ROAD_TARGET_RATIO,
};

fn generated_core(strategy: GenStrategy, seed: u64) -> CityCore {
    let mut core = CityCore::with_seed(seed);
    core.generate(strategy, seed);
    core
}

#[test]
fn test_non_road_tiles_carry_zeroed_attributes() {
    for strategy in [GenStrategy::Wfc, GenStrategy::Spline] {
        let core = generated_core(strategy, 11);
        let grid = &core.grid;
        for i in 0..grid.len() {
            if grid.kind[i] == TileKind::Road {
                continue;
            }
            assert_eq!(grid.lanes[i], 0, "{:?}: non-road tile {} has lanes", strategy, i);
            assert_eq!(grid.sidewalk[i], 0.0, "{:?}: non-road tile {} has sidewalk", strategy, i);
            assert_eq!(grid.speed_limit[i], 0, "{:?}: non-road tile {} has speed", strategy, i);
            assert_eq!(grid.one_way[i], None, "{:?}: non-road tile {} is one-way", strategy, i);
            assert_eq!(grid.segment_id[i], -1, "{:?}: non-road tile {} has segment", strategy, i);
        }
    }
}

#[test]
fn test_road_tiles_carry_legal_attributes() {
    for strategy in [GenStrategy::Wfc, GenStrategy::Spline] {
        let core = generated_core(strategy, 12);
        let grid = &core.grid;
        for i in 0..grid.len() {
            if grid.kind[i] != TileKind::Road {
                continue;
            }
            assert!((1..=2).contains(&grid.lanes[i]), "{:?}: bad lane count", strategy);
            assert!(
                [20, 30, 40, 50].contains(&grid.speed_limit[i]),
                "{:?}: illegal speed {}",
                strategy,
                grid.speed_limit[i]
            );
            assert!(
                (0.0..=0.28).contains(&grid.sidewalk[i]),
                "{:?}: sidewalk out of range",
                strategy
            );
        }
    }
}

#[test]
fn test_wfc_road_ratio_stays_near_target() {
    // The retry budget is bounded and the last attempt is kept regardless,
    // so allow headroom above the configured target.
    let core = generated_core(GenStrategy::Wfc, 21);
    let ratio = core.grid.road_ratio();
    assert!(
        ratio <= ROAD_TARGET_RATIO + 0.16,
        "road ratio {ratio:.2} far above target"
    );
    assert!(ratio > 0.02, "WFC map generated almost no roads ({ratio:.3})");
}

#[test]
fn test_direction_masks_never_point_into_buildings() {
    for strategy in [GenStrategy::Wfc, GenStrategy::Spline] {
        let core = generated_core(strategy, 13);
        let grid = &core.grid;
        for i in 0..grid.len() {
            if grid.kind[i] != TileKind::Road {
                assert_eq!(grid.direction_mask[i], 0);
                continue;
            }
            for dir in Direction::ALL {
                if grid.direction_mask[i] & dir.bit() == 0 {
                    continue;
                }
                let neighbor = grid
                    .neighbor(i, dir)
                    .expect("mask bit must point at an in-bounds tile");
                assert_eq!(
                    grid.kind[neighbor],
                    TileKind::Road,
                    "{:?}: dangling road stub at tile {}",
                    strategy,
                    i
                );
            }
        }
    }
}

#[test]
fn test_zone_index_matches_grid() {
    for strategy in [GenStrategy::Wfc, GenStrategy::Spline] {
        let core = generated_core(strategy, 14);
        let grid = &core.grid;
        for kind in TileKind::ZONES {
            let indexed = grid.zone_tiles(kind);
            for &i in indexed {
                assert_eq!(grid.kind[i], kind, "{:?}: stale zone index entry", strategy);
            }
            let actual = (0..grid.len()).filter(|&i| grid.kind[i] == kind).count();
            assert_eq!(indexed.len(), actual, "{:?}: zone index missing tiles", strategy);
        }
    }
}

#[test]
fn test_every_road_tile_belongs_to_exactly_one_segment() {
    for strategy in [GenStrategy::Wfc, GenStrategy::Spline] {
        let core = generated_core(strategy, 15);
        let grid = &core.grid;
        for i in 0..grid.len() {
            if grid.kind[i] == TileKind::Road {
                let seg = grid.segment_id[i];
                assert!(seg >= 0, "{:?}: road tile {} has no segment", strategy, i);
                let segment = &core.road_graph.segments[seg as usize];
                assert!(
                    segment.tiles.contains(&i),
                    "{:?}: tile {} back-reference points at a segment that does not contain it",
                    strategy,
                    i
                );
            }
        }
    }
}

#[test]
fn test_spline_generation_builds_a_road_network() {
    let core = generated_core(GenStrategy::Spline, 16);
    assert!(!core.road_graph.segments.is_empty(), "no segments derived");
    assert!(
        !core.road_graph.intersections.is_empty(),
        "arterial grid should produce intersections"
    );
    let ratio = core.grid.road_ratio();
    assert!(ratio > 0.05, "spline map generated almost no roads");
    assert!(
        !core.grid.zone_tiles(TileKind::Residential).is_empty(),
        "zoning pass placed no residential tiles"
    );
    assert!(
        !core.grid.zone_tiles(TileKind::Commercial).is_empty(),
        "zoning pass placed no commercial tiles"
    );
}

#[test]
fn test_zoning_compatibility_table_is_symmetric() {
    for a in TileKind::BUILDABLE {
        for b in TileKind::BUILDABLE {
            assert_eq!(
                zoning_compatible(a, b),
                zoning_compatible(b, a),
                "asymmetry between {:?} and {:?}",
                a,
                b
            );
        }
    }
}

#[test]
fn test_industrial_zoning_tolerances() {
    assert!(zoning_compatible(TileKind::Industrial, TileKind::Open));
    assert!(zoning_compatible(TileKind::Industrial, TileKind::Commercial));
    assert!(zoning_compatible(TileKind::Industrial, TileKind::Industrial));
    assert!(!zoning_compatible(TileKind::Industrial, TileKind::Residential));
    assert!(!zoning_compatible(TileKind::Industrial, TileKind::School));
}

#[test]
fn test_generation_is_reproducible() {
    for strategy in [GenStrategy::Wfc, GenStrategy::Spline] {
        let first = generated_core(strategy, 42);
        let second = generated_core(strategy, 42);
        assert_eq!(
            first.grid.kind, second.grid.kind,
            "{:?}: same seed must produce the same map",
            strategy
        );
        assert_eq!(first.grid.one_way, second.grid.one_way);
    }
}

#[test]
fn test_one_way_runs_are_uniform() {
    // Any one-way assignment from generation covers a straight run of at
    // least three tiles sharing the same direction.
    let core = generated_core(GenStrategy::Spline, 17);
    let grid = &core.grid;
    for i in 0..grid.len() {
        let Some(dir) = grid.one_way[i] else {
            continue;
        };
        let along = if dir.is_north_south() {
            [Direction::North, Direction::South]
        } else {
            [Direction::East, Direction::West]
        };
        let mut run = 1;
        for step in along {
            let mut at = i;
            while let Some(n) = grid.neighbor(at, step) {
                if grid.one_way[n] == Some(dir) {
                    run += 1;
                    at = n;
                } else {
                    break;
                }
            }
        }
        assert!(run >= 3, "one-way run at tile {i} shorter than minimum");
    }
}
