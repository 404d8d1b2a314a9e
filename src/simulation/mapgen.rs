//! Map generation strategies
//!
//! Two interchangeable strategies fill the tile grid: a tile-wise wave
//! function collapse over road/building prototypes, and a spline-based road
//! caster with a secondary WFC pass that zones the remaining buildings. Both
//! leave the grid fully populated with the zone index rebuilt.

use std::collections::HashSet;

use log::debug;
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::grid::TileGrid;
use super::types::{Direction, GenStrategy, RoadWidth, TileKind, ROAD_TARGET_RATIO, SPEED_OPTIONS};
use super::wfc::WfcSolver;

/// Bounded retries for the whole-map WFC pass
const MAX_WFC_ATTEMPTS: i32 = 4;

/// A tile prototype for the map-level WFC pass
struct TileProto {
    kind: TileKind,
    /// Road connection bitmask (N=1, E=2, S=4, W=8); 0 for buildings
    connections: u8,
    base_weight: f32,
}

/// Every road piece (all 15 non-empty connection masks) plus one prototype
/// per non-road kind.
fn tile_prototypes() -> Vec<TileProto> {
    let mut protos = Vec::new();
    for mask in 1u8..16 {
        let straight = mask == (Direction::North.bit() | Direction::South.bit())
            || mask == (Direction::East.bit() | Direction::West.bit());
        // Straights dominate, junctions stay rare, dead ends end chains.
        let base_weight = match mask.count_ones() {
            1 => 0.3,
            2 if straight => 0.9,
            2 => 0.25,
            3 => 0.1,
            _ => 0.08,
        };
        protos.push(TileProto {
            kind: TileKind::Road,
            connections: mask,
            base_weight,
        });
    }
    for kind in TileKind::BUILDABLE {
        protos.push(TileProto {
            kind,
            connections: 0,
            base_weight: base_zone_weight(kind),
        });
    }
    protos
}

fn base_zone_weight(kind: TileKind) -> f32 {
    match kind {
        TileKind::Open => 0.5,
        TileKind::Residential => 8.0,
        TileKind::Commercial => 1.0,
        TileKind::Industrial => 0.6,
        TileKind::Park => 0.25,
        TileKind::School => 0.06,
        TileKind::NightMarket => 0.18,
        TileKind::Temple => 0.06,
        TileKind::Mall => 0.06,
        TileKind::Road => 0.0,
    }
}

/// Symmetric adjacency rule: a prototype may sit next to another exactly when
/// their facing connection flags agree, so roads join matching roads and no
/// road stub dangles into a building.
fn connection_compat(protos: &[TileProto]) -> Vec<[u32; 4]> {
    let mut compat = vec![[0u32; 4]; protos.len()];
    for (i, a) in protos.iter().enumerate() {
        for (d, dir) in Direction::ALL.into_iter().enumerate() {
            let mut mask = 0u32;
            for (j, b) in protos.iter().enumerate() {
                let a_out = a.connections & dir.bit() != 0;
                let b_in = b.connections & dir.opposite().bit() != 0;
                if a_out == b_in {
                    mask |= 1 << j;
                }
            }
            compat[i][d] = mask;
        }
    }
    compat
}

/// Populate the grid using the requested strategy
pub fn generate(grid: &mut TileGrid, strategy: GenStrategy, rng: &mut StdRng) {
    // Wipe any previous map, including edit flags on former road tiles.
    for cell in 0..grid.len() {
        grid.set_kind(cell, TileKind::Open);
    }
    match strategy {
        GenStrategy::Wfc => generate_wfc(grid, rng),
        GenStrategy::Spline => generate_spline(grid, rng),
    }
    grid.rebuild_direction_masks();
    grid.rebuild_zone_index();
}

/// Sparse set of intended corridor rows/columns used to bias road placement
fn pick_corridors(extent: usize, step: std::ops::Range<usize>, rng: &mut StdRng) -> HashSet<usize> {
    let mut picks = HashSet::new();
    let mut at = rng.random_range(2..5.min(extent.max(3)));
    while at < extent.saturating_sub(2) {
        picks.insert(at);
        at += rng.random_range(step.clone()).max(3);
    }
    picks
}

fn generate_wfc(grid: &mut TileGrid, rng: &mut StdRng) {
    let protos = tile_prototypes();
    let compat = connection_compat(&protos);
    let width = grid.width();
    let height = grid.height();
    let len = grid.len();

    let corridor_rows = pick_corridors(height, 5..8, rng);
    let corridor_cols = pick_corridors(width, 5..8, rng);

    let mut assignment: Vec<usize> = Vec::new();
    for attempt in 0..MAX_WFC_ATTEMPTS {
        // Road prototypes get progressively less likely on each retry.
        let road_bias = 0.7f32.powi(attempt);

        let mut solver = WfcSolver::new(width, height, protos.len(), compat.clone());

        // Border cells may not connect off-grid.
        for cell in 0..len {
            let x = cell % width;
            let y = cell / width;
            let mut off = 0u8;
            if y == 0 {
                off |= Direction::North.bit();
            }
            if x == width - 1 {
                off |= Direction::East.bit();
            }
            if y == height - 1 {
                off |= Direction::South.bit();
            }
            if x == 0 {
                off |= Direction::West.bit();
            }
            if off == 0 {
                continue;
            }
            let mut mask = 0u32;
            for (i, proto) in protos.iter().enumerate() {
                if proto.connections & off == 0 {
                    mask |= 1 << i;
                }
            }
            solver.restrict(cell, mask);
        }

        let horizontal_bits = Direction::East.bit() | Direction::West.bit();
        let vertical_bits = Direction::North.bit() | Direction::South.bit();
        assignment = solver.solve(rng, |cell, p| {
            let proto = &protos[p];
            let mut weight = proto.base_weight;
            if proto.kind == TileKind::Road {
                weight *= road_bias;
                let x = cell % width;
                let y = cell / width;
                let on_row = corridor_rows.contains(&y);
                let on_col = corridor_cols.contains(&x);
                if on_row && proto.connections & horizontal_bits == horizontal_bits {
                    weight *= 2.2;
                }
                if on_col && proto.connections & vertical_bits == vertical_bits {
                    weight *= 2.2;
                }
                if !on_row && !on_col {
                    weight *= 0.5;
                }
                if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                    weight *= 0.2;
                }
            }
            weight
        });

        let roads = assignment
            .iter()
            .filter(|&&p| protos[p].kind == TileKind::Road)
            .count();
        let ratio = roads as f32 / len as f32;
        if ratio <= ROAD_TARGET_RATIO {
            break;
        }
        debug!(
            "wfc attempt {} produced road ratio {:.2}, retrying with lower bias",
            attempt + 1,
            ratio
        );
    }

    for cell in 0..len {
        let proto = &protos[assignment[cell]];
        grid.set_kind(cell, proto.kind);
        if proto.kind == TileKind::Road {
            grid.lanes[cell] = if rng.random_bool(0.3) { 2 } else { 1 };
            grid.sidewalk[cell] = if rng.random_bool(0.45) { 0.05 } else { 0.0 };
            grid.speed_limit[cell] = SPEED_OPTIONS.choose(rng).copied().unwrap_or(30);
        }
    }
}

/// A cast road polyline awaiting rasterization
struct RoadCast {
    points: Vec<(f32, f32)>,
    lanes: u8,
    sidewalk: f32,
    speed: u8,
}

fn step_speed_down(speed: u8) -> u8 {
    match speed {
        50 => 40,
        40 => 30,
        30 => 20,
        other => other,
    }
}

fn make_cast(points: Vec<(f32, f32)>, width: RoadWidth, rng: &mut StdRng) -> RoadCast {
    let lanes = width.lanes();
    let (mut speed, sidewalk) = match width {
        RoadWidth::Wide => (
            if rng.random_bool(0.5) { 50 } else { 40 },
            if rng.random_bool(0.5) { 0.08 } else { 0.0 },
        ),
        RoadWidth::Medium => (30, if rng.random_bool(0.4) { 0.12 } else { 0.05 }),
        RoadWidth::Narrow => (20, if rng.random_bool(0.6) { 0.16 } else { 0.08 }),
    };
    // Wide sidewalks narrow the carriageway.
    if sidewalk > 0.1 {
        speed = step_speed_down(speed);
    }
    RoadCast {
        points,
        lanes,
        sidewalk,
        speed,
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

fn segment_distance(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    let vx = b.0 - a.0;
    let vy = b.1 - a.1;
    let len_sq = vx * vx + vy * vy;
    if len_sq < 1e-6 {
        return distance(a, p);
    }
    let t = (((p.0 - a.0) * vx + (p.1 - a.1) * vy) / len_sq).clamp(0.0, 1.0);
    distance((a.0 + t * vx, a.1 + t * vy), p)
}

fn polyline_distance(points: &[(f32, f32)], p: (f32, f32)) -> f32 {
    match points.len() {
        0 => f32::INFINITY,
        1 => distance(points[0], p),
        _ => points
            .windows(2)
            .map(|pair| segment_distance(pair[0], pair[1], p))
            .fold(f32::INFINITY, f32::min),
    }
}

/// Arterial polylines with sinusoidal wobble plus scattered local connectors
fn cast_roads(grid: &TileGrid, rng: &mut StdRng) -> Vec<RoadCast> {
    let width = grid.width() as f32;
    let height = grid.height() as f32;
    let mut casts = Vec::new();

    for k in 0..3 {
        let base = height * (k as f32 + 1.0) / 4.0 + rng.random_range(-1.5..1.5);
        let phase = rng.random_range(0.0..std::f32::consts::TAU);
        let freq = rng.random_range(0.09..0.16);
        let mut points = Vec::new();
        let mut x = 0.0;
        while x <= width {
            let y = (base + 2.4 * (x * freq + phase).sin()).clamp(1.0, height - 1.0);
            points.push((x, y));
            x += 2.0;
        }
        casts.push(make_cast(points, RoadWidth::Wide, rng));
    }

    for k in 0..3 {
        let base = width * (k as f32 + 1.0) / 4.0 + rng.random_range(-1.5..1.5);
        let phase = rng.random_range(0.0..std::f32::consts::TAU);
        let freq = rng.random_range(0.09..0.16);
        let mut points = Vec::new();
        let mut y = 0.0;
        while y <= height {
            let x = (base + 2.4 * (y * freq + phase).sin()).clamp(1.0, width - 1.0);
            points.push((x, y));
            y += 2.0;
        }
        casts.push(make_cast(points, RoadWidth::Wide, rng));
    }

    // Local connectors on a coarse lattice with randomized width class.
    let mut gy = 3usize;
    while gy + 3 < grid.height() {
        let mut gx = 3usize;
        while gx + 3 < grid.width() {
            if rng.random_bool(0.55) {
                let x0 = gx as f32 + rng.random_range(-1.0..1.0);
                let y0 = gy as f32 + rng.random_range(-1.0..1.0);
                let span = rng.random_range(4.0..8.0);
                let (x1, y1) = if rng.random_bool(0.5) {
                    ((x0 + span).min(width - 1.0), y0)
                } else {
                    (x0, (y0 + span).min(height - 1.0))
                };
                let roll: f32 = rng.random_range(0.0..1.0);
                let class = if roll < 0.35 {
                    RoadWidth::Narrow
                } else if roll < 0.8 {
                    RoadWidth::Medium
                } else {
                    RoadWidth::Wide
                };
                casts.push(make_cast(vec![(x0, y0), (x1, y1)], class, rng));
            }
            gx += 7;
        }
        gy += 7;
    }

    casts
}

fn generate_spline(grid: &mut TileGrid, rng: &mut StdRng) {
    let casts = cast_roads(grid, rng);

    for cell in 0..grid.len() {
        let center = grid.center(cell);
        let nearest = casts
            .iter()
            .enumerate()
            .min_by_key(|(_, cast)| OrderedFloat(polyline_distance(&cast.points, center)));
        let Some((cast_index, cast)) = nearest else {
            grid.set_kind(cell, TileKind::Open);
            continue;
        };
        let dist = polyline_distance(&cast.points, center);
        let threshold = 0.35 + cast.lanes as f32 * 0.16 + cast.sidewalk * 2.0;
        if dist <= threshold {
            grid.set_kind(cell, TileKind::Road);
            grid.lanes[cell] = cast.lanes;
            grid.sidewalk[cell] = cast.sidewalk;
            grid.speed_limit[cell] = cast.speed;
            // Provisional owner; the road graph rebuild assigns final ids.
            grid.segment_id[cell] = cast_index as i32;
        } else {
            grid.set_kind(cell, TileKind::Open);
        }
    }

    zoning_pass(grid, rng);
}

/// Neighbor kinds each building type tolerates. The compatibility check
/// reads both directions, keeping the relation symmetric.
fn allowed_zone_neighbors(kind: TileKind) -> &'static [TileKind] {
    use TileKind::*;
    match kind {
        Open | Park | Road => &TileKind::BUILDABLE,
        Residential => &[Open, Residential, Commercial, Park, School, Temple],
        Commercial => &[
            Open,
            Residential,
            Commercial,
            Industrial,
            NightMarket,
            Mall,
            Park,
            School,
            Temple,
        ],
        Industrial => &[Open, Commercial, Industrial, Park],
        School => &[Open, Residential, Commercial, Park, School, Temple],
        NightMarket => &[Open, Commercial, NightMarket, Mall, Temple, Park],
        Temple => &[Open, Residential, Commercial, Park, School, Temple, NightMarket],
        Mall => &[Open, Commercial, Mall, NightMarket, Park],
    }
}

/// Whether two building kinds may share an edge
pub fn zoning_compatible(a: TileKind, b: TileKind) -> bool {
    allowed_zone_neighbors(a).contains(&b) && allowed_zone_neighbors(b).contains(&a)
}

fn zone_band_weight(kind: TileKind, dist: u32) -> f32 {
    match kind {
        TileKind::Commercial => {
            if dist <= 1 {
                2.2
            } else if dist >= 4 {
                0.4
            } else {
                1.0
            }
        }
        TileKind::NightMarket => {
            if dist <= 1 {
                2.0
            } else {
                0.5
            }
        }
        TileKind::Mall => {
            if dist <= 1 {
                1.8
            } else {
                0.4
            }
        }
        TileKind::Residential => {
            if (1..=2).contains(&dist) {
                2.0
            } else if dist >= 4 {
                0.6
            } else {
                1.0
            }
        }
        TileKind::Park => {
            if (1..=2).contains(&dist) {
                1.5
            } else if dist >= 4 {
                1.6
            } else {
                1.0
            }
        }
        TileKind::School => {
            if (1..=2).contains(&dist) {
                1.3
            } else {
                0.8
            }
        }
        TileKind::Industrial => {
            if dist >= 4 {
                2.0
            } else if dist <= 1 {
                0.5
            } else {
                1.0
            }
        }
        TileKind::Open => {
            if dist >= 4 {
                1.5
            } else {
                1.0
            }
        }
        TileKind::Temple => {
            if (1..=3).contains(&dist) {
                1.2
            } else {
                1.0
            }
        }
        TileKind::Road => 0.0,
    }
}

/// Zone every non-road tile with a WFC pass over the building compatibility
/// table, weighted by distance-to-road bands and arterial adjacency.
fn zoning_pass(grid: &mut TileGrid, rng: &mut StdRng) {
    let kinds = TileKind::BUILDABLE;
    let mut compat = vec![[0u32; 4]; kinds.len()];
    for (i, &a) in kinds.iter().enumerate() {
        let mut mask = 0u32;
        for (j, &b) in kinds.iter().enumerate() {
            if zoning_compatible(a, b) {
                mask |= 1 << j;
            }
        }
        compat[i] = [mask; 4];
    }

    let dist = grid.distance_to_road();
    let arterial_adjacent: Vec<bool> = (0..grid.len())
        .map(|cell| {
            grid.neighbors(cell)
                .any(|n| grid.is_road(n) && (grid.lanes[n] >= 2 || grid.speed_limit[n] >= 40))
        })
        .collect();

    let mut solver = WfcSolver::new(grid.width(), grid.height(), kinds.len(), compat);
    // Road cells take the Open prototype, which constrains nothing around it.
    let open_bit = 1u32;
    for cell in 0..grid.len() {
        if grid.is_road(cell) {
            solver.restrict(cell, open_bit);
        }
    }

    let assignment = solver.solve(rng, |cell, p| {
        let kind = kinds[p];
        let band = dist[cell].min(16);
        let mut weight = base_zone_weight(kind) * zone_band_weight(kind, band);
        if arterial_adjacent[cell] {
            match kind {
                TileKind::Commercial => weight *= 1.5,
                TileKind::Mall => weight *= 1.6,
                _ => {}
            }
        }
        weight
    });

    for cell in 0..grid.len() {
        if !grid.is_road(cell) {
            grid.set_kind(cell, kinds[assignment[cell]]);
        }
    }
}
