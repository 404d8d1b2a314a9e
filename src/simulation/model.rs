//! Per-tick city evaluation
//!
//! Simulates population trips over the road network, derives congestion,
//! noise, pedestrian comfort, income, and tile happiness, then folds the
//! totals into the treasury and the mayor's standing. All time-dependent
//! terms scale with `dt`; callers guarantee `dt > 0`.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::agent::Agent;
use super::city_state::{CityState, MIN_POPULATION};
use super::grid::TileGrid;
use super::policy::{policy_active, Policy, PolicyEffects, PolicyId};
use super::router;
use super::types::{AgentClass, TileKind};

/// Traffic added to every tile of a successful trip path
const TRAFFIC_PER_TRIP: f32 = 0.01;
/// Traffic added under each moving vehicle agent
const AGENT_TRAFFIC: f32 = 0.01;
/// Floor on simulated trips per tick
const MIN_TRIPS: usize = 20;

/// Per-tile derived metric arrays, persisted across ticks
pub struct TileMetrics {
    pub traffic: Vec<f32>,
    pub noise: Vec<f32>,
    pub pedestrian: Vec<f32>,
    pub income: Vec<f32>,
    pub happiness: Vec<f32>,
}

impl TileMetrics {
    pub fn new(len: usize) -> Self {
        Self {
            traffic: vec![0.0; len],
            noise: vec![0.0; len],
            pedestrian: vec![0.0; len],
            income: vec![0.0; len],
            happiness: vec![0.0; len],
        }
    }

    pub fn reset(&mut self, len: usize) {
        *self = Self::new(len);
    }
}

fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

fn base_income(kind: TileKind) -> f32 {
    match kind {
        TileKind::Commercial => 0.9,
        TileKind::Mall => 0.85,
        TileKind::NightMarket => 0.8,
        TileKind::Industrial => 0.6,
        TileKind::Temple => 0.3,
        TileKind::Road => 0.0,
        _ => 0.2,
    }
}

/// Simulate independent origin->destination trips between residential and
/// commercial/industrial zones, accumulating traffic on every path tile.
/// Failed trips are silently dropped.
fn run_trips(grid: &TileGrid, metrics: &mut TileMetrics, rng: &mut StdRng, count: usize) {
    for t in metrics.traffic.iter_mut() {
        *t = 0.0;
    }
    let residential = grid.zone_tiles(TileKind::Residential);
    if residential.is_empty() {
        return;
    }
    for _ in 0..count {
        let Some(&origin) = residential.choose(rng) else {
            continue;
        };
        let dest_kind = if rng.random_bool(0.4) {
            TileKind::Commercial
        } else {
            TileKind::Industrial
        };
        let Some(&dest) = grid.zone_tiles(dest_kind).choose(rng) else {
            continue;
        };
        let Some(origin_road) = router::find_nearest_road(grid, AgentClass::Car, origin) else {
            continue;
        };
        let Some(dest_road) = router::find_nearest_road(grid, AgentClass::Car, dest) else {
            continue;
        };
        let Some(path) = router::find_path(grid, AgentClass::Car, origin_road, dest_road) else {
            continue;
        };
        for step in path {
            metrics.traffic[step] += TRAFFIC_PER_TRIP;
        }
    }
}

/// One full evaluation pass: policies, trips, tile metrics, finances, and
/// the mayor's standing.
pub fn evaluate_tick(
    grid: &TileGrid,
    metrics: &mut TileMetrics,
    agents: &[Agent],
    policies: &[Policy],
    state: &mut CityState,
    rng: &mut StdRng,
    dt: f64,
) {
    let effects = PolicyEffects::from_policies(policies);
    // Riders stay annoyed for as long as the crackdown runs.
    if policy_active(policies, PolicyId::ScooterCrackdown) {
        state.recent_discontent += 0.02 * dt;
    }

    let trip_count = ((state.population / 1200.0).floor()
        * effects.traffic_factor
        * effects.transit_factor) as usize;
    run_trips(grid, metrics, rng, trip_count.max(MIN_TRIPS));

    for agent in agents.iter().filter(|a| a.class.is_vehicle() && !a.idle) {
        metrics.traffic[agent.current_tile()] += AGENT_TRAFFIC;
    }

    let mut total_noise = 0.0f64;
    let mut total_ped = 0.0f64;
    let mut total_congestion = 0.0f64;
    let mut total_income = 0.0f64;
    let mut happy_total = 0.0f64;
    let mut road_count = 0usize;

    for i in 0..grid.len() {
        if !grid.is_road(i) {
            continue;
        }
        let speed = grid.speed_limit[i].min(effects.speed_cap) as f32;
        let capacity = (grid.lanes[i] as f32).max(0.2)
            * (speed / 30.0)
            * if grid.ped_only[i] { 0.1 } else { 1.0 };
        let congestion = (metrics.traffic[i] / capacity.max(1e-3)).min(1.0);
        let scooter_penalty = if grid.scooter_restricted[i] { 0.1 } else { 0.0 };
        let barrier = if grid.noise_barrier[i] { 0.7 } else { 1.0 };
        metrics.noise[i] = (congestion * 0.7 + speed / 100.0) * effects.noise_factor * barrier;
        metrics.pedestrian[i] = 0.3 + grid.sidewalk[i] * 2.0 + effects.sidewalk_bonus
            - congestion * 0.4
            - scooter_penalty
            + if grid.ped_only[i] { 0.4 } else { 0.0 };
        metrics.income[i] = 0.0;
        metrics.happiness[i] =
            clamp01(0.5 + metrics.pedestrian[i] * 0.3 - metrics.noise[i] * 0.3);
        total_noise += metrics.noise[i] as f64;
        total_ped += metrics.pedestrian[i] as f64;
        total_congestion += congestion as f64;
        road_count += 1;
    }

    for i in 0..grid.len() {
        if grid.is_road(i) {
            continue;
        }
        let mut neighbor_noise = 0.0f32;
        let mut neighbor_count = 0usize;
        for n in grid.neighbors(i) {
            if grid.is_road(n) {
                neighbor_noise += metrics.noise[n];
                neighbor_count += 1;
            }
        }
        let propagated = if neighbor_count > 0 {
            neighbor_noise / neighbor_count as f32
        } else {
            0.05
        };
        metrics.noise[i] = propagated * 0.6 + metrics.noise[i] * 0.2;
        metrics.pedestrian[i] = (metrics.pedestrian[i] * 0.9 + 0.3).max(0.2);
        metrics.income[i] = base_income(grid.kind[i])
            * (1.0 + effects.income_bonus)
            * clamp01(1.0 - metrics.noise[i] * 0.3 + metrics.pedestrian[i] * 0.3);
        metrics.happiness[i] =
            clamp01(0.45 + metrics.pedestrian[i] * 0.4 - metrics.noise[i] * 0.35);
        total_income += metrics.income[i] as f64;
        happy_total += metrics.happiness[i] as f64;
    }

    let road_divisor = road_count.max(1) as f64;
    let avg_noise = total_noise / road_divisor;
    let avg_ped = total_ped / road_divisor;
    let avg_congestion = total_congestion / road_divisor;

    // Treasury: tax on aggregate income minus upkeep and debt service. The
    // balance is a per-minute rate; cash integrates it over dt.
    let economy = total_income * 1200.0;
    let tax_revenue = economy * state.tax_rate;
    let maintenance = 6_000.0 + road_count as f64 * 8.0;
    let policy_upkeep = policies.iter().filter(|p| p.active).count() as f64 * 900.0;
    let interest_payment = state.debt * state.interest_rate / 60.0;
    state.monthly_balance = tax_revenue - maintenance - policy_upkeep - interest_payment;
    state.cash += state.monthly_balance * dt;
    if state.cash < 0.0 {
        state.debt += state.monthly_balance.abs() * dt * 0.5;
    }
    state.debt = (state.debt - state.cash.max(0.0) * 0.02 * dt).max(0.0);
    state.interest_rate = (0.04 + state.debt / 800_000.0).clamp(0.04, 0.12);

    let happiness_base = 60.0 + avg_ped * 20.0 - avg_noise * 25.0 - avg_congestion * 20.0
        - state.tax_rate * 35.0;
    let happy_bonus = (happy_total / grid.len().max(1) as f64).clamp(0.0, 1.0) * 8.0;
    state.happiness =
        (happiness_base + happy_bonus - state.recent_discontent).clamp(0.0, 100.0);
    state.approval = (state.happiness
        + if state.monthly_balance > 0.0 { 5.0 } else { -5.0 }
        - state.debt / 100_000.0)
        .clamp(0.0, 100.0);

    if state.happiness > 60.0 {
        state.population += (state.happiness - 60.0) * 0.6 * dt;
    } else if state.happiness < 45.0 {
        state.population -= (45.0 - state.happiness) * 0.5 * dt;
    }
    state.population = state.population.max(MIN_POPULATION);

    state.political_points +=
        dt * (0.4 + state.happiness / 100.0 + state.population / 100_000.0);
    state.recent_discontent = (state.recent_discontent - dt * 0.2).max(0.0);
}
