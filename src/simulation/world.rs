//! The city core that ties everything together
//!
//! `CityCore` owns the grid, the derived road graph, the agents, the metric
//! arrays, the policy catalog, and the scalar city state. External
//! collaborators (rendering, UI, persistence) read this state between ticks
//! and mutate it only through the edit and policy operations here.

use anyhow::{bail, Result};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use super::agent::{Agent, AgentUpdateResult};
use super::city_state::{
    CityState, COST_SIDEWALK_SUBSIDIZED, COST_TILE_EDIT, DISCONTENT_ENACT, DISCONTENT_REPEAL,
    DISCONTENT_SCOOTER_EDIT, PP_TILE_EDIT,
};
use super::grid::TileGrid;
use super::mapgen;
use super::model::{self, TileMetrics};
use super::policy::{default_policies, policy_active, Policy, PolicyId};
use super::road_graph::RoadGraph;
use super::router;
use super::snapshot::CitySnapshot;
use super::types::{
    AgentClass, AgentId, Direction, GenStrategy, TileKind, DEFAULT_AGENT_COUNT, GRID_HEIGHT,
    GRID_WIDTH, SPEED_OPTIONS,
};

/// Agent class mix applied cyclically at spawn
const AGENT_MIX: [AgentClass; 10] = [
    AgentClass::Pedestrian,
    AgentClass::Pedestrian,
    AgentClass::Pedestrian,
    AgentClass::Pedestrian,
    AgentClass::Scooter,
    AgentClass::Scooter,
    AgentClass::Car,
    AgentClass::Car,
    AgentClass::Car,
    AgentClass::Truck,
];

/// Attempts per re-route before an agent goes idle for the tick
const REROUTE_ATTEMPTS: usize = 4;

/// The aggregate simulation state
pub struct CityCore {
    pub grid: TileGrid,
    pub road_graph: RoadGraph,
    pub agents: Vec<Agent>,
    pub metrics: TileMetrics,
    pub policies: Vec<Policy>,
    pub state: CityState,
    rng: StdRng,
    graph_dirty: bool,
    agent_target: usize,
    next_agent_id: usize,
}

impl Default for CityCore {
    fn default() -> Self {
        Self::new()
    }
}

impl CityCore {
    pub fn new() -> Self {
        Self::with_seed(rand::rng().random())
    }

    /// Create a core with a seeded RNG for reproducible simulations
    pub fn with_seed(seed: u64) -> Self {
        Self::with_grid_size(GRID_WIDTH, GRID_HEIGHT, seed)
    }

    /// Create a core over a custom grid size (small grids are handy in tests)
    pub fn with_grid_size(width: usize, height: usize, seed: u64) -> Self {
        Self {
            grid: TileGrid::new(width, height),
            road_graph: RoadGraph::empty(),
            agents: Vec::new(),
            metrics: TileMetrics::new(width * height),
            policies: default_policies(),
            state: CityState::new(),
            rng: StdRng::seed_from_u64(seed),
            graph_dirty: false,
            agent_target: DEFAULT_AGENT_COUNT,
            next_agent_id: 0,
        }
    }

    /// Number of agents spawned on the next generate/restore
    pub fn set_agent_target(&mut self, count: usize) {
        self.agent_target = count;
    }

    /// Reset the core and build a fresh city
    pub fn generate(&mut self, strategy: GenStrategy, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.state = CityState::new();
        self.policies = default_policies();
        mapgen::generate(&mut self.grid, strategy, &mut self.rng);
        RoadGraph::assign_one_way_runs(&mut self.grid, &mut self.rng);
        self.road_graph = RoadGraph::build(&mut self.grid);
        self.graph_dirty = false;
        self.metrics.reset(self.grid.len());
        self.spawn_agents();
        info!(
            "generated {:?} map: {} road tiles, {} segments, {} intersections, {} agents",
            strategy,
            self.grid.road_tiles().len(),
            self.road_graph.segments.len(),
            self.road_graph.intersections.len(),
            self.agents.len()
        );
    }

    fn spawn_agents(&mut self) {
        self.agents.clear();
        self.next_agent_id = 0;
        let roads = self.grid.road_tiles();
        if roads.is_empty() {
            return;
        }
        for i in 0..self.agent_target {
            let class = AGENT_MIX[i % AGENT_MIX.len()];
            let Some(&start) = roads.choose(&mut self.rng) else {
                break;
            };
            let lane_bias = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
            let id = AgentId(self.next_agent_id);
            self.next_agent_id += 1;
            self.agents.push(Agent::new(id, class, start, lane_bias, &self.grid));
        }
    }

    /// Advance the simulation by one fixed step. A non-positive `dt` and a
    /// terminal city are both no-ops.
    pub fn tick(&mut self, dt: f64) {
        if dt <= 0.0 || self.state.is_terminal() {
            return;
        }
        if self.graph_dirty {
            debug!("rebuilding road graph after structural edit");
            self.road_graph = RoadGraph::build(&mut self.grid);
            self.graph_dirty = false;
        }
        self.state.time += dt;
        self.state.election_timer -= dt;
        model::evaluate_tick(
            &self.grid,
            &mut self.metrics,
            &self.agents,
            &self.policies,
            &mut self.state,
            &mut self.rng,
            dt,
        );
        self.state.check_win_lose();
        self.update_agents(dt);
    }

    fn update_agents(&mut self, dt: f64) {
        let time = self.state.time;
        let mut reroute = Vec::new();
        for (i, agent) in self.agents.iter_mut().enumerate() {
            let result = agent.update(dt as f32, &self.grid, &self.road_graph, time);
            if result == AgentUpdateResult::NeedsReroute {
                reroute.push(i);
            }
        }
        for i in reroute {
            Self::reroute_agent(
                &mut self.agents[i],
                &self.grid,
                &self.road_graph,
                &mut self.rng,
            );
        }
    }

    /// Pick a fresh random destination of a compatible zone kind and route to
    /// it. Leaves the agent idle when every attempt fails; idle agents retry
    /// on the next tick.
    fn reroute_agent(agent: &mut Agent, grid: &TileGrid, graph: &RoadGraph, rng: &mut StdRng) {
        let start = agent.current_tile();
        for _ in 0..REROUTE_ATTEMPTS {
            let Some(&kind) = agent.class.destination_kinds().choose(rng) else {
                break;
            };
            let Some(&dest) = grid.zone_tiles(kind).choose(rng) else {
                continue;
            };
            let Some(dest_road) = router::find_nearest_road(grid, agent.class, dest) else {
                continue;
            };
            if let Some(path) = router::find_path(grid, agent.class, start, dest_road) {
                agent.assign_path(path, dest, grid);
                if let Some(binding) = agent.spline_candidate(grid, graph) {
                    agent.spline = Some(binding);
                }
                return;
            }
        }
        agent.set_idle();
    }

    /// Cycle a road tile's one-way state: two-way -> N -> E -> S -> W -> two-way
    pub fn toggle_one_way(&mut self, index: usize) -> bool {
        if !self.grid.is_road(index) || !self.state.spend(COST_TILE_EDIT, PP_TILE_EDIT) {
            return false;
        }
        self.grid.one_way[index] = match self.grid.one_way[index] {
            None => Some(Direction::North),
            Some(Direction::North) => Some(Direction::East),
            Some(Direction::East) => Some(Direction::South),
            Some(Direction::South) => Some(Direction::West),
            Some(Direction::West) => None,
        };
        self.graph_dirty = true;
        true
    }

    /// Step a road tile's speed limit through the legal options
    pub fn cycle_speed_limit(&mut self, index: usize) -> bool {
        if !self.grid.is_road(index) || !self.state.spend(COST_TILE_EDIT, PP_TILE_EDIT) {
            return false;
        }
        let current = self.grid.speed_limit[index];
        let at = SPEED_OPTIONS.iter().position(|&s| s == current).unwrap_or(0);
        self.grid.speed_limit[index] = SPEED_OPTIONS[(at + 1) % SPEED_OPTIONS.len()];
        true
    }

    /// Widen a road tile's sidewalk, subsidized under the expansion program
    pub fn add_sidewalk(&mut self, index: usize) -> bool {
        if !self.grid.is_road(index) {
            return false;
        }
        let cost = if policy_active(&self.policies, PolicyId::SidewalkProgram) {
            COST_SIDEWALK_SUBSIDIZED
        } else {
            COST_TILE_EDIT
        };
        if !self.state.spend(cost, PP_TILE_EDIT) {
            return false;
        }
        self.grid.sidewalk[index] = (self.grid.sidewalk[index] + 0.08).min(0.28);
        true
    }

    pub fn toggle_ped_only(&mut self, index: usize) -> bool {
        if !self.grid.is_road(index) || !self.state.spend(COST_TILE_EDIT, PP_TILE_EDIT) {
            return false;
        }
        self.grid.ped_only[index] = !self.grid.ped_only[index];
        self.graph_dirty = true;
        true
    }

    pub fn toggle_scooter_restriction(&mut self, index: usize) -> bool {
        if !self.grid.is_road(index) || !self.state.spend(COST_TILE_EDIT, PP_TILE_EDIT) {
            return false;
        }
        self.grid.scooter_restricted[index] = !self.grid.scooter_restricted[index];
        self.state.recent_discontent += DISCONTENT_SCOOTER_EDIT;
        true
    }

    pub fn toggle_noise_barrier(&mut self, index: usize) -> bool {
        if !self.grid.is_road(index) || !self.state.spend(COST_TILE_EDIT, PP_TILE_EDIT) {
            return false;
        }
        self.grid.noise_barrier[index] = !self.grid.noise_barrier[index];
        true
    }

    /// Enact a policy, gated by cash and political points
    pub fn enact_policy(&mut self, id: PolicyId) -> bool {
        let Some(at) = self.policies.iter().position(|p| p.id == id) else {
            return false;
        };
        if self.policies[at].active {
            return false;
        }
        let (cash, pp) = (self.policies[at].cash_cost, self.policies[at].pp_cost);
        if !self.state.spend(cash, pp) {
            return false;
        }
        self.policies[at].active = true;
        self.state.recent_discontent += DISCONTENT_ENACT;
        info!("enacted policy {:?}", id);
        true
    }

    /// Repeal an active policy. Free, but voters notice the churn.
    pub fn repeal_policy(&mut self, id: PolicyId) -> bool {
        let Some(at) = self.policies.iter().position(|p| p.id == id) else {
            return false;
        };
        if !self.policies[at].active {
            return false;
        }
        self.policies[at].active = false;
        self.state.recent_discontent += DISCONTENT_REPEAL;
        info!("repealed policy {:?}", id);
        true
    }

    /// Capture the authoritative state as a flat snapshot
    pub fn snapshot(&self) -> CitySnapshot {
        CitySnapshot {
            width: self.grid.width(),
            height: self.grid.height(),
            kind: self.grid.kind.clone(),
            lanes: self.grid.lanes.clone(),
            sidewalk: self.grid.sidewalk.clone(),
            speed_limit: self.grid.speed_limit.clone(),
            one_way: self.grid.one_way.clone(),
            ped_only: self.grid.ped_only.clone(),
            scooter_restricted: self.grid.scooter_restricted.clone(),
            noise_barrier: self.grid.noise_barrier.clone(),
            policies: self.policies.iter().map(|p| (p.id, p.active)).collect(),
            state: self.state.clone(),
        }
    }

    /// Restore a snapshot, rebuilding every piece of derived state
    pub fn restore(&mut self, snapshot: &CitySnapshot) -> Result<()> {
        if !snapshot.is_consistent() {
            bail!("snapshot tile arrays do not match its dimensions");
        }
        if snapshot.width != self.grid.width() || snapshot.height != self.grid.height() {
            self.grid = TileGrid::new(snapshot.width, snapshot.height);
        }
        self.grid.kind = snapshot.kind.clone();
        self.grid.lanes = snapshot.lanes.clone();
        self.grid.sidewalk = snapshot.sidewalk.clone();
        self.grid.speed_limit = snapshot.speed_limit.clone();
        self.grid.one_way = snapshot.one_way.clone();
        self.grid.ped_only = snapshot.ped_only.clone();
        self.grid.scooter_restricted = snapshot.scooter_restricted.clone();
        self.grid.noise_barrier = snapshot.noise_barrier.clone();
        for index in 0..self.grid.len() {
            if !self.grid.is_road(index) {
                self.grid.clear_road_attributes(index);
            }
        }
        for policy in self.policies.iter_mut() {
            policy.active = false;
        }
        for (id, active) in &snapshot.policies {
            if let Some(policy) = self.policies.iter_mut().find(|p| p.id == *id) {
                policy.active = *active;
            }
        }
        self.state = snapshot.state.clone();
        self.grid.rebuild_zone_index();
        self.road_graph = RoadGraph::build(&mut self.grid);
        self.graph_dirty = false;
        self.metrics.reset(self.grid.len());
        self.spawn_agents();
        Ok(())
    }

    /// Print a one-screen status report
    pub fn print_summary(&self) {
        let idle = self.agents.iter().filter(|a| a.idle).count();
        let status = if self.state.won {
            "WON"
        } else if self.state.lost {
            "LOST"
        } else {
            "running"
        };
        println!("=== City Summary ===");
        println!(
            "Time: {:.1}s  Population: {:.0}  Happiness: {:.1}  Approval: {:.1}",
            self.state.time, self.state.population, self.state.happiness, self.state.approval
        );
        println!(
            "Cash: ${:.0}  Debt: ${:.0}  Interest: {:.1}%  Balance: {:+.0}/min",
            self.state.cash,
            self.state.debt,
            self.state.interest_rate * 100.0,
            self.state.monthly_balance
        );
        println!(
            "Political points: {:.0}  Next election: {:.0}s  Elections survived: {}  [{}]",
            self.state.political_points, self.state.election_timer, self.state.election_count, status
        );
        println!(
            "Roads: {} tiles in {} segments, {} intersections, {} network components",
            self.grid.road_tiles().len(),
            self.road_graph.segments.len(),
            self.road_graph.intersections.len(),
            self.road_graph.component_count()
        );
        println!("Agents: {} ({} idle)", self.agents.len(), idle);
    }

    /// Draw the city as ASCII, agents overlaid on top of tiles
    pub fn draw_map(&self) {
        let width = self.grid.width();
        let height = self.grid.height();
        let mut rows = vec![vec![' '; width]; height];
        for y in 0..height {
            for x in 0..width {
                let index = self.grid.index(x, y);
                rows[y][x] = match self.grid.kind[index] {
                    TileKind::Road => {
                        if self.grid.signal[index] {
                            '+'
                        } else {
                            '#'
                        }
                    }
                    TileKind::Open => '.',
                    TileKind::Residential => 'r',
                    TileKind::Commercial => 'c',
                    TileKind::Industrial => 'i',
                    TileKind::Park => 'p',
                    TileKind::School => 's',
                    TileKind::NightMarket => 'n',
                    TileKind::Temple => 't',
                    TileKind::Mall => 'm',
                };
            }
        }
        for agent in &self.agents {
            let x = (agent.position.0 as usize).min(width.saturating_sub(1));
            let y = (agent.position.1 as usize).min(height.saturating_sub(1));
            rows[y][x] = '@';
        }
        println!("=== City Map ===");
        println!("Legend: #=road +=signal @=agent r/c/i/p/s/n/t/m=zones .=open");
        for row in rows {
            println!("{}", row.into_iter().collect::<String>());
        }
    }
}
