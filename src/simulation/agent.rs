//! Agent movement logic
//!
//! Each agent follows an A* tile path toward its destination. Movement is
//! either a continuous traversal of a road-segment polyline (with a lane or
//! curb offset off the centerline) or a discrete lane-offset tile hop; only
//! the offset for the active mode is computed. Vehicles are gated by traffic
//! signals; pedestrians ignore them.

use super::grid::TileGrid;
use super::road_graph::RoadGraph;
use super::types::{AgentClass, AgentId, Direction, SegmentId, SIGNAL_CYCLE_SECS};

/// Phase window around the signal flip during which a marked crosswalk
/// blocks all vehicle movement
const ALL_STOP_WINDOW: (f64, f64) = (0.45, 0.65);

/// Result of one agent update step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentUpdateResult {
    /// Agent advanced (or held position mid-hop)
    Moved,
    /// Agent is held by a signal this tick
    Blocked,
    /// Agent finished (or has no usable) path and wants a new destination
    NeedsReroute,
}

/// Continuous traversal state along a road segment polyline
#[derive(Debug, Clone)]
pub struct SplineBinding {
    pub segment: SegmentId,
    /// Arc-length fraction along the polyline, 0..=1
    pub progress: f32,
    /// +1 along polyline order, -1 against it
    pub direction: f32,
    /// Path index where the binding started
    pub entry_index: usize,
    /// Path index of the segment's far end
    pub exit_index: usize,
}

/// A mobile agent in the simulation
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub class: AgentClass,
    /// Tile path from A*, always non-empty
    pub path: Vec<usize>,
    pub path_index: usize,
    /// Fraction of the current hop, 0..1 (discrete mode)
    pub progress: f32,
    /// Continuous world position in tile units
    pub position: (f32, f32),
    pub destination: usize,
    /// Stable curb side: +1 or -1
    pub lane_bias: f32,
    pub spline: Option<SplineBinding>,
    /// Set when the last re-route failed; retried every tick
    pub idle: bool,
}

/// Whether a vehicle may leave a signalled tile in the given direction.
/// Phase below one half grants north-south movement, above grants east-west;
/// a short window around the flip holds everyone while a marked crosswalk
/// clears. Pedestrians are never gated.
pub fn signal_allows_move(
    grid: &TileGrid,
    tile: usize,
    dir: Direction,
    class: AgentClass,
    time: f64,
) -> bool {
    if class == AgentClass::Pedestrian {
        return true;
    }
    if !grid.signal[tile] {
        return true;
    }
    let phase = (time / SIGNAL_CYCLE_SECS + grid.signal_phase[tile] as f64).fract();
    if grid.crosswalk[tile] && phase >= ALL_STOP_WINDOW.0 && phase < ALL_STOP_WINDOW.1 {
        return false;
    }
    if phase < 0.5 {
        dir.is_north_south()
    } else {
        !dir.is_north_south()
    }
}

/// Movement speed in tiles per second on the given tile. Wider sidewalks
/// speed pedestrians up and throttle vehicles (narrowed lanes).
pub fn speed_for(class: AgentClass, grid: &TileGrid, tile: usize) -> f32 {
    let sidewalk = grid.sidewalk[tile];
    match class {
        AgentClass::Pedestrian => class.base_speed() * (1.0 + sidewalk * 2.5),
        _ => {
            let limit = grid.speed_limit[tile].max(20) as f32;
            class.base_speed() * (limit / 40.0) * (1.0 - (sidewalk * 1.6).min(0.5))
        }
    }
}

impl Agent {
    pub fn new(id: AgentId, class: AgentClass, start: usize, lane_bias: f32, grid: &TileGrid) -> Self {
        Self {
            id,
            class,
            path: vec![start],
            path_index: 0,
            progress: 0.0,
            position: grid.center(start),
            destination: start,
            lane_bias,
            spline: None,
            idle: false,
        }
    }

    pub fn current_tile(&self) -> usize {
        self.path[self.path_index.min(self.path.len() - 1)]
    }

    /// Install a fresh route. The first path tile is the agent's location.
    pub fn assign_path(&mut self, path: Vec<usize>, destination: usize, grid: &TileGrid) {
        debug_assert!(!path.is_empty());
        self.position = grid.center(path[0]);
        self.path = path;
        self.path_index = 0;
        self.progress = 0.0;
        self.destination = destination;
        self.idle = false;
        self.spline = None;
    }

    pub fn set_idle(&mut self) {
        self.idle = true;
        self.spline = None;
        self.progress = 0.0;
        self.path_index = self.path_index.min(self.path.len() - 1);
    }

    /// Lateral displacement off the road centerline for this agent on the
    /// given tile. Pedestrians hug the curb on their stable side, scooters
    /// ride closer in, vehicles keep lane separation only on two-lane roads.
    fn lane_offset(&self, grid: &TileGrid, tile: usize) -> f32 {
        match self.class {
            AgentClass::Pedestrian => (0.32 + grid.sidewalk[tile] * 0.5) * self.lane_bias,
            AgentClass::Scooter => 0.22 * self.lane_bias,
            AgentClass::Car | AgentClass::Truck => {
                if grid.lanes[tile] >= 2 {
                    0.12
                } else {
                    0.0
                }
            }
        }
    }

    /// Try to enter continuous mode: the remaining path must run the whole
    /// segment from one endpoint to the other.
    pub fn spline_candidate(&self, grid: &TileGrid, graph: &RoadGraph) -> Option<SplineBinding> {
        let tile = self.current_tile();
        let raw = grid.segment_id.get(tile).copied().unwrap_or(-1);
        if raw < 0 {
            return None;
        }
        let segment = graph.segment(SegmentId(raw as usize))?;
        let n = segment.tiles.len();
        if n < 3 {
            return None;
        }
        let remaining = &self.path[self.path_index..];
        if remaining.len() < n {
            return None;
        }
        if segment.tiles.first() == Some(&tile) && remaining[..n] == segment.tiles[..] {
            return Some(SplineBinding {
                segment: segment.id,
                progress: 0.0,
                direction: 1.0,
                entry_index: self.path_index,
                exit_index: self.path_index + n - 1,
            });
        }
        if segment.tiles.last() == Some(&tile)
            && remaining[..n].iter().eq(segment.tiles.iter().rev())
        {
            return Some(SplineBinding {
                segment: segment.id,
                progress: 1.0,
                direction: -1.0,
                entry_index: self.path_index,
                exit_index: self.path_index + n - 1,
            });
        }
        None
    }

    /// Advance one simulation step
    pub fn update(
        &mut self,
        dt: f32,
        grid: &TileGrid,
        graph: &RoadGraph,
        time: f64,
    ) -> AgentUpdateResult {
        if self.idle || self.path.len() < 2 || self.path_index + 1 >= self.path.len() {
            return AgentUpdateResult::NeedsReroute;
        }
        let current = self.path[self.path_index];
        let next = self.path[self.path_index + 1];
        if let Some(dir) = grid.direction_between(current, next) {
            if !signal_allows_move(grid, current, dir, self.class, time) {
                return AgentUpdateResult::Blocked;
            }
        }
        let speed = speed_for(self.class, grid, current);
        if self.spline.is_some() {
            self.update_spline(dt, speed, grid, graph)
        } else {
            self.update_discrete(dt, speed, grid, graph)
        }
    }

    fn update_spline(
        &mut self,
        dt: f32,
        speed: f32,
        grid: &TileGrid,
        graph: &RoadGraph,
    ) -> AgentUpdateResult {
        let Some(mut binding) = self.spline.take() else {
            return AgentUpdateResult::Moved;
        };
        let Some(segment) = graph.segment(binding.segment) else {
            // Graph was rebuilt under us; fall back to discrete hops.
            return AgentUpdateResult::Moved;
        };
        let length = segment.polyline_length().max(0.1);
        binding.progress += speed * dt * binding.direction / length;

        if !(0.0..=1.0).contains(&binding.progress) {
            // Ran off the segment end: clamp, land on the exit tile, and let
            // the next step re-bind from the new position.
            binding.progress = binding.progress.clamp(0.0, 1.0);
            let exit = binding.exit_index.min(self.path.len() - 1);
            self.path_index = exit;
            self.progress = 0.0;
            self.position = grid.center(self.path[exit]);
            if exit + 1 >= self.path.len() {
                return AgentUpdateResult::NeedsReroute;
            }
            if let Some(rebound) = self.spline_candidate(grid, graph) {
                self.spline = Some(rebound);
            }
            return AgentUpdateResult::Moved;
        }

        // Keep path_index tracking the tile under the agent.
        let through = if binding.direction > 0.0 {
            binding.progress
        } else {
            1.0 - binding.progress
        };
        let span = binding.exit_index - binding.entry_index;
        let step = ((through * span as f32) as usize).min(span.saturating_sub(1));
        self.path_index = binding.entry_index + step;

        let (point, tangent) = segment.point_at(binding.progress);
        let tangent = if binding.direction < 0.0 {
            (-tangent.0, -tangent.1)
        } else {
            tangent
        };
        let normal = (-tangent.1, tangent.0);
        let offset = self.lane_offset(grid, self.path[self.path_index]);
        self.position = (point.0 + normal.0 * offset, point.1 + normal.1 * offset);
        self.spline = Some(binding);
        AgentUpdateResult::Moved
    }

    fn update_discrete(
        &mut self,
        dt: f32,
        speed: f32,
        grid: &TileGrid,
        graph: &RoadGraph,
    ) -> AgentUpdateResult {
        self.progress += speed * dt;
        while self.progress >= 1.0 {
            self.progress -= 1.0;
            self.path_index += 1;
            if self.path_index + 1 >= self.path.len() {
                self.path_index = self.path.len() - 1;
                self.progress = 0.0;
                self.position = grid.center(self.path[self.path_index]);
                return AgentUpdateResult::NeedsReroute;
            }
            if let Some(binding) = self.spline_candidate(grid, graph) {
                self.spline = Some(binding);
                self.progress = 0.0;
                return AgentUpdateResult::Moved;
            }
        }
        let from = self.path[self.path_index];
        let to = self.path[self.path_index + 1];
        self.position = self.hop_position(grid, from, to, self.progress);
        AgentUpdateResult::Moved
    }

    /// Interpolated position between the lane-offset endpoints of a hop
    fn hop_position(&self, grid: &TileGrid, from: usize, to: usize, t: f32) -> (f32, f32) {
        let a = grid.center(from);
        let b = grid.center(to);
        let dx = b.0 - a.0;
        let dy = b.1 - a.1;
        let len = (dx * dx + dy * dy).sqrt().max(1e-6);
        let normal = (-dy / len, dx / len);
        let offset = self.lane_offset(grid, from);
        (
            a.0 + dx * t + normal.0 * offset,
            a.1 + dy * t + normal.1 * offset,
        )
    }
}
