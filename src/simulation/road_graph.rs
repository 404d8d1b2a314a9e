//! Road graph derivation
//!
//! Walks the tile grid to extract road segments (maximal degree-2 chains),
//! clusters segment endpoints into intersections, and derives signals,
//! crosswalks, and road classes. The intersection adjacency is kept in a
//! petgraph graph for connectivity queries. All of this is derived state:
//! it is discarded and rebuilt after generation, load, or structural edits.

use std::collections::HashMap;
use std::collections::HashSet;

use ordered_float::OrderedFloat;
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use rand::rngs::StdRng;
use rand::Rng;

use super::grid::TileGrid;
use super::types::{Direction, IntersectionId, RoadClass, SegmentId};

/// Endpoints within this distance (tile units) merge into one intersection
const INTERSECTION_MERGE_DISTANCE: f32 = 1.5;

/// Probability that a qualifying straight run becomes one-way at generation
const ONE_WAY_PROBABILITY: f64 = 0.45;

/// Minimum run length for one-way assignment
const ONE_WAY_MIN_RUN: usize = 3;

/// A maximal chain of road tiles between branch points
#[derive(Debug, Clone)]
pub struct RoadSegment {
    pub id: SegmentId,
    /// Member tile indices in chain order
    pub tiles: Vec<usize>,
    /// Polyline of member tile centers
    pub points: Vec<(f32, f32)>,
    pub lanes: u8,
    pub sidewalk: f32,
    pub speed_limit: u8,
    pub is_arterial: bool,
    pub has_signal: bool,
    pub has_crosswalk: bool,
    pub one_way: Option<Direction>,
}

impl RoadSegment {
    pub fn polyline_length(&self) -> f32 {
        self.points
            .windows(2)
            .map(|pair| {
                let dx = pair[1].0 - pair[0].0;
                let dy = pair[1].1 - pair[0].1;
                (dx * dx + dy * dy).sqrt()
            })
            .sum()
    }

    /// Point and unit tangent at arc-length fraction `t` of the polyline
    pub fn point_at(&self, t: f32) -> ((f32, f32), (f32, f32)) {
        if self.points.len() < 2 {
            let p = self.points.first().copied().unwrap_or((0.0, 0.0));
            return (p, (1.0, 0.0));
        }
        let total = self.polyline_length().max(1e-6);
        let mut remaining = t.clamp(0.0, 1.0) * total;
        for pair in self.points.windows(2) {
            let dx = pair[1].0 - pair[0].0;
            let dy = pair[1].1 - pair[0].1;
            let len = (dx * dx + dy * dy).sqrt().max(1e-6);
            if remaining <= len {
                let f = remaining / len;
                let point = (pair[0].0 + dx * f, pair[0].1 + dy * f);
                return (point, (dx / len, dy / len));
            }
            remaining -= len;
        }
        let last = self.points[self.points.len() - 1];
        let prev = self.points[self.points.len() - 2];
        let dx = last.0 - prev.0;
        let dy = last.1 - prev.1;
        let len = (dx * dx + dy * dy).sqrt().max(1e-6);
        (last, (dx / len, dy / len))
    }
}

/// A derived meeting point of two or more segments
#[derive(Debug, Clone)]
pub struct Intersection {
    pub id: IntersectionId,
    pub position: (f32, f32),
    pub segments: Vec<SegmentId>,
    /// Number of endpoint tiles merged into this cluster
    pub footprint: usize,
    pub has_signal: bool,
}

/// Derived road network: segments, intersections, and their adjacency
pub struct RoadGraph {
    pub segments: Vec<RoadSegment>,
    pub intersections: Vec<Intersection>,
    graph: UnGraph<IntersectionId, SegmentId>,
    nodes: Vec<NodeIndex>,
}

impl Default for RoadGraph {
    fn default() -> Self {
        Self::empty()
    }
}

impl RoadGraph {
    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
            intersections: Vec::new(),
            graph: UnGraph::new_undirected(),
            nodes: Vec::new(),
        }
    }

    pub fn segment(&self, id: SegmentId) -> Option<&RoadSegment> {
        self.segments.get(id.0)
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<&Intersection> {
        self.intersections.get(id.0)
    }

    /// Number of connected components of the intersection graph
    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }

    /// Intersections directly reachable from the given one
    pub fn neighboring_intersections(
        &self,
        id: IntersectionId,
    ) -> impl Iterator<Item = IntersectionId> + '_ {
        self.nodes
            .get(id.0)
            .into_iter()
            .flat_map(|&node| self.graph.neighbors(node))
            .map(|n| self.graph[n])
    }

    /// Derive the full road graph from the grid, writing segment ids, road
    /// classes, and signal/crosswalk fields back onto the tiles.
    pub fn build(grid: &mut TileGrid) -> Self {
        // Reset derived tile state.
        for index in 0..grid.len() {
            grid.segment_id[index] = -1;
            grid.signal[index] = false;
            grid.crosswalk[index] = false;
            grid.signal_phase[index] = 0.0;
            grid.road_class[index] = RoadClass::Local;
        }
        grid.rebuild_direction_masks();

        for index in 0..grid.len() {
            if grid.is_road(index) {
                grid.road_class[index] = if grid.lanes[index] >= 2 || grid.speed_limit[index] >= 40
                {
                    RoadClass::Arterial
                } else {
                    RoadClass::Local
                };
            }
        }

        let mut segments = extract_segments(grid);
        let mut intersections = cluster_intersections(grid, &segments);

        // Signals and crosswalks: an intersection signals when any connected
        // segment is arterial or at least three segments meet; segments
        // touching a 3+ junction carry a crosswalk.
        for intersection in &mut intersections {
            let any_arterial = intersection
                .segments
                .iter()
                .any(|&sid| segments[sid.0].is_arterial);
            intersection.has_signal = any_arterial || intersection.segments.len() >= 3;
            for &sid in &intersection.segments {
                if intersection.segments.len() >= 3 {
                    segments[sid.0].has_crosswalk = true;
                    if any_arterial {
                        segments[sid.0].has_signal = true;
                    }
                }
            }
        }

        // Write segment ids and signal fields back to tiles.
        for segment in &segments {
            for &tile in &segment.tiles {
                if grid.segment_id[tile] < 0 {
                    grid.segment_id[tile] = segment.id.0 as i32;
                }
            }
        }
        for intersection in &intersections {
            if !intersection.has_signal {
                continue;
            }
            let phase = (intersection.position.0 * 0.37 + intersection.position.1 * 0.59).fract();
            for index in 0..grid.len() {
                if !grid.is_road(index) {
                    continue;
                }
                let center = grid.center(index);
                let dx = center.0 - intersection.position.0;
                let dy = center.1 - intersection.position.1;
                if (dx * dx + dy * dy).sqrt() <= 1.1 {
                    grid.signal[index] = true;
                    grid.signal_phase[index] = phase;
                }
            }
        }
        for segment in &segments {
            if !segment.has_crosswalk {
                continue;
            }
            if let Some(&first) = segment.tiles.first() {
                grid.crosswalk[first] = true;
            }
            if let Some(&last) = segment.tiles.last() {
                grid.crosswalk[last] = true;
            }
        }

        // Intersection adjacency graph.
        let mut graph = UnGraph::new_undirected();
        let nodes: Vec<NodeIndex> = intersections
            .iter()
            .map(|intersection| graph.add_node(intersection.id))
            .collect();
        let mut endpoint_owner: HashMap<usize, IntersectionId> = HashMap::new();
        for intersection in &intersections {
            for &sid in &intersection.segments {
                let segment = &segments[sid.0];
                for &endpoint in [segment.tiles.first(), segment.tiles.last()]
                    .into_iter()
                    .flatten()
                {
                    let center = grid.center(endpoint);
                    let dx = center.0 - intersection.position.0;
                    let dy = center.1 - intersection.position.1;
                    if (dx * dx + dy * dy).sqrt() <= INTERSECTION_MERGE_DISTANCE {
                        endpoint_owner.insert(endpoint, intersection.id);
                    }
                }
            }
        }
        for segment in &segments {
            let first = segment.tiles.first().and_then(|t| endpoint_owner.get(t));
            let last = segment.tiles.last().and_then(|t| endpoint_owner.get(t));
            if let (Some(&a), Some(&b)) = (first, last) {
                graph.add_edge(nodes[a.0], nodes[b.0], segment.id);
            }
        }

        Self {
            segments,
            intersections,
            graph,
            nodes,
        }
    }

    /// Randomly convert straight road runs into one-way streets. Runs only at
    /// generation time; rebuilds after edits must preserve player-set state.
    pub fn assign_one_way_runs(grid: &mut TileGrid, rng: &mut StdRng) {
        // Horizontal runs: consecutive road tiles whose only road neighbors
        // lie along x.
        for y in 0..grid.height() {
            let mut run: Vec<usize> = Vec::new();
            for x in 0..grid.width() {
                let index = grid.index(x, y);
                if road_orientation(grid, index) == Some(false) {
                    run.push(index);
                } else {
                    commit_run(grid, rng, &run, false);
                    run.clear();
                }
            }
            commit_run(grid, rng, &run, false);
        }
        // Vertical runs.
        for x in 0..grid.width() {
            let mut run: Vec<usize> = Vec::new();
            for y in 0..grid.height() {
                let index = grid.index(x, y);
                if road_orientation(grid, index) == Some(true) {
                    run.push(index);
                } else {
                    commit_run(grid, rng, &run, true);
                    run.clear();
                }
            }
            commit_run(grid, rng, &run, true);
        }
    }
}

/// `Some(true)` for purely vertical road tiles, `Some(false)` for purely
/// horizontal ones, `None` for junctions, isolated tiles, and non-road.
fn road_orientation(grid: &TileGrid, index: usize) -> Option<bool> {
    if !grid.is_road(index) {
        return None;
    }
    let along_x = [Direction::East, Direction::West]
        .into_iter()
        .any(|d| grid.neighbor(index, d).is_some_and(|n| grid.is_road(n)));
    let along_y = [Direction::North, Direction::South]
        .into_iter()
        .any(|d| grid.neighbor(index, d).is_some_and(|n| grid.is_road(n)));
    match (along_x, along_y) {
        (true, false) => Some(false),
        (false, true) => Some(true),
        _ => None,
    }
}

fn commit_run(grid: &mut TileGrid, rng: &mut StdRng, run: &[usize], vertical: bool) {
    if run.len() < ONE_WAY_MIN_RUN || !rng.random_bool(ONE_WAY_PROBABILITY) {
        return;
    }
    let forward = rng.random_bool(0.5);
    let dir = match (vertical, forward) {
        (true, true) => Direction::South,
        (true, false) => Direction::North,
        (false, true) => Direction::East,
        (false, false) => Direction::West,
    };
    for &index in run {
        grid.one_way[index] = Some(dir);
    }
}

/// Walk maximal chains of degree-2 road tiles between branch points. Every
/// road tile ends up in exactly one segment; loops and isolated tiles are
/// handled explicitly.
fn extract_segments(grid: &TileGrid) -> Vec<RoadSegment> {
    let mut segments: Vec<RoadSegment> = Vec::new();
    let mut visited_edges: HashSet<(usize, usize)> = HashSet::new();
    let mut assigned = vec![false; grid.len()];

    let edge_key = |a: usize, b: usize| (a.min(b), a.max(b));

    let mut push_segment = |tiles: Vec<usize>, assigned: &mut Vec<bool>| {
        let id = SegmentId(segments.len());
        for &t in &tiles {
            assigned[t] = true;
        }
        let points: Vec<(f32, f32)> = tiles.iter().map(|&t| grid.center(t)).collect();
        let lanes = tiles.iter().map(|&t| grid.lanes[t]).max().unwrap_or(0);
        let sidewalk = if tiles.is_empty() {
            0.0
        } else {
            tiles.iter().map(|&t| grid.sidewalk[t]).sum::<f32>() / tiles.len() as f32
        };
        let speed_limit = tiles.iter().map(|&t| grid.speed_limit[t]).max().unwrap_or(0);
        let one_way = {
            let first = tiles.first().map(|&t| grid.one_way[t]);
            match first {
                Some(dir) if tiles.iter().all(|&t| grid.one_way[t] == dir) => dir,
                _ => None,
            }
        };
        segments.push(RoadSegment {
            id,
            tiles,
            points,
            lanes,
            sidewalk,
            speed_limit,
            is_arterial: lanes >= 2 || speed_limit >= 40,
            has_signal: false,
            has_crosswalk: false,
            one_way,
        });
    };

    let road_neighbors = |index: usize| -> Vec<usize> {
        grid.neighbors(index).filter(|&n| grid.is_road(n)).collect()
    };

    // Chains anchored at branch points and dead ends.
    for start in 0..grid.len() {
        if !grid.is_road(start) || grid.road_degree(start) == 2 {
            continue;
        }
        let neighbors = road_neighbors(start);
        if neighbors.is_empty() {
            push_segment(vec![start], &mut assigned);
            continue;
        }
        for first in neighbors {
            if visited_edges.contains(&edge_key(start, first)) {
                continue;
            }
            let mut tiles = vec![start];
            visited_edges.insert(edge_key(start, first));
            let mut prev = start;
            let mut current = first;
            loop {
                tiles.push(current);
                if grid.road_degree(current) != 2 || current == start {
                    break;
                }
                let next = road_neighbors(current).into_iter().find(|&n| n != prev);
                let Some(next) = next else {
                    break;
                };
                if visited_edges.contains(&edge_key(current, next)) {
                    break;
                }
                visited_edges.insert(edge_key(current, next));
                prev = current;
                current = next;
            }
            push_segment(tiles, &mut assigned);
        }
    }

    // Pure loops: every member has degree 2 and no anchor reached them.
    for start in 0..grid.len() {
        if !grid.is_road(start) || assigned[start] {
            continue;
        }
        let neighbors = road_neighbors(start);
        let Some(&first) = neighbors.first() else {
            push_segment(vec![start], &mut assigned);
            continue;
        };
        let mut tiles = vec![start];
        visited_edges.insert(edge_key(start, first));
        let mut prev = start;
        let mut current = first;
        while current != start {
            tiles.push(current);
            let next = road_neighbors(current).into_iter().find(|&n| n != prev);
            let Some(next) = next else {
                break;
            };
            visited_edges.insert(edge_key(current, next));
            prev = current;
            current = next;
        }
        push_segment(tiles, &mut assigned);
    }

    segments
}

/// Cluster segment endpoints into intersections. Only clusters where two or
/// more distinct segments meet survive.
fn cluster_intersections(grid: &TileGrid, segments: &[RoadSegment]) -> Vec<Intersection> {
    struct Cluster {
        position: (f32, f32),
        members: usize,
        segments: Vec<SegmentId>,
    }
    let mut clusters: Vec<Cluster> = Vec::new();

    for segment in segments {
        let mut endpoints: Vec<usize> = Vec::new();
        if let Some(&first) = segment.tiles.first() {
            endpoints.push(first);
        }
        if let Some(&last) = segment.tiles.last() {
            if Some(&last) != segment.tiles.first() {
                endpoints.push(last);
            }
        }
        for endpoint in endpoints {
            let center = grid.center(endpoint);
            let nearest = clusters
                .iter_mut()
                .min_by_key(|cluster| {
                    let dx = cluster.position.0 - center.0;
                    let dy = cluster.position.1 - center.1;
                    OrderedFloat(dx * dx + dy * dy)
                })
                .filter(|cluster| {
                    let dx = cluster.position.0 - center.0;
                    let dy = cluster.position.1 - center.1;
                    (dx * dx + dy * dy).sqrt() <= INTERSECTION_MERGE_DISTANCE
                });
            match nearest {
                Some(cluster) => {
                    // Running average of the merged endpoint positions.
                    let n = cluster.members as f32;
                    cluster.position = (
                        (cluster.position.0 * n + center.0) / (n + 1.0),
                        (cluster.position.1 * n + center.1) / (n + 1.0),
                    );
                    cluster.members += 1;
                    if !cluster.segments.contains(&segment.id) {
                        cluster.segments.push(segment.id);
                    }
                }
                None => clusters.push(Cluster {
                    position: center,
                    members: 1,
                    segments: vec![segment.id],
                }),
            }
        }
    }

    clusters
        .into_iter()
        .filter(|cluster| cluster.segments.len() >= 2)
        .enumerate()
        .map(|(i, cluster)| Intersection {
            id: IntersectionId(i),
            position: cluster.position,
            segments: cluster.segments,
            footprint: cluster.members,
            has_signal: false,
        })
        .collect()
}
