//! Tile grid storage and neighbor math
//!
//! Struct-of-arrays layout: one flat array per tile attribute, indexed by
//! `y * width + x`. The grid owns all tile data; other subsystems refer to
//! tiles by index only.

use std::collections::HashMap;
use std::collections::VecDeque;

use super::types::{Direction, RoadClass, TileKind};

/// The city's tile grid
pub struct TileGrid {
    width: usize,
    height: usize,

    pub kind: Vec<TileKind>,
    pub lanes: Vec<u8>,
    pub sidewalk: Vec<f32>,
    pub speed_limit: Vec<u8>,
    pub one_way: Vec<Option<Direction>>,
    /// Derived bitmask of road neighbors (N=1, E=2, S=4, W=8); never authoritative
    pub direction_mask: Vec<u8>,
    pub ped_only: Vec<bool>,
    pub scooter_restricted: Vec<bool>,
    pub noise_barrier: Vec<bool>,

    /// Back-reference into the road graph, -1 when the tile has no segment
    pub segment_id: Vec<i32>,
    pub road_class: Vec<RoadClass>,
    pub signal: Vec<bool>,
    pub crosswalk: Vec<bool>,
    pub signal_phase: Vec<f32>,

    /// Zone kind -> tile indices, rebuilt after generation or load
    zone_index: HashMap<TileKind, Vec<usize>>,
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        let len = width * height;
        Self {
            width,
            height,
            kind: vec![TileKind::Open; len],
            lanes: vec![0; len],
            sidewalk: vec![0.0; len],
            speed_limit: vec![0; len],
            one_way: vec![None; len],
            direction_mask: vec![0; len],
            ped_only: vec![false; len],
            scooter_restricted: vec![false; len],
            noise_barrier: vec![false; len],
            segment_id: vec![-1; len],
            road_class: vec![RoadClass::Local; len],
            signal: vec![false; len],
            crosswalk: vec![false; len],
            signal_phase: vec![0.0; len],
            zone_index: HashMap::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// World-space center of a tile (tile units)
    pub fn center(&self, index: usize) -> (f32, f32) {
        let (x, y) = self.coords(index);
        (x as f32 + 0.5, y as f32 + 0.5)
    }

    pub fn is_road(&self, index: usize) -> bool {
        self.kind[index] == TileKind::Road
    }

    /// Neighbor index in the given direction, if in bounds
    pub fn neighbor(&self, index: usize, dir: Direction) -> Option<usize> {
        let (x, y) = self.coords(index);
        let (dx, dy) = dir.delta();
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if nx < 0 || ny < 0 || nx >= self.width as i32 || ny >= self.height as i32 {
            return None;
        }
        Some(self.index(nx as usize, ny as usize))
    }

    /// All in-bounds 4-neighbors of a tile
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |dir| self.neighbor(index, dir))
    }

    /// Geometric direction from one tile to an adjacent tile
    pub fn direction_between(&self, from: usize, to: usize) -> Option<Direction> {
        let (fx, fy) = self.coords(from);
        let (tx, ty) = self.coords(to);
        let dx = tx as i32 - fx as i32;
        let dy = ty as i32 - fy as i32;
        Direction::ALL
            .into_iter()
            .find(|dir| dir.delta() == (dx, dy))
    }

    /// Number of 4-neighbors that are road tiles
    pub fn road_degree(&self, index: usize) -> usize {
        self.neighbors(index).filter(|&n| self.is_road(n)).count()
    }

    /// Set a tile's kind, zeroing road attributes on non-road tiles so the
    /// invariant `kind != Road => road attributes are defaults` always holds.
    pub fn set_kind(&mut self, index: usize, kind: TileKind) {
        self.kind[index] = kind;
        if kind != TileKind::Road {
            self.clear_road_attributes(index);
        }
    }

    pub fn clear_road_attributes(&mut self, index: usize) {
        self.lanes[index] = 0;
        self.sidewalk[index] = 0.0;
        self.speed_limit[index] = 0;
        self.one_way[index] = None;
        self.direction_mask[index] = 0;
        self.ped_only[index] = false;
        self.scooter_restricted[index] = false;
        self.noise_barrier[index] = false;
        self.segment_id[index] = -1;
        self.road_class[index] = RoadClass::Local;
        self.signal[index] = false;
        self.crosswalk[index] = false;
        self.signal_phase[index] = 0.0;
    }

    /// Recompute the derived road-adjacency bitmask for every tile
    pub fn rebuild_direction_masks(&mut self) {
        for index in 0..self.len() {
            if !self.is_road(index) {
                self.direction_mask[index] = 0;
                continue;
            }
            let mut mask = 0u8;
            for dir in Direction::ALL {
                if let Some(n) = self.neighbor(index, dir) {
                    if self.is_road(n) {
                        mask |= dir.bit();
                    }
                }
            }
            self.direction_mask[index] = mask;
        }
    }

    /// Rebuild the zone kind -> tile index lookup
    pub fn rebuild_zone_index(&mut self) {
        self.zone_index.clear();
        for kind in TileKind::ZONES {
            self.zone_index.insert(kind, Vec::new());
        }
        for index in 0..self.len() {
            let kind = self.kind[index];
            if kind.is_zone() {
                if let Some(list) = self.zone_index.get_mut(&kind) {
                    list.push(index);
                }
            }
        }
    }

    /// Tile indices of the given zone kind (empty if none generated)
    pub fn zone_tiles(&self, kind: TileKind) -> &[usize] {
        self.zone_index
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All road tile indices
    pub fn road_tiles(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.is_road(i)).collect()
    }

    /// Fraction of tiles that are road
    pub fn road_ratio(&self) -> f32 {
        if self.len() == 0 {
            return 0.0;
        }
        self.road_tiles().len() as f32 / self.len() as f32
    }

    /// Multi-source BFS distance (in tiles) from every tile to the nearest road
    pub fn distance_to_road(&self) -> Vec<u32> {
        let mut dist = vec![u32::MAX; self.len()];
        let mut queue = VecDeque::new();
        for index in 0..self.len() {
            if self.is_road(index) {
                dist[index] = 0;
                queue.push_back(index);
            }
        }
        while let Some(current) = queue.pop_front() {
            for next in self.neighbors(current) {
                if dist[next] == u32::MAX {
                    dist[next] = dist[current] + 1;
                    queue.push_back(next);
                }
            }
        }
        dist
    }
}
