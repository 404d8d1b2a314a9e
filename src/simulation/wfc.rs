//! Constraint-propagation solver shared by the map generators
//!
//! Possibility sets are `u32` bitmasks over a prototype table (at most 32
//! prototypes). Collapse picks the minimum-entropy cell, propagation runs an
//! explicit worklist of cell indices with a visited guard. Contradictions are
//! recovered locally by resetting the emptied cell to the full set; the solver
//! never fails.

use log::debug;
use rand::rngs::StdRng;
use rand::Rng;

use super::types::Direction;

/// A generic WFC solver over a rectangular grid of prototype domains
pub struct WfcSolver {
    width: usize,
    height: usize,
    proto_count: usize,
    /// compat[p][d] = bitmask of prototypes allowed adjacent to p in direction d
    compat: Vec<[u32; 4]>,
    domains: Vec<u32>,
}

impl WfcSolver {
    pub fn new(width: usize, height: usize, proto_count: usize, compat: Vec<[u32; 4]>) -> Self {
        assert!(proto_count <= 32, "prototype table limited to 32 entries");
        assert_eq!(compat.len(), proto_count);
        let full = Self::full_mask(proto_count);
        Self {
            width,
            height,
            proto_count,
            compat,
            domains: vec![full; width * height],
        }
    }

    fn full_mask(proto_count: usize) -> u32 {
        if proto_count == 32 {
            u32::MAX
        } else {
            (1u32 << proto_count) - 1
        }
    }

    /// Restrict a cell's domain before solving (pre-collapsed or forbidden sets)
    pub fn restrict(&mut self, cell: usize, mask: u32) {
        self.domains[cell] &= mask;
        if self.domains[cell] == 0 {
            // An over-restricted seed cell falls back to the full set.
            self.domains[cell] = Self::full_mask(self.proto_count);
        }
    }

    fn neighbor(&self, cell: usize, dir: Direction) -> Option<usize> {
        let x = cell % self.width;
        let y = cell / self.width;
        let (dx, dy) = dir.delta();
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if nx < 0 || ny < 0 || nx >= self.width as i32 || ny >= self.height as i32 {
            return None;
        }
        Some(ny as usize * self.width + nx as usize)
    }

    fn protos_in(&self, mask: u32) -> impl Iterator<Item = usize> + '_ {
        (0..self.proto_count).filter(move |p| mask & (1 << p) != 0)
    }

    /// Worklist constraint propagation starting from one cell
    fn propagate(&mut self, start: usize, queued: &mut [bool], stack: &mut Vec<usize>) {
        stack.clear();
        stack.push(start);
        queued[start] = true;
        while let Some(cell) = stack.pop() {
            queued[cell] = false;
            let domain = self.domains[cell];
            for (d, dir) in Direction::ALL.into_iter().enumerate() {
                let Some(n) = self.neighbor(cell, dir) else {
                    continue;
                };
                let mut allowed = 0u32;
                for p in self.protos_in(domain) {
                    allowed |= self.compat[p][d];
                }
                let reduced = self.domains[n] & allowed;
                if reduced == self.domains[n] {
                    continue;
                }
                if reduced == 0 {
                    // Constraint failure: fall back to an unconstrained set for
                    // this cell and keep the best-so-far assignment elsewhere.
                    debug!("wfc contradiction at cell {n}, resetting domain");
                    self.domains[n] = Self::full_mask(self.proto_count);
                    continue;
                }
                self.domains[n] = reduced;
                if !queued[n] {
                    queued[n] = true;
                    stack.push(n);
                }
            }
        }
    }

    /// Pick the undecided cell with the fewest possibilities. Ties are broken
    /// by a fixed-bias coin so scan order does not dominate the layout.
    fn select_cell(&self, rng: &mut StdRng) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for cell in 0..self.domains.len() {
            let count = self.domains[cell].count_ones();
            if count <= 1 {
                continue;
            }
            best = match best {
                None => Some((cell, count)),
                Some((_, best_count)) if count < best_count => Some((cell, count)),
                Some((_, best_count)) if count == best_count && rng.random_bool(0.4) => {
                    Some((cell, count))
                }
                other => other,
            };
        }
        best.map(|(cell, _)| cell)
    }

    fn weighted_pick<W>(&self, cell: usize, weight: &W, rng: &mut StdRng) -> usize
    where
        W: Fn(usize, usize) -> f32,
    {
        let domain = self.domains[cell];
        let total: f32 = self
            .protos_in(domain)
            .map(|p| weight(cell, p).max(0.0))
            .sum();
        if total <= f32::EPSILON {
            // Degenerate weights: uniform pick among what remains.
            let options: Vec<usize> = self.protos_in(domain).collect();
            return options[rng.random_range(0..options.len())];
        }
        let mut roll = rng.random_range(0.0..total);
        let mut last = 0;
        for p in self.protos_in(domain) {
            last = p;
            let w = weight(cell, p).max(0.0);
            if roll < w {
                return p;
            }
            roll -= w;
        }
        last
    }

    /// Run collapse + propagation to a fixed point or the iteration cap,
    /// then finalize remaining cells with uniform picks. Returns one
    /// prototype index per cell.
    pub fn solve<W>(&mut self, rng: &mut StdRng, weight: W) -> Vec<usize>
    where
        W: Fn(usize, usize) -> f32,
    {
        let len = self.domains.len();
        let mut queued = vec![false; len];
        let mut stack = Vec::with_capacity(len);

        // Seed propagation from cells already pinned by `restrict`.
        for cell in 0..len {
            if self.domains[cell].count_ones() == 1 {
                self.propagate(cell, &mut queued, &mut stack);
            }
        }

        let cap = 2 * len;
        for _ in 0..cap {
            let Some(cell) = self.select_cell(rng) else {
                break;
            };
            let pick = self.weighted_pick(cell, &weight, rng);
            self.domains[cell] = 1 << pick;
            self.propagate(cell, &mut queued, &mut stack);
        }

        // Anything still undecided takes a uniform-random pick.
        (0..len)
            .map(|cell| {
                let domain = self.domains[cell];
                match domain.count_ones() {
                    1 => domain.trailing_zeros() as usize,
                    0 => rng.random_range(0..self.proto_count),
                    _ => {
                        let options: Vec<usize> = self.protos_in(domain).collect();
                        options[rng.random_range(0..options.len())]
                    }
                }
            })
            .collect()
    }
}
