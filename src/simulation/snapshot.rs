//! Flat snapshot of the authoritative simulation state
//!
//! Only authoritative data is captured: the editable tile arrays, the
//! policy active flags, and the city scalars. Everything else (segments,
//! intersections, zone index, metrics, agents) is derived and rebuilt on
//! restore.

use super::city_state::CityState;
use super::policy::PolicyId;
use super::types::{Direction, TileKind};

/// A flat, reconstructible capture of the city
#[derive(Debug, Clone)]
pub struct CitySnapshot {
    pub width: usize,
    pub height: usize,
    pub kind: Vec<TileKind>,
    pub lanes: Vec<u8>,
    pub sidewalk: Vec<f32>,
    pub speed_limit: Vec<u8>,
    pub one_way: Vec<Option<Direction>>,
    pub ped_only: Vec<bool>,
    pub scooter_restricted: Vec<bool>,
    pub noise_barrier: Vec<bool>,
    pub policies: Vec<(PolicyId, bool)>,
    pub state: CityState,
}

impl CitySnapshot {
    /// All tile arrays must cover exactly width x height tiles
    pub fn is_consistent(&self) -> bool {
        let len = self.width * self.height;
        self.kind.len() == len
            && self.lanes.len() == len
            && self.sidewalk.len() == len
            && self.speed_limit.len() == len
            && self.one_way.len() == len
            && self.ped_only.len() == len
            && self.scooter_restricted.len() == len
            && self.noise_barrier.len() == len
    }
}
