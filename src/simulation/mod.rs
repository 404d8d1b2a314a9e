//! Standalone city simulation module
//!
//! All core simulation logic lives here and runs without any rendering or
//! UI dependency, so the whole city can be driven and inspected from the
//! console or from tests.

mod agent;
mod city_state;
mod grid;
mod mapgen;
mod model;
mod policy;
mod road_graph;
mod router;
mod snapshot;
mod types;
mod wfc;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use agent::{signal_allows_move, speed_for, Agent, AgentUpdateResult, SplineBinding};
#[allow(unused_imports)]
pub use city_state::{
    CityState, COST_SIDEWALK_SUBSIDIZED, COST_TILE_EDIT, DISCONTENT_ENACT, DISCONTENT_REPEAL,
    DISCONTENT_SCOOTER_EDIT, ELECTIONS_TO_WIN, ELECTION_INTERVAL, MAX_CASH_DEFICIT, MAX_DEBT,
    MIN_POPULATION, PP_TILE_EDIT, QUICK_ELECTION_INTERVAL, REQUIRED_APPROVAL, VICTORY_APPROVAL,
};
#[allow(unused_imports)]
pub use grid::TileGrid;
#[allow(unused_imports)]
pub use mapgen::zoning_compatible;
#[allow(unused_imports)]
pub use model::TileMetrics;
#[allow(unused_imports)]
pub use policy::{default_policies, policy_active, Policy, PolicyEffects, PolicyId};
#[allow(unused_imports)]
pub use road_graph::{Intersection, RoadGraph, RoadSegment};
#[allow(unused_imports)]
pub use router::{find_nearest_road, find_path, is_move_allowed, passable};
#[allow(unused_imports)]
pub use snapshot::CitySnapshot;
#[allow(unused_imports)]
pub use types::{
    AgentClass, AgentId, Direction, GenStrategy, IntersectionId, RoadClass, RoadWidth, SegmentId,
    TileKind, DEFAULT_AGENT_COUNT, GRID_HEIGHT, GRID_WIDTH, ROAD_TARGET_RATIO, SIGNAL_CYCLE_SECS,
    SPEED_OPTIONS,
};
pub use world::CityCore;
