//! Core types for the city simulation
//!
//! Closed enums and id newtypes shared by every subsystem. These are
//! standalone types with no dependency on the runner or any UI.

/// Default grid width in tiles
pub const GRID_WIDTH: usize = 40;
/// Default grid height in tiles
pub const GRID_HEIGHT: usize = 30;

/// Legal speed limits for road tiles
pub const SPEED_OPTIONS: [u8; 4] = [20, 30, 40, 50];

/// Target fraction of road tiles after generation
pub const ROAD_TARGET_RATIO: f32 = 0.24;

/// Full signal cycle in simulated seconds
pub const SIGNAL_CYCLE_SECS: f64 = 8.0;

/// Default number of agents kept alive by the simulator
pub const DEFAULT_AGENT_COUNT: usize = 120;

/// A unique identifier for road segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(pub usize);

/// A unique identifier for derived intersections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntersectionId(pub usize);

/// A unique identifier for agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(pub usize);

/// What occupies a grid tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Open,
    Road,
    Residential,
    Commercial,
    Industrial,
    Park,
    School,
    NightMarket,
    Temple,
    Mall,
}

impl TileKind {
    /// Zone kinds that participate in the zone index (spawn/destination sampling)
    pub const ZONES: [TileKind; 8] = [
        TileKind::Residential,
        TileKind::Commercial,
        TileKind::Industrial,
        TileKind::Park,
        TileKind::School,
        TileKind::NightMarket,
        TileKind::Temple,
        TileKind::Mall,
    ];

    /// Building kinds placeable by the zoning solver (non-road, including Open)
    pub const BUILDABLE: [TileKind; 9] = [
        TileKind::Open,
        TileKind::Residential,
        TileKind::Commercial,
        TileKind::Industrial,
        TileKind::Park,
        TileKind::School,
        TileKind::NightMarket,
        TileKind::Temple,
        TileKind::Mall,
    ];

    pub fn is_zone(self) -> bool {
        !matches!(self, TileKind::Open | TileKind::Road)
    }

    /// Display name used by the headless runner
    pub fn name(self) -> &'static str {
        match self {
            TileKind::Open => "Open space",
            TileKind::Road => "Road",
            TileKind::Residential => "Residential",
            TileKind::Commercial => "Commercial",
            TileKind::Industrial => "Industrial",
            TileKind::Park => "Park",
            TileKind::School => "School",
            TileKind::NightMarket => "Night Market",
            TileKind::Temple => "Temple",
            TileKind::Mall => "Mall",
        }
    }
}

/// A cardinal direction on the grid; north is decreasing y
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// (dx, dy) offset of the neighboring tile in this direction
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// Bit used in the derived tile direction mask
    pub fn bit(self) -> u8 {
        match self {
            Direction::North => 1,
            Direction::East => 2,
            Direction::South => 4,
            Direction::West => 8,
        }
    }

    pub fn is_north_south(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }
}

/// Classification of a road tile or segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoadClass {
    #[default]
    Local,
    Arterial,
}

/// Width class used by the spline generator's road casting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadWidth {
    Narrow,
    Medium,
    Wide,
}

impl RoadWidth {
    pub fn lanes(self) -> u8 {
        match self {
            RoadWidth::Narrow | RoadWidth::Medium => 1,
            RoadWidth::Wide => 2,
        }
    }
}

/// Class of a mobile agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentClass {
    Pedestrian,
    Scooter,
    Car,
    Truck,
}

impl AgentClass {
    pub fn is_vehicle(self) -> bool {
        !matches!(self, AgentClass::Pedestrian)
    }

    /// Base movement speed in tiles per second, before per-tile modifiers
    pub fn base_speed(self) -> f32 {
        match self {
            AgentClass::Pedestrian => 1.1,
            AgentClass::Scooter => 3.2,
            AgentClass::Car => 4.5,
            AgentClass::Truck => 3.6,
        }
    }

    /// Zone kinds this class accepts as trip destinations
    pub fn destination_kinds(self) -> &'static [TileKind] {
        match self {
            AgentClass::Pedestrian => &[
                TileKind::Park,
                TileKind::School,
                TileKind::Commercial,
                TileKind::NightMarket,
                TileKind::Temple,
                TileKind::Residential,
            ],
            AgentClass::Scooter => &[
                TileKind::Commercial,
                TileKind::NightMarket,
                TileKind::Residential,
                TileKind::Mall,
            ],
            AgentClass::Car => &[
                TileKind::Commercial,
                TileKind::Industrial,
                TileKind::Mall,
                TileKind::Residential,
            ],
            AgentClass::Truck => &[TileKind::Industrial, TileKind::Commercial, TileKind::Mall],
        }
    }
}

/// Map generation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenStrategy {
    /// Tile-wise wave function collapse over road/building prototypes
    Wfc,
    /// Spline road casting with a secondary WFC pass for building zoning
    Spline,
}
