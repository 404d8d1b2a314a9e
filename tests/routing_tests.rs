//! Router validation tests
//!
//! These exercise per-class passability, one-way enforcement, and A*
//! optimality on small hand-built grids.

use city_sim::simulation::{
    find_nearest_road, find_path, is_move_allowed, AgentClass, Direction, TileGrid, TileKind,
};

/// Build a grid where every listed tile is a plain two-way road
fn grid_with_roads(width: usize, height: usize, roads: &[(usize, usize)]) -> TileGrid {
    let mut grid = TileGrid::new(width, height);
    for &(x, y) in roads {
        let index = grid.index(x, y);
        grid.set_kind(index, TileKind::Road);
        grid.lanes[index] = 1;
        grid.speed_limit[index] = 30;
    }
    grid.rebuild_direction_masks();
    grid
}

fn all_road_grid(width: usize, height: usize) -> TileGrid {
    let roads: Vec<(usize, usize)> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .collect();
    grid_with_roads(width, height, &roads)
}

#[test]
fn test_straight_corridor_path_length_is_manhattan() {
    let roads: Vec<(usize, usize)> = (0..7).map(|x| (x, 1)).collect();
    let grid = grid_with_roads(7, 3, &roads);
    let start = grid.index(0, 1);
    let goal = grid.index(6, 1);

    let path = find_path(&grid, AgentClass::Car, start, goal).expect("corridor should route");
    assert_eq!(
        path.len(),
        7,
        "unobstructed path should be exactly the Manhattan distance"
    );
    assert_eq!(path[0], start);
    assert_eq!(path[path.len() - 1], goal);
}

#[test]
fn test_open_block_path_length_is_manhattan() {
    let grid = all_road_grid(5, 5);
    let start = grid.index(0, 0);
    let goal = grid.index(4, 4);

    let path = find_path(&grid, AgentClass::Car, start, goal).expect("open block should route");
    // Manhattan distance 8, inclusive of both endpoints.
    assert_eq!(path.len(), 9);
}

#[test]
fn test_path_is_deterministic() {
    let grid = all_road_grid(6, 6);
    let start = grid.index(0, 0);
    let goal = grid.index(5, 5);

    let first = find_path(&grid, AgentClass::Car, start, goal).expect("should route");
    let second = find_path(&grid, AgentClass::Car, start, goal).expect("should route");
    assert_eq!(first, second, "tie-breaking must be stable across runs");
}

#[test]
fn test_ped_only_blocks_cars_but_not_pedestrians() {
    let roads: Vec<(usize, usize)> = (0..5).map(|x| (x, 0)).collect();
    let mut grid = grid_with_roads(5, 1, &roads);
    let barrier = grid.index(2, 0);
    grid.ped_only[barrier] = true;

    let start = grid.index(0, 0);
    let goal = grid.index(4, 0);

    assert!(
        find_path(&grid, AgentClass::Car, start, goal).is_none(),
        "car must not route through a pedestrianized tile"
    );
    assert!(
        find_path(&grid, AgentClass::Truck, start, goal).is_none(),
        "truck must not route through a pedestrianized tile"
    );
    assert!(
        find_path(&grid, AgentClass::Pedestrian, start, goal).is_some(),
        "pedestrians may traverse any road tile"
    );
}

#[test]
fn test_scooter_restriction_blocks_scooters_only() {
    let roads: Vec<(usize, usize)> = (0..5).map(|x| (x, 0)).collect();
    let mut grid = grid_with_roads(5, 1, &roads);
    let restricted = grid.index(2, 0);
    grid.scooter_restricted[restricted] = true;

    let start = grid.index(0, 0);
    let goal = grid.index(4, 0);

    assert!(find_path(&grid, AgentClass::Scooter, start, goal).is_none());
    assert!(find_path(&grid, AgentClass::Car, start, goal).is_some());
    assert!(find_path(&grid, AgentClass::Pedestrian, start, goal).is_some());
}

#[test]
fn test_one_way_enforcement_matches_geometry() {
    let mut grid = all_road_grid(3, 3);
    let center = grid.index(1, 1);

    let cases: [Option<Direction>; 5] = [
        None,
        Some(Direction::North),
        Some(Direction::East),
        Some(Direction::South),
        Some(Direction::West),
    ];
    for one_way in cases {
        grid.one_way[center] = one_way;
        for dir in Direction::ALL {
            let neighbor = grid.neighbor(center, dir).expect("3x3 center has all neighbors");
            let expected = match one_way {
                None => true,
                Some(allowed) => allowed == dir,
            };
            assert_eq!(
                is_move_allowed(&grid, center, neighbor),
                expected,
                "one_way {:?} moving {:?}",
                one_way,
                dir
            );
        }
    }
}

#[test]
fn test_one_way_makes_destination_unreachable() {
    // A single corridor forced eastbound cannot be walked back westward.
    let roads: Vec<(usize, usize)> = (0..5).map(|x| (x, 0)).collect();
    let mut grid = grid_with_roads(5, 1, &roads);
    for x in 0..5 {
        let index = grid.index(x, 0);
        grid.one_way[index] = Some(Direction::East);
    }

    let east = grid.index(4, 0);
    let west = grid.index(0, 0);
    assert!(find_path(&grid, AgentClass::Car, west, east).is_some());
    assert!(
        find_path(&grid, AgentClass::Car, east, west).is_none(),
        "one-way corridor must be directed"
    );
}

#[test]
fn test_unreachable_disconnected_component() {
    let mut roads: Vec<(usize, usize)> = (0..2).map(|x| (x, 0)).collect();
    roads.extend((3..5).map(|x| (x, 0)));
    let grid = grid_with_roads(5, 1, &roads);

    let start = grid.index(0, 0);
    let goal = grid.index(4, 0);
    assert!(
        find_path(&grid, AgentClass::Pedestrian, start, goal).is_none(),
        "a gap in the road must yield no path"
    );
}

#[test]
fn test_find_nearest_road_attaches_zones() {
    let roads: Vec<(usize, usize)> = (0..5).map(|x| (x, 0)).collect();
    let mut grid = grid_with_roads(5, 4, &roads);
    let zone = grid.index(2, 3);
    grid.set_kind(zone, TileKind::Residential);

    let nearest = find_nearest_road(&grid, AgentClass::Car, zone).expect("road exists");
    assert_eq!(nearest, grid.index(2, 0), "BFS should find the closest road tile");
}

#[test]
fn test_same_start_and_goal() {
    let grid = all_road_grid(3, 3);
    let tile = grid.index(1, 1);
    let path = find_path(&grid, AgentClass::Car, tile, tile).expect("trivial path");
    assert_eq!(path, vec![tile]);
}
