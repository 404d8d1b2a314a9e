//! City model, policy, edit, and scenario tests

use city_sim::simulation::{
    CityCore, CityState, GenStrategy, PolicyId, TileKind, COST_TILE_EDIT, ELECTIONS_TO_WIN,
    MAX_DEBT, PP_TILE_EDIT, QUICK_ELECTION_INTERVAL, REQUIRED_APPROVAL,
};

fn spline_core(seed: u64) -> CityCore {
    let mut core = CityCore::with_seed(seed);
    core.generate(GenStrategy::Spline, seed);
    core
}

fn some_road_tile(core: &CityCore) -> usize {
    core.grid.road_tiles()[0]
}

#[test]
fn test_initial_city_state() {
    let state = CityState::new();
    assert_eq!(state.population, 42_000.0);
    assert_eq!(state.happiness, 52.0);
    assert_eq!(state.approval, 51.0);
    assert_eq!(state.cash, 120_000.0);
    assert_eq!(state.debt, 40_000.0);
    assert_eq!(state.election_timer, QUICK_ELECTION_INTERVAL);
    assert!(!state.lost);
    assert!(!state.won);
}

#[test]
fn test_tick_zero_is_a_noop() {
    let mut core = spline_core(5);
    core.tick(1.0 / 30.0);

    let before = core.state.clone();
    let traffic_before = core.metrics.traffic.clone();
    core.tick(0.0);
    assert_eq!(core.state, before, "tick(0) must not change city state");
    assert_eq!(
        core.metrics.traffic, traffic_before,
        "tick(0) must not re-run the traffic pass"
    );
}

#[test]
fn test_default_scenario_survives_600_ticks() {
    let mut core = spline_core(3);
    for _ in 0..600 {
        core.tick(1.0 / 30.0);
    }
    assert!(
        !core.state.lost,
        "default dynamics must not bankrupt the city in 20 simulated seconds"
    );
    assert!(core.state.population >= 10_000.0, "population fell through the floor");
}

#[test]
fn test_policy_rejected_when_unaffordable() {
    let mut core = spline_core(6);
    core.state.cash = 1_000.0;
    let before = core.state.clone();

    assert!(!core.enact_policy(PolicyId::CongestionPricing));
    let policy = core
        .policies
        .iter()
        .find(|p| p.id == PolicyId::CongestionPricing)
        .expect("catalog policy");
    assert!(!policy.active, "rejected policy must stay inactive");
    assert_eq!(core.state, before, "rejected policy must not mutate state");
}

#[test]
fn test_policy_enactment_and_repeal() {
    let mut core = spline_core(7);
    let cash = core.state.cash;
    let pp = core.state.political_points;

    assert!(core.enact_policy(PolicyId::CongestionPricing));
    assert_eq!(core.state.cash, cash - 15_000.0);
    assert_eq!(core.state.political_points, pp - 30.0);
    assert_eq!(core.state.recent_discontent, 4.0);

    // Enacting twice is rejected.
    assert!(!core.enact_policy(PolicyId::CongestionPricing));

    assert!(core.repeal_policy(PolicyId::CongestionPricing));
    assert_eq!(core.state.recent_discontent, 6.0);
    assert!(!core.repeal_policy(PolicyId::CongestionPricing));
}

#[test]
fn test_edit_costs_cash_and_political_points() {
    let mut core = spline_core(8);
    let road = some_road_tile(&core);
    let cash = core.state.cash;
    let pp = core.state.political_points;

    assert!(core.toggle_one_way(road));
    assert_eq!(core.state.cash, cash - COST_TILE_EDIT);
    assert_eq!(core.state.political_points, pp - PP_TILE_EDIT);
}

#[test]
fn test_edit_rejected_when_broke() {
    let mut core = spline_core(9);
    let road = some_road_tile(&core);
    core.state.cash = 10.0;
    let one_way_before = core.grid.one_way[road];

    assert!(!core.toggle_one_way(road));
    assert_eq!(core.grid.one_way[road], one_way_before);
    assert_eq!(core.state.cash, 10.0);
}

#[test]
fn test_edit_rejected_on_non_road_tile() {
    let mut core = spline_core(10);
    let building = (0..core.grid.len())
        .find(|&i| core.grid.kind[i] != TileKind::Road)
        .expect("maps always contain buildings");
    assert!(!core.toggle_one_way(building));
    assert!(!core.add_sidewalk(building));
    assert!(!core.toggle_ped_only(building));
}

#[test]
fn test_one_way_cycle_returns_to_two_way() {
    let mut core = spline_core(11);
    core.state.cash = 1_000_000.0;
    core.state.political_points = 1_000.0;
    let road = some_road_tile(&core);
    let initial = core.grid.one_way[road];

    for _ in 0..5 {
        assert!(core.toggle_one_way(road));
    }
    assert_eq!(
        core.grid.one_way[road], initial,
        "five toggles walk the full cycle"
    );
}

#[test]
fn test_sidewalk_edit_is_subsidized_by_policy() {
    let mut core = spline_core(12);
    core.state.political_points = 100.0;
    let road = some_road_tile(&core);
    assert!(core.enact_policy(PolicyId::SidewalkProgram));
    let cash = core.state.cash;
    assert!(core.add_sidewalk(road));
    assert_eq!(core.state.cash, cash - 1_500.0);
    assert!(core.grid.sidewalk[road] > 0.0);
}

#[test]
fn test_bankruptcy_by_debt_is_terminal() {
    let mut core = spline_core(13);
    core.state.debt = MAX_DEBT + 50_000.0;
    core.tick(1.0 / 30.0);
    assert!(core.state.lost);

    // Terminal: further ticks are no-ops.
    let frozen = core.state.clone();
    core.tick(1.0 / 30.0);
    assert_eq!(core.state, frozen);
}

#[test]
fn test_election_loss_below_required_approval() {
    let mut core = spline_core(14);
    // Confiscatory taxes crater happiness, and with it approval.
    core.state.tax_rate = 1.0;
    core.state.recent_discontent = 100.0;
    core.state.election_timer = 0.01;
    core.tick(1.0 / 30.0);
    assert!(core.state.approval < REQUIRED_APPROVAL);
    assert!(core.state.lost, "losing an election ends the game");
}

#[test]
fn test_three_survived_elections_win() {
    let mut state = CityState::new();
    state.approval = 80.0;
    for round in 1..=ELECTIONS_TO_WIN {
        state.election_timer = -1.0;
        state.check_win_lose();
        assert!(!state.lost);
        assert_eq!(state.election_count, round);
    }
    assert!(state.won, "three survived elections at high approval win the game");
}

#[test]
fn test_agent_reroute_invariant() {
    let mut core = spline_core(15);
    for _ in 0..60 {
        core.tick(1.0 / 30.0);
    }
    for agent in &core.agents {
        assert!(
            agent.path_index < agent.path.len(),
            "agent {:?} has an out-of-bounds path index",
            agent.id
        );
    }
    // The network is routable, so at least some agents should be moving.
    assert!(
        core.agents.iter().any(|a| !a.idle),
        "every agent went idle on a healthy map"
    );
}

#[test]
fn test_fully_blocked_vehicles_go_idle() {
    let mut core = spline_core(16);
    // Pedestrianize the whole network behind the editor's back.
    for i in 0..core.grid.len() {
        if core.grid.kind[i] == TileKind::Road {
            core.grid.ped_only[i] = true;
        }
    }
    // Force every agent to re-route from its current tile.
    for agent in &mut core.agents {
        let here = agent.path[agent.path_index.min(agent.path.len() - 1)];
        agent.path = vec![here];
        agent.path_index = 0;
        agent.spline = None;
    }
    for _ in 0..5 {
        core.tick(1.0 / 30.0);
    }
    for agent in core.agents.iter().filter(|a| a.class.is_vehicle()) {
        assert!(
            agent.idle,
            "vehicle {:?} should be idle with the whole network pedestrianized",
            agent.id
        );
    }
}

#[test]
fn test_snapshot_restore_round_trip() {
    let mut core = spline_core(17);
    core.state.cash = 55_555.0;
    assert!(core.enact_policy(PolicyId::NoiseCurfew));
    let snapshot = core.snapshot();

    // Scramble the core with a different city, then restore.
    core.generate(GenStrategy::Wfc, 99);
    core.restore(&snapshot).expect("restore should succeed");

    assert_eq!(core.grid.kind, snapshot.kind);
    assert_eq!(core.grid.one_way, snapshot.one_way);
    assert_eq!(core.state, snapshot.state);
    assert!(
        core.policies
            .iter()
            .find(|p| p.id == PolicyId::NoiseCurfew)
            .expect("catalog policy")
            .active
    );
    // Derived state is rebuilt, not restored.
    assert!(!core.road_graph.segments.is_empty());
    for kind in TileKind::ZONES {
        let expected = (0..core.grid.len())
            .filter(|&i| core.grid.kind[i] == kind)
            .count();
        assert_eq!(core.grid.zone_tiles(kind).len(), expected);
    }
}

#[test]
fn test_restore_rejects_inconsistent_snapshot() {
    let mut core = spline_core(18);
    let mut snapshot = core.snapshot();
    snapshot.lanes.pop();
    assert!(core.restore(&snapshot).is_err());
}

#[test]
fn test_political_points_accrue_over_time() {
    let mut core = spline_core(19);
    let before = core.state.political_points;
    for _ in 0..30 {
        core.tick(1.0 / 30.0);
    }
    assert!(
        core.state.political_points > before,
        "political points accrue with happiness and population"
    );
}
