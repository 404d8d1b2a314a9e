//! City-wide scalar state: treasury, politics, and terminal conditions
//!
//! Tracks the mayor's finances and standing. Win and loss are legitimate end
//! states, not errors; once either flag is set the simulation tick becomes a
//! no-op until the core is regenerated.

use log::info;
use log::warn;

/// Seconds between elections at the default (quick) cadence
pub const QUICK_ELECTION_INTERVAL: f64 = 180.0;
/// Seconds between elections at the long cadence
pub const ELECTION_INTERVAL: f64 = 600.0;
/// Approval needed to survive an election
pub const REQUIRED_APPROVAL: f64 = 50.0;
/// Approval needed (after three survived elections) to win outright
pub const VICTORY_APPROVAL: f64 = 60.0;
/// Survived elections required for victory
pub const ELECTIONS_TO_WIN: u32 = 3;
/// Cash deficit that triggers bankruptcy
pub const MAX_CASH_DEFICIT: f64 = 200_000.0;
/// Debt level that triggers bankruptcy
pub const MAX_DEBT: f64 = 500_000.0;
/// Population never drops below this floor
pub const MIN_POPULATION: f64 = 10_000.0;

/// Cash cost of a tile edit action
pub const COST_TILE_EDIT: f64 = 3_000.0;
/// Cash cost of a sidewalk edit under the subsidy policy
pub const COST_SIDEWALK_SUBSIDIZED: f64 = 1_500.0;
/// Political point cost of any tile edit action
pub const PP_TILE_EDIT: f64 = 6.0;

/// Discontent added by restricting scooters on a tile
pub const DISCONTENT_SCOOTER_EDIT: f64 = 3.0;
/// Discontent added by enacting a policy
pub const DISCONTENT_ENACT: f64 = 4.0;
/// Discontent added by repealing a policy
pub const DISCONTENT_REPEAL: f64 = 2.0;

/// Scalar city metrics, one instance per core
#[derive(Debug, Clone, PartialEq)]
pub struct CityState {
    pub time: f64,
    pub population: f64,
    pub happiness: f64,
    pub approval: f64,
    pub cash: f64,
    pub debt: f64,
    pub interest_rate: f64,
    pub monthly_balance: f64,
    pub tax_rate: f64,
    pub political_points: f64,
    pub election_timer: f64,
    pub election_count: u32,
    pub recent_discontent: f64,
    pub lost: bool,
    pub won: bool,
}

impl Default for CityState {
    fn default() -> Self {
        Self::new()
    }
}

impl CityState {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            population: 42_000.0,
            happiness: 52.0,
            approval: 51.0,
            cash: 120_000.0,
            debt: 40_000.0,
            interest_rate: 0.05,
            monthly_balance: 0.0,
            tax_rate: 0.18,
            political_points: 40.0,
            election_timer: QUICK_ELECTION_INTERVAL,
            election_count: 0,
            recent_discontent: 0.0,
            lost: false,
            won: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.lost || self.won
    }

    pub fn can_afford(&self, cash: f64, political_points: f64) -> bool {
        self.cash >= cash && self.political_points >= political_points
    }

    /// Deduct an action's costs. Returns false (and changes nothing) when the
    /// treasury or political capital falls short.
    pub fn spend(&mut self, cash: f64, political_points: f64) -> bool {
        if !self.can_afford(cash, political_points) {
            return false;
        }
        self.cash -= cash;
        self.political_points -= political_points;
        true
    }

    /// Bankruptcy check and election resolution. Called once per tick after
    /// the financial pass has updated cash, debt, and approval.
    pub fn check_win_lose(&mut self) {
        if self.is_terminal() {
            return;
        }
        if self.cash < -MAX_CASH_DEFICIT || self.debt > MAX_DEBT {
            warn!(
                "city bankrupt: cash {:.0}, debt {:.0}",
                self.cash, self.debt
            );
            self.lost = true;
            return;
        }
        if self.election_timer <= 0.0 {
            self.election_count += 1;
            if self.approval < REQUIRED_APPROVAL {
                info!(
                    "election {} lost with approval {:.1}",
                    self.election_count, self.approval
                );
                self.lost = true;
                return;
            }
            info!(
                "election {} survived with approval {:.1}",
                self.election_count, self.approval
            );
            self.election_timer = QUICK_ELECTION_INTERVAL;
            if self.election_count >= ELECTIONS_TO_WIN && self.approval > VICTORY_APPROVAL {
                self.won = true;
            }
        }
    }
}
