//! City policies and their simulation effects
//!
//! Policies are a closed enum with fixed costs. Their effects fold into a
//! single multiplier set each tick; every effect is multiplicative (or an
//! additive bonus), so the fold is order-independent.

/// The full policy catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyId {
    CongestionPricing,
    ScooterCrackdown,
    NoiseCurfew,
    SidewalkProgram,
    TransitSubsidy,
    ParkingEnforcement,
    VendorPermits,
    VisionZero,
}

/// An enactable policy with its costs and current state
#[derive(Debug, Clone)]
pub struct Policy {
    pub id: PolicyId,
    pub name: &'static str,
    pub description: &'static str,
    /// Political points required to enact
    pub pp_cost: f64,
    /// Cash required to enact
    pub cash_cost: f64,
    pub active: bool,
}

/// The catalog in its initial (all inactive) state
pub fn default_policies() -> Vec<Policy> {
    vec![
        Policy {
            id: PolicyId::CongestionPricing,
            name: "Congestion Pricing",
            description: "Charges drivers during peak hours, reducing trips and boosting revenue.",
            pp_cost: 30.0,
            cash_cost: 15_000.0,
            active: false,
        },
        Policy {
            id: PolicyId::ScooterCrackdown,
            name: "Scooter Licensing Crackdown",
            description: "Cuts scooter share and noise, but irritates riders.",
            pp_cost: 20.0,
            cash_cost: 8_000.0,
            active: false,
        },
        Policy {
            id: PolicyId::NoiseCurfew,
            name: "Night Noise Curfew",
            description: "Quiet hours reduce nighttime noise around markets.",
            pp_cost: 25.0,
            cash_cost: 5_000.0,
            active: false,
        },
        Policy {
            id: PolicyId::SidewalkProgram,
            name: "Sidewalk Expansion Program",
            description: "Subsidizes sidewalk upgrades and improves walkability.",
            pp_cost: 35.0,
            cash_cost: 12_000.0,
            active: false,
        },
        Policy {
            id: PolicyId::TransitSubsidy,
            name: "Public Transit Subsidy",
            description: "Reduces car trips gradually as transit use rises.",
            pp_cost: 40.0,
            cash_cost: 20_000.0,
            active: false,
        },
        Policy {
            id: PolicyId::ParkingEnforcement,
            name: "Parking Enforcement",
            description: "Cuts cruising traffic, minor annoyance for drivers.",
            pp_cost: 15.0,
            cash_cost: 6_000.0,
            active: false,
        },
        Policy {
            id: PolicyId::VendorPermits,
            name: "Street Vendor Permits",
            description: "Boosts income but adds localized noise.",
            pp_cost: 18.0,
            cash_cost: 4_000.0,
            active: false,
        },
        Policy {
            id: PolicyId::VisionZero,
            name: "Vision Zero Campaign",
            description: "Citywide speed reductions improve safety and walkability.",
            pp_cost: 28.0,
            cash_cost: 9_000.0,
            active: false,
        },
    ]
}

/// Folded multipliers consumed by the per-tick evaluation
#[derive(Debug, Clone, Copy)]
pub struct PolicyEffects {
    pub traffic_factor: f64,
    pub income_bonus: f32,
    pub noise_factor: f32,
    pub sidewalk_bonus: f32,
    pub speed_cap: u8,
    pub transit_factor: f64,
}

impl Default for PolicyEffects {
    fn default() -> Self {
        Self {
            traffic_factor: 1.0,
            income_bonus: 0.0,
            noise_factor: 1.0,
            sidewalk_bonus: 0.0,
            speed_cap: 50,
            transit_factor: 1.0,
        }
    }
}

impl PolicyEffects {
    pub fn from_policies(policies: &[Policy]) -> Self {
        let mut effects = Self::default();
        for policy in policies.iter().filter(|p| p.active) {
            match policy.id {
                PolicyId::CongestionPricing => {
                    effects.traffic_factor *= 0.85;
                    effects.income_bonus += 0.05;
                }
                PolicyId::ScooterCrackdown => effects.noise_factor *= 0.85,
                PolicyId::NoiseCurfew => effects.noise_factor *= 0.9,
                PolicyId::SidewalkProgram => effects.sidewalk_bonus += 0.1,
                PolicyId::TransitSubsidy => effects.transit_factor *= 0.9,
                PolicyId::ParkingEnforcement => effects.traffic_factor *= 0.92,
                PolicyId::VendorPermits => {
                    effects.income_bonus += 0.08;
                    effects.noise_factor *= 1.05;
                }
                PolicyId::VisionZero => {
                    effects.speed_cap = effects.speed_cap.min(30);
                    effects.sidewalk_bonus += 0.05;
                }
            }
        }
        effects
    }
}

/// Whether a policy is currently active in the given catalog
pub fn policy_active(policies: &[Policy], id: PolicyId) -> bool {
    policies.iter().any(|p| p.id == id && p.active)
}
