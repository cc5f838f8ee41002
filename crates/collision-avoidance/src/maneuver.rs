//! Avoidance maneuver planning under a fuel budget

use crate::round_to;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_FUEL_BUDGET: f64 = 50.0;

const MAX_BURN_DELTA_V: f64 = 0.5;
const LEAD_TIME_SECONDS: f64 = 300.0;
const MIN_EXECUTE_IN_SECONDS: f64 = 5.0;

fn default_threat_tca() -> f64 {
    600.0
}

fn default_threat_probability() -> f64 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threat {
    #[serde(default)]
    pub debris_id: Option<String>,
    #[serde(default = "default_threat_probability")]
    pub probability: f64,
    #[serde(rename = "timeToCA", default = "default_threat_tca")]
    pub time_to_ca: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BurnAxis {
    RadialOut,
    AlongTrack,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    NoAction,
    Planned,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Burn {
    pub id: Uuid,
    pub axis: BurnAxis,
    /// km/s
    pub delta_v: f64,
    /// Seconds from now
    pub execute_in: f64,
    pub objective: String,
    pub expected_risk_drop: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManeuverPlan {
    pub satellite_id: Option<String>,
    pub status: PlanStatus,
    pub burns: Vec<Burn>,
    pub total_delta_v: f64,
    pub expected_risk_reduction: f64,
    pub fuel_budget: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ManeuverPlan {
    fn no_action(satellite_id: Option<&str>, fuel_budget: f64) -> Self {
        Self {
            satellite_id: satellite_id.map(str::to_string),
            status: PlanStatus::NoAction,
            burns: Vec::new(),
            total_delta_v: 0.0,
            expected_risk_reduction: 0.0,
            fuel_budget,
            notes: Some("No actionable threats supplied.".to_string()),
        }
    }
}

fn burn_for(index: usize, threat: &Threat) -> Burn {
    let tca = threat.time_to_ca;
    let probability = threat.probability;
    let urgency = (600.0 / tca.max(60.0)).max(1.0);
    let delta_v = round_to(
        (0.05 * urgency + 0.2 * probability).min(MAX_BURN_DELTA_V),
        3,
    );

    Burn {
        id: Uuid::new_v4(),
        axis: if index % 2 == 0 {
            BurnAxis::RadialOut
        } else {
            BurnAxis::AlongTrack
        },
        delta_v,
        execute_in: (tca - LEAD_TIME_SECONDS).max(MIN_EXECUTE_IN_SECONDS),
        objective: format!(
            "Open miss distance vs {}",
            threat.debris_id.as_deref().unwrap_or("UNKNOWN")
        ),
        expected_risk_drop: round_to(0.6 * probability, 2),
    }
}

/// Scales burns proportionally when their sum exceeds `fuel_budget`.
/// Returns the resulting total, which equals the budget when scaling applied.
pub fn scale_to_budget(burns: &mut [Burn], fuel_budget: f64) -> f64 {
    let budget = fuel_budget.max(0.0);
    let total: f64 = burns.iter().map(|b| b.delta_v).sum();

    if total > budget {
        let ratio = if total > 0.0 { budget / total } else { 0.0 };
        debug!("Scaling {} burns by {:.4} to fit budget {}", burns.len(), ratio, budget);
        for burn in burns.iter_mut() {
            burn.delta_v *= ratio;
        }
        budget
    } else {
        round_to(total, 3)
    }
}

pub fn plan_avoidance_maneuver(
    satellite_id: Option<&str>,
    threats: &[Threat],
    fuel_budget: f64,
) -> ManeuverPlan {
    let fuel_budget = fuel_budget.max(0.0);
    let satellite_id = satellite_id.map(str::trim).filter(|id| !id.is_empty());

    let Some(sat) = satellite_id else {
        return ManeuverPlan::no_action(None, fuel_budget);
    };
    if threats.is_empty() {
        return ManeuverPlan::no_action(Some(sat), fuel_budget);
    }

    let mut burns: Vec<Burn> = threats
        .iter()
        .enumerate()
        .map(|(i, threat)| burn_for(i, threat))
        .collect();

    // aggregate uses pre-scaling drops
    let expected_risk_reduction = round_to(burns.iter().map(|b| b.expected_risk_drop).sum(), 2);
    let total_delta_v = scale_to_budget(&mut burns, fuel_budget);

    info!(
        "Planned {} burns for {} (Δv {:.3} of budget {})",
        burns.len(),
        sat,
        total_delta_v,
        fuel_budget
    );

    ManeuverPlan {
        satellite_id: Some(sat.to_string()),
        status: PlanStatus::Planned,
        burns,
        total_delta_v,
        expected_risk_reduction,
        fuel_budget,
        notes: None,
    }
}
