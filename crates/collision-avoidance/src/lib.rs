//! Collision Avoidance Library
//!
//! Conjunction screening over propagated trajectories, the heuristic
//! conjunction risk model, and fuel-constrained avoidance maneuver planning.
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Screening | [`screening`] | closest approach per candidate, ranked |
//! | Sandbox | [`sandbox`] | frames + every conjunction, circular orbits |
//! | Scoring | [`risk`] | probability, severity, confidence |
//! | Planning | [`maneuver`] | burn list within the fuel budget |

use orbital_mechanics::OrbitalError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub mod maneuver;
pub mod risk;
pub mod sandbox;
pub mod screening;

pub use maneuver::{
    plan_avoidance_maneuver, scale_to_budget, Burn, BurnAxis, ManeuverPlan, PlanStatus, Threat,
};
pub use risk::{
    classify_severity, derive_confidence, model_info, score_collision_risk, Confidence, ModelInfo,
    RiskAssessment, RiskFeatures, RiskRequest, SensorQuality,
};
pub use sandbox::{
    run_sandbox_scenario, run_sandbox_scenario_until, SandboxOrbit, SandboxRequest, SandboxRun,
};
pub use screening::{ConjunctionEvent, ConjunctionScreener, ScreeningObject};

/// Default screening distance in km
pub const DEFAULT_COLLISION_THRESHOLD_KM: f64 = 10.0;

#[derive(Error, Debug)]
pub enum CollisionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Propagation(#[from] OrbitalError),
    #[error("Computation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CollisionError>;

/// Severity ladder, lowest to highest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Negligible,
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Negligible => "NEGLIGIBLE",
            Severity::Low => "LOW",
            Severity::Moderate => "MODERATE",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

/// Cooperative stop signal for long screening and sandbox runs. Clones
/// share the flag; workers poll it once per time step.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Shared by screening and sandbox runs
pub(crate) fn within_threshold(distance_km: f64, threshold_km: f64) -> bool {
    distance_km < threshold_km
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
