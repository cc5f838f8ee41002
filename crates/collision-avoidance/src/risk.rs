//! Heuristic conjunction risk model
//!
//! Not a trained model. A weighted linear combination of the features below
//! goes through a logistic with a fixed bias and is clamped to
//! `[0.001, 0.999]`:
//!
//! ```text
//! z = 400/max(tca,60) + 0.6·(rv/10) + 2/max(miss,0.1) + 0.5·(radial+crossTrack) - 4
//! ```
//!
//! Assessments carry the `HEURISTIC` provenance tag so consumers never
//! mistake them for an accredited probability of collision.

use crate::{round_to, Severity};
use chrono::{DateTime, Utc};
use orbital_mechanics::StateLookup;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MODEL_NAME: &str = "logistic-conjunction-heuristic";
pub const MODEL_VERSION: &str = "1.0.0";
pub const PROVENANCE: &str = "HEURISTIC";

const TCA_WEIGHT: f64 = 400.0;
const VELOCITY_WEIGHT: f64 = 0.6;
const MISS_WEIGHT: f64 = 2.0;
const UNCERTAINTY_WEIGHT: f64 = 0.5;
const BIAS: f64 = -4.0;

const MIN_TCA_SECONDS: f64 = 60.0;
const MIN_MISS_KM: f64 = 0.1;
const PROBABILITY_FLOOR: f64 = 0.001;
const PROBABILITY_CEILING: f64 = 0.999;

const DEFAULT_TCA_SECONDS: f64 = 600.0;
const DEFAULT_RELATIVE_VELOCITY: f64 = 3.0;
const DEFAULT_UNCERTAINTY: f64 = 0.1;
const DEFAULT_MISS_KM: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorQuality {
    Low,
    Medium,
    #[default]
    High,
}

impl SensorQuality {
    pub fn baseline(self) -> f64 {
        match self {
            SensorQuality::Low => 0.6,
            SensorQuality::Medium => 0.75,
            SensorQuality::High => 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Inbound scoring request, every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRequest {
    pub satellite_id: Option<String>,
    pub debris_id: Option<String>,
    #[serde(rename = "timeToCA")]
    pub time_to_ca: Option<f64>,
    pub relative_velocity: Option<f64>,
    pub radial_uncertainty: Option<f64>,
    pub cross_track_uncertainty: Option<f64>,
    pub historical_miss_distance: Option<f64>,
    pub sensor_quality: Option<SensorQuality>,
}

/// Fully-defaulted feature vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskFeatures {
    pub time_to_ca: f64,
    pub relative_velocity: f64,
    pub radial_uncertainty: f64,
    pub cross_track_uncertainty: f64,
    pub historical_miss_distance: f64,
    pub sensor_quality: SensorQuality,
}

impl Default for RiskFeatures {
    fn default() -> Self {
        Self {
            time_to_ca: DEFAULT_TCA_SECONDS,
            relative_velocity: DEFAULT_RELATIVE_VELOCITY,
            radial_uncertainty: DEFAULT_UNCERTAINTY,
            cross_track_uncertainty: DEFAULT_UNCERTAINTY,
            historical_miss_distance: DEFAULT_MISS_KM,
            sensor_quality: SensorQuality::High,
        }
    }
}

impl RiskFeatures {
    /// Missing fields take their defaults. `derived_velocity` stands in for
    /// an absent relative velocity before the default does.
    pub fn from_request(request: &RiskRequest, derived_velocity: Option<f64>) -> Self {
        let d = Self::default();
        Self {
            time_to_ca: request.time_to_ca.unwrap_or(d.time_to_ca),
            relative_velocity: request
                .relative_velocity
                .or(derived_velocity)
                .unwrap_or(d.relative_velocity),
            radial_uncertainty: request.radial_uncertainty.unwrap_or(d.radial_uncertainty),
            cross_track_uncertainty: request
                .cross_track_uncertainty
                .unwrap_or(d.cross_track_uncertainty),
            historical_miss_distance: request
                .historical_miss_distance
                .unwrap_or(d.historical_miss_distance),
            sensor_quality: request.sensor_quality.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub satellite_id: Option<String>,
    pub debris_id: Option<String>,
    pub probability: f64,
    pub severity: Severity,
    pub confidence: Confidence,
    #[serde(rename = "timeToCA")]
    pub time_to_ca: f64,
    pub relative_velocity: f64,
    pub source: &'static str,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub provenance: &'static str,
}

pub fn model_info() -> ModelInfo {
    ModelInfo {
        name: MODEL_NAME,
        version: MODEL_VERSION,
        provenance: PROVENANCE,
    }
}

fn logistic(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Unrounded probability for a feature vector
pub fn heuristic_probability(features: &RiskFeatures) -> f64 {
    let z = TCA_WEIGHT / features.time_to_ca.max(MIN_TCA_SECONDS)
        + VELOCITY_WEIGHT * (features.relative_velocity / 10.0)
        + MISS_WEIGHT / features.historical_miss_distance.max(MIN_MISS_KM)
        + UNCERTAINTY_WEIGHT * (features.radial_uncertainty + features.cross_track_uncertainty)
        + BIAS;

    let p = logistic(z);
    if p.is_nan() {
        return PROBABILITY_FLOOR;
    }
    p.clamp(PROBABILITY_FLOOR, PROBABILITY_CEILING)
}

/// Top-down ladder, first match wins
pub fn classify_severity(probability: f64) -> Severity {
    if probability >= 0.75 {
        Severity::Critical
    } else if probability >= 0.45 {
        Severity::High
    } else if probability >= 0.20 {
        Severity::Moderate
    } else if probability >= 0.05 {
        Severity::Low
    } else {
        Severity::Negligible
    }
}

pub fn derive_confidence(probability: f64, sensor_quality: SensorQuality) -> Confidence {
    if probability > 0.8 {
        Confidence::High
    } else if probability > 0.5 {
        if sensor_quality.baseline() > 0.7 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    } else {
        Confidence::Low
    }
}

/// Relative speed of two catalogued objects at `now`.
///
/// Note this is evaluated at the time of the request, not at closest
/// approach, so it understates crossing geometry for distant TCAs.
pub fn estimate_relative_velocity<L: StateLookup + ?Sized>(
    lookup: &L,
    satellite_id: &str,
    debris_id: &str,
    now: DateTime<Utc>,
) -> Option<f64> {
    let sat = lookup.state_of(satellite_id, now)?;
    let debris = lookup.state_of(debris_id, now)?;
    let speed = sat.relative_speed(&debris);
    (speed.is_finite() && speed > 0.0).then_some(speed)
}

pub fn score_collision_risk<L: StateLookup + ?Sized>(
    request: &RiskRequest,
    lookup: &L,
    now: DateTime<Utc>,
) -> RiskAssessment {
    let derived = match (&request.relative_velocity, &request.satellite_id, &request.debris_id) {
        (None, Some(sat), Some(debris)) => estimate_relative_velocity(lookup, sat, debris, now),
        _ => None,
    };
    if derived.is_some() {
        debug!("Derived relative velocity from catalog states: {:?}", derived);
    }

    let features = RiskFeatures::from_request(request, derived);
    let probability = heuristic_probability(&features);

    RiskAssessment {
        satellite_id: request.satellite_id.clone(),
        debris_id: request.debris_id.clone(),
        probability: round_to(probability, 3),
        severity: classify_severity(probability),
        confidence: derive_confidence(probability, features.sensor_quality),
        time_to_ca: features.time_to_ca,
        relative_velocity: round_to(features.relative_velocity, 2),
        source: PROVENANCE,
        generated_at: now,
    }
}
