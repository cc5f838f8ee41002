//! Keplerian demo dataset
//!
//! Served when the live catalog is empty, and the basis of the legacy
//! hazard endpoints. Radii in km, angles in radians.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticObject {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub radius: f64,
    pub inclination: f64,
    pub raan: f64,
    pub phase: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision_target: Option<String>,
    #[serde(default)]
    pub is_killer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_collision: Option<f64>,
    /// Dataset fields this service does not interpret (`speed`, ...),
    /// passed through unchanged
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticDataset {
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub satellites: Vec<StaticObject>,
    #[serde(default)]
    pub debris: Vec<StaticObject>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticStatus {
    pub generated_at: Option<String>,
    pub satellite_count: usize,
    pub debris_count: usize,
}

/// Ranked hazard in the legacy `/predict-hazard` shape
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hazard {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub debris_name: String,
    pub debris_id: String,
    pub severity: String,
    pub distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_collision: Option<f64>,
    pub time: String,
}

/// Legacy `/collisions` shape
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleHazard {
    pub debris_name: String,
    pub distance: f64,
    pub time: String,
}

impl StaticDataset {
    /// Missing or unreadable files yield an empty dataset
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to load static data from {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str::<StaticDataset>(&raw) {
            Ok(data) => {
                info!(
                    "Loaded static data generated at {}: {} satellites, {} debris",
                    data.generated_at.as_deref().unwrap_or("unknown"),
                    data.satellites.len(),
                    data.debris.len()
                );
                data
            }
            Err(e) => {
                error!("Failed to parse static data {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn status(&self) -> StaticStatus {
        StaticStatus {
            generated_at: self.generated_at.clone(),
            satellite_count: self.satellites.len(),
            debris_count: self.debris.len(),
        }
    }

    pub fn find_satellite(&self, name: &str) -> Option<&StaticObject> {
        self.satellites.iter().find(|s| s.name == name)
    }

    fn killers_of<'a>(&'a self, target: &'a StaticObject) -> impl Iterator<Item = &'a StaticObject> {
        self.debris
            .iter()
            .filter(move |d| d.is_killer && d.target_id.as_deref() == Some(target.id.as_str()))
    }

    /// Collision partner first, then CRITICAL debris, then by distance.
    /// `None` when the target name is unknown.
    pub fn predict_hazards(&self, target_name: &str, now: &str) -> Option<Vec<Hazard>> {
        let target = self.find_satellite(target_name)?;

        let mut hazards: Vec<Hazard> = target
            .collision_target
            .as_deref()
            .and_then(|partner| self.satellites.iter().find(|s| s.id == partner))
            .map(|partner| Hazard {
                kind: "SATELLITE",
                debris_name: partner.name.clone(),
                debris_id: partner.id.clone(),
                severity: "CRITICAL".to_string(),
                distance: 0.05,
                time_to_collision: None,
                time: now.to_string(),
            })
            .into_iter()
            .collect();

        hazards.extend(self.killers_of(target).map(|d| Hazard {
            kind: "DEBRIS",
            debris_name: d.name.clone(),
            debris_id: d.id.clone(),
            severity: d.severity.clone().unwrap_or_else(|| "MODERATE".to_string()),
            distance: d.estimated_distance.unwrap_or(0.1),
            time_to_collision: Some(d.time_to_collision.unwrap_or(3600.0)),
            time: now.to_string(),
        }));

        sort_hazards(&mut hazards);
        Some(hazards)
    }

    pub fn simple_collisions(&self, target_name: &str, now: &str) -> Option<Vec<SimpleHazard>> {
        let target = self.find_satellite(target_name)?;
        Some(
            self.killers_of(target)
                .map(|d| SimpleHazard {
                    debris_name: d.name.clone(),
                    distance: 0.1,
                    time: now.to_string(),
                })
                .collect(),
        )
    }
}

pub fn sort_hazards(hazards: &mut [Hazard]) {
    hazards.sort_by(|a, b| {
        let sat = |h: &Hazard| h.kind != "SATELLITE";
        let critical = |h: &Hazard| h.severity != "CRITICAL";
        sat(a)
            .cmp(&sat(b))
            .then_with(|| critical(a).cmp(&critical(b)))
            .then_with(|| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal))
    });
}
