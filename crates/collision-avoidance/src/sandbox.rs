//! Synthetic-orbit scenarios
//!
//! Same pairwise threshold test as [`crate::screening`], but positions come
//! from [`CircularOrbit`] kinematics and every close pair at every step is
//! reported, not just the closest approach.

use crate::{round_to, within_threshold, CancelFlag, CollisionError, Result};
use chrono::Utc;
use orbital_mechanics::{Cartesian, CircularOrbit};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MIN_SANDBOX_STEPS: usize = 5;
pub const MAX_SANDBOX_STEPS: usize = 20_000;

fn default_mode() -> String {
    "SIMULATION".to_string()
}

fn default_duration() -> f64 {
    60.0
}

fn default_step() -> f64 {
    60.0
}

fn default_altitude() -> f64 {
    550.0
}

fn default_inclination() -> f64 {
    53.0
}

/// User-authored circular orbit. Angles in degrees, `phase` in radians.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxOrbit {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_altitude")]
    pub altitude: f64,
    #[serde(default = "default_inclination")]
    pub inclination: f64,
    #[serde(default)]
    pub raan: f64,
    #[serde(default)]
    pub phase: f64,
    #[serde(default)]
    pub collision_radius: Option<f64>,
}

impl Default for SandboxOrbit {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            altitude: default_altitude(),
            inclination: default_inclination(),
            raan: 0.0,
            phase: 0.0,
            collision_radius: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxRequest {
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub satellites: Vec<SandboxOrbit>,
    #[serde(default = "default_duration")]
    pub duration_minutes: f64,
    #[serde(default = "default_step")]
    pub step_seconds: f64,
}

impl Default for SandboxRequest {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            satellites: Vec::new(),
            duration_minutes: default_duration(),
            step_seconds: default_step(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FramePosition {
    pub id: String,
    pub name: String,
    pub position: Cartesian,
}

/// `time` is seconds since scenario start
#[derive(Debug, Clone, Serialize)]
pub struct SandboxFrame {
    pub time: f64,
    pub positions: Vec<FramePosition>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SandboxEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub time: f64,
    pub distance: f64,
    pub actors: [String; 2],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxSummary {
    pub duration_minutes: f64,
    pub steps: usize,
    pub satellites: usize,
    pub conjunctions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SandboxRun {
    pub mode: String,
    pub frames: Vec<SandboxFrame>,
    pub events: Vec<SandboxEvent>,
    pub summary: SandboxSummary,
}

impl SandboxRequest {
    /// `max(5, floor(duration·60 / step))`
    pub fn step_count(&self) -> Result<usize> {
        if !(self.step_seconds.is_finite() && self.step_seconds > 0.0) {
            return Err(CollisionError::InvalidInput(format!(
                "stepSeconds must be positive, got {}",
                self.step_seconds
            )));
        }
        if !self.duration_minutes.is_finite() {
            return Err(CollisionError::InvalidInput(
                "durationMinutes must be finite".into(),
            ));
        }

        let raw = (self.duration_minutes * 60.0 / self.step_seconds).floor();
        let steps = if raw > 0.0 { raw as usize } else { 0 }.max(MIN_SANDBOX_STEPS);
        if steps > MAX_SANDBOX_STEPS {
            return Err(CollisionError::InvalidInput(format!(
                "scenario needs {} steps, limit is {}",
                steps, MAX_SANDBOX_STEPS
            )));
        }
        Ok(steps)
    }
}

struct Actor {
    id: String,
    name: String,
    orbit: CircularOrbit,
    collision_radius: Option<f64>,
}

pub fn run_sandbox_scenario(request: &SandboxRequest, default_threshold_km: f64) -> Result<SandboxRun> {
    run_sandbox_scenario_until(request, default_threshold_km, &CancelFlag::new())
}

/// Objects that fail to propagate at a step are left out of that step's
/// frame and pair checks only. Stops with [`CollisionError::Cancelled`]
/// once `cancel` is raised.
pub fn run_sandbox_scenario_until(
    request: &SandboxRequest,
    default_threshold_km: f64,
    cancel: &CancelFlag,
) -> Result<SandboxRun> {
    let steps = request.step_count()?;
    let epoch = Utc::now();

    let actors: Vec<Actor> = request
        .satellites
        .iter()
        .enumerate()
        .map(|(index, sat)| Actor {
            id: sat
                .id
                .clone()
                .or_else(|| sat.name.clone())
                .unwrap_or_else(|| format!("SIM-{}", index)),
            name: sat.name.clone().unwrap_or_else(|| format!("Sim-{}", index)),
            orbit: CircularOrbit::from_altitude(sat.altitude, sat.inclination, sat.raan, sat.phase, epoch),
            collision_radius: sat.collision_radius.filter(|r| *r > 0.0),
        })
        .collect();

    debug!(
        "Sandbox run: {} objects, {} steps of {}s",
        actors.len(),
        steps,
        request.step_seconds
    );

    let mut frames = Vec::with_capacity(steps);
    let mut events = Vec::new();

    for i in 0..steps {
        if cancel.is_cancelled() {
            debug!("Sandbox run cancelled at step {} of {}", i, steps);
            return Err(CollisionError::Cancelled);
        }
        let time = i as f64 * request.step_seconds;

        let visible: Vec<(&Actor, Cartesian)> = actors
            .iter()
            .filter_map(|actor| match actor.orbit.state_after(time) {
                Ok(state) => Some((actor, state.position)),
                Err(e) => {
                    debug!("Skipping {} at t={}s: {}", actor.id, time, e);
                    None
                }
            })
            .collect();

        for (a, (actor_a, pos_a)) in visible.iter().enumerate() {
            for (actor_b, pos_b) in &visible[a + 1..] {
                let distance = (pos_a.to_vector() - pos_b.to_vector()).norm();
                let radius = pair_radius(actor_a, actor_b, default_threshold_km);

                if within_threshold(distance, radius) {
                    events.push(SandboxEvent {
                        kind: "CONJUNCTION".to_string(),
                        time,
                        distance: round_to(distance, 2),
                        actors: [actor_a.id.clone(), actor_b.id.clone()],
                    });
                }
            }
        }

        let positions = visible
            .into_iter()
            .map(|(actor, position)| FramePosition {
                id: actor.id.clone(),
                name: actor.name.clone(),
                position,
            })
            .collect();
        frames.push(SandboxFrame { time, positions });
    }

    let summary = SandboxSummary {
        duration_minutes: request.duration_minutes,
        steps,
        satellites: actors.len(),
        conjunctions: events.len(),
    };

    Ok(SandboxRun {
        mode: request.mode.clone(),
        frames,
        events,
        summary,
    })
}

fn pair_radius(a: &Actor, b: &Actor, default_threshold_km: f64) -> f64 {
    match (a.collision_radius, b.collision_radius) {
        (Some(ra), Some(rb)) => ra.max(rb),
        (Some(r), None) | (None, Some(r)) => r,
        (None, None) => default_threshold_km,
    }
}
