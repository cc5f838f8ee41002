//! Time-stepped conjunction screening
//!
//! Brute-force scan: every step propagates the target once and each
//! candidate once, O(steps × candidates), no spatial pruning. Only the
//! closest approach per candidate survives the horizon.

use crate::{within_threshold, CancelFlag, CollisionError, Result, DEFAULT_COLLISION_THRESHOLD_KM};
use chrono::{DateTime, Duration, Utc};
use orbital_mechanics::{Ephemeris, StateVector};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::debug;

/// An object taking part in a screening run
#[derive(Clone, Copy)]
pub struct ScreeningObject<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub ephemeris: &'a dyn Ephemeris,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConjunctionEvent {
    pub target_id: String,
    pub candidate_id: String,
    pub candidate_name: String,
    pub time: DateTime<Utc>,
    pub distance_km: f64,
    pub target_state: StateVector,
    pub candidate_state: StateVector,
}

#[derive(Debug, Clone)]
pub struct ConjunctionScreener {
    threshold_km: f64,
    horizon: Duration,
    step_seconds: u32,
    top_n: usize,
}

impl Default for ConjunctionScreener {
    fn default() -> Self {
        Self {
            threshold_km: DEFAULT_COLLISION_THRESHOLD_KM,
            horizon: Duration::hours(156),
            step_seconds: 60,
            top_n: 10,
        }
    }
}

impl ConjunctionScreener {
    pub fn new(threshold_km: f64, horizon: Duration, step_seconds: u32, top_n: usize) -> Self {
        Self {
            threshold_km,
            horizon,
            step_seconds: step_seconds.max(1),
            top_n,
        }
    }

    pub fn threshold_km(&self) -> f64 {
        self.threshold_km
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn step_count(&self) -> usize {
        (self.horizon.num_seconds().max(0) / self.step_seconds as i64) as usize
    }

    /// Ranked closest approaches of `candidates` against `target` starting
    /// at `start`. Steps where either side fails to propagate are skipped;
    /// a target that never propagates yields an empty list.
    pub fn predict_conjunctions(
        &self,
        target: &ScreeningObject<'_>,
        candidates: &[ScreeningObject<'_>],
        start: DateTime<Utc>,
    ) -> Vec<ConjunctionEvent> {
        self.predict_conjunctions_until(target, candidates, start, &CancelFlag::new())
            .unwrap_or_default()
    }

    /// [`Self::predict_conjunctions`] that stops with
    /// [`CollisionError::Cancelled`] once `cancel` is raised. Checked before
    /// every step.
    pub fn predict_conjunctions_until(
        &self,
        target: &ScreeningObject<'_>,
        candidates: &[ScreeningObject<'_>],
        start: DateTime<Utc>,
        cancel: &CancelFlag,
    ) -> Result<Vec<ConjunctionEvent>> {
        let steps = self.step_count();
        debug!(
            "Screening {} for {} steps against {} candidates",
            target.id,
            steps,
            candidates.len()
        );

        let mut closest: HashMap<&str, ConjunctionEvent> = HashMap::new();
        let mut target_steps = 0usize;

        for i in 0..steps {
            if cancel.is_cancelled() {
                debug!("Screening {} cancelled at step {} of {}", target.id, i, steps);
                return Err(CollisionError::Cancelled);
            }
            let time = start + Duration::seconds(i as i64 * self.step_seconds as i64);

            let Ok(target_state) = target.ephemeris.state_at(time) else {
                continue;
            };
            target_steps += 1;

            for candidate in candidates {
                if candidate.id == target.id {
                    continue;
                }
                let Ok(candidate_state) = candidate.ephemeris.state_at(time) else {
                    continue;
                };

                let distance = target_state.distance_to(&candidate_state);
                if !within_threshold(distance, self.threshold_km) {
                    continue;
                }

                let event = || ConjunctionEvent {
                    target_id: target.id.to_string(),
                    candidate_id: candidate.id.to_string(),
                    candidate_name: candidate.name.to_string(),
                    time,
                    distance_km: distance,
                    target_state,
                    candidate_state,
                };

                match closest.entry(candidate.id) {
                    Entry::Occupied(mut best) => {
                        // strict: the first occurrence of a minimum wins
                        if distance < best.get().distance_km {
                            best.insert(event());
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(event());
                    }
                }
            }
        }

        if target_steps == 0 && steps > 0 {
            debug!("Target {} could not be propagated at any step", target.id);
        }

        Ok(rank_events(closest.into_values().collect(), self.top_n))
    }
}

/// Ascending distance, ties broken by candidate id, truncated to `top_n`
pub fn rank_events(mut events: Vec<ConjunctionEvent>, top_n: usize) -> Vec<ConjunctionEvent> {
    events.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });
    events.truncate(top_n);
    events
}
