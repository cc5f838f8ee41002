use chrono::{DateTime, Duration, Utc};
use collision_avoidance::{
    classify_severity, plan_avoidance_maneuver, ConjunctionScreener, ScreeningObject, Severity,
    Threat,
};
use orbital_mechanics::{Cartesian, Ephemeris, OrbitalError, StateVector};
use proptest::prelude::*;

/// Point on the x axis, `offset` km from the target, optionally dropping out
struct Offset {
    offset: f64,
    gap_every: Option<i64>,
    start: DateTime<Utc>,
}

impl Ephemeris for Offset {
    fn state_at(&self, time: DateTime<Utc>) -> orbital_mechanics::Result<StateVector> {
        let step = (time - self.start).num_seconds() / 60;
        if let Some(n) = self.gap_every {
            if step % n == 0 {
                return Err(OrbitalError::PropagationFailed("gap".into()));
            }
        }
        // drifts 0.5 km per step so the minimum sits at step 0 or 1
        let d = self.offset + 0.5 * step as f64;
        Ok(StateVector {
            position: Cartesian::new(7000.0 + d, 0.0, 0.0),
            velocity: Cartesian::default(),
            epoch: time,
        })
    }
}

fn threat_strategy() -> impl Strategy<Value = Threat> {
    (0.0f64..=1.0, 0.0f64..100_000.0).prop_map(|(probability, tca)| Threat {
        debris_id: Some("DEB".to_string()),
        probability,
        time_to_ca: tca,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    // Budget: total Δv never exceeds max(budget, 0)
    #[test]
    fn fuzz_total_delta_v_within_budget(
        threats in prop::collection::vec(threat_strategy(), 0..40),
        budget in -10.0f64..20.0,
    ) {
        let plan = plan_avoidance_maneuver(Some("SAT"), &threats, budget);
        let cap = budget.max(0.0);
        prop_assert!(plan.total_delta_v <= cap + 1e-9);

        let sum: f64 = plan.burns.iter().map(|b| b.delta_v).sum();
        prop_assert!(sum <= cap + 1e-9);
        prop_assert!(plan.burns.iter().all(|b| b.delta_v >= 0.0 && b.delta_v <= 0.5));
    }

    // Severity: total over [0,1] and monotone
    #[test]
    fn fuzz_severity_monotone(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(classify_severity(lo) <= classify_severity(hi));
        if hi >= 0.75 {
            prop_assert_eq!(classify_severity(hi), Severity::Critical);
        }
    }

    // Screening: at most min(M, topN) events, all strictly inside the threshold, sorted
    #[test]
    fn fuzz_screening_bounds(
        offsets in prop::collection::vec((0.0f64..30.0, prop::option::of(2i64..5)), 0..25),
        top_n in 1usize..12,
    ) {
        let start = Utc::now();
        let target = Offset { offset: 0.0, gap_every: None, start };
        let objects: Vec<Offset> = offsets
            .iter()
            .map(|(offset, gap_every)| Offset { offset: *offset, gap_every: *gap_every, start })
            .collect();
        let ids: Vec<String> = (0..objects.len()).map(|i| format!("OBJ-{:02}", i)).collect();
        let candidates: Vec<ScreeningObject> = objects
            .iter()
            .zip(&ids)
            .map(|(o, id)| ScreeningObject { id, name: id, ephemeris: o })
            .collect();

        let screener = ConjunctionScreener::new(10.0, Duration::minutes(6), 60, top_n);
        let events = screener.predict_conjunctions(
            &ScreeningObject { id: "TARGET", name: "TARGET", ephemeris: &target },
            &candidates,
            start,
        );

        prop_assert!(events.len() <= candidates.len().min(top_n));
        for pair in events.windows(2) {
            prop_assert!(pair[0].distance_km <= pair[1].distance_km);
        }
        for event in &events {
            prop_assert!(event.distance_km < 10.0);
            prop_assert_ne!(event.candidate_id.as_str(), "TARGET");
        }
    }
}
