//! SGP4 propagation gateway
//!
//! Element sets are parsed once into a [`TleOrbit`]; every subsequent call
//! only runs the propagator for the requested instant.

use super::*;

/// A parsed two-line element set ready for repeated propagation
pub struct TleOrbit {
    elements: sgp4::Elements,
    constants: sgp4::Constants,
    epoch: DateTime<Utc>,
}

impl std::fmt::Debug for TleOrbit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TleOrbit")
            .field("norad_id", &self.elements.norad_id)
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl TleOrbit {
    pub fn from_lines(tle_line1: &str, tle_line2: &str) -> Result<Self> {
        let elements = sgp4::Elements::from_tle(
            None,
            tle_line1.trim().as_bytes(),
            tle_line2.trim().as_bytes(),
        )
        .map_err(|e| OrbitalError::InvalidTle(format!("{:?}", e)))?;

        let constants = sgp4::Constants::from_elements(&elements)
            .map_err(|e| OrbitalError::PropagationFailed(format!("{:?}", e)))?;

        let epoch = DateTime::<Utc>::from_naive_utc_and_offset(elements.datetime, Utc);

        Ok(Self {
            elements,
            constants,
            epoch,
        })
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn norad_id(&self) -> u64 {
        self.elements.norad_id
    }
}

impl Ephemeris for TleOrbit {
    fn state_at(&self, time: DateTime<Utc>) -> Result<StateVector> {
        let minutes_since_epoch =
            time.signed_duration_since(self.epoch).num_milliseconds() as f64 / 60_000.0;

        let prediction = self
            .constants
            .propagate(minutes_since_epoch)
            .map_err(|e| OrbitalError::PropagationFailed(format!("{:?}", e)))?;

        let position = Cartesian::from(prediction.position);
        let velocity = Cartesian::from(prediction.velocity);

        if !position.magnitude().is_finite() || !velocity.magnitude().is_finite() {
            return Err(OrbitalError::PropagationFailed(format!(
                "non-finite state for {} at {}",
                self.elements.norad_id, time
            )));
        }

        Ok(StateVector {
            position,
            velocity,
            epoch: time,
        })
    }
}

/// One-shot propagation straight from element lines
pub fn sgp4_propagate(
    tle_line1: &str,
    tle_line2: &str,
    time: DateTime<Utc>,
) -> Result<StateVector> {
    TleOrbit::from_lines(tle_line1, tle_line2)?.state_at(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const ISS_LINE1: &str = "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992";
    const ISS_LINE2: &str = "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

    #[test]
    fn test_iss_state_at_epoch() {
        let orbit = TleOrbit::from_lines(ISS_LINE1, ISS_LINE2).unwrap();
        assert_eq!(orbit.norad_id(), 25544);

        let state = orbit.state_at(orbit.epoch()).unwrap();
        let radius = state.position.magnitude();
        let speed = state.velocity.magnitude();

        // ~420 km LEO
        assert!(radius > 6700.0 && radius < 6850.0, "radius {}", radius);
        assert!(speed > 7.4 && speed < 7.9, "speed {}", speed);
    }

    #[test]
    fn test_state_epoch_matches_request() {
        let orbit = TleOrbit::from_lines(ISS_LINE1, ISS_LINE2).unwrap();
        let t = orbit.epoch() + Duration::minutes(90);
        let state = orbit.state_at(t).unwrap();
        assert_eq!(state.epoch, t);
    }

    #[test]
    fn test_invalid_tle_rejected() {
        let result = TleOrbit::from_lines("1 garbage", "2 garbage");
        assert!(matches!(result, Err(OrbitalError::InvalidTle(_))));
    }

    #[test]
    fn test_one_shot_propagate() {
        let orbit = TleOrbit::from_lines(ISS_LINE1, ISS_LINE2).unwrap();
        let state = sgp4_propagate(ISS_LINE1, ISS_LINE2, orbit.epoch()).unwrap();
        assert!(state.position.magnitude() > EARTH_RADIUS_KM);
    }
}
