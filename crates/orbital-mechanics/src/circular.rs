//! Closed-form circular orbits
//!
//! Used by sandbox scenarios and the static demo dataset where no accredited
//! element set exists. The in-plane position is rotated by inclination about
//! the x axis, then by RAAN about the z axis.

use super::*;
use nalgebra::Rotation3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircularOrbit {
    pub radius_km: f64,
    pub inclination_rad: f64,
    pub raan_rad: f64,
    /// Argument of latitude at `epoch`
    pub phase_rad: f64,
    pub epoch: DateTime<Utc>,
}

impl CircularOrbit {
    pub fn from_radius(
        radius_km: f64,
        inclination_rad: f64,
        raan_rad: f64,
        phase_rad: f64,
        epoch: DateTime<Utc>,
    ) -> Self {
        Self {
            radius_km,
            inclination_rad,
            raan_rad,
            phase_rad,
            epoch,
        }
    }

    /// Altitude above the equatorial radius; angles in degrees except phase
    pub fn from_altitude(
        altitude_km: f64,
        inclination_deg: f64,
        raan_deg: f64,
        phase_rad: f64,
        epoch: DateTime<Utc>,
    ) -> Self {
        Self::from_radius(
            EARTH_RADIUS_KM + altitude_km,
            inclination_deg.to_radians(),
            raan_deg.to_radians(),
            phase_rad,
            epoch,
        )
    }

    /// n = sqrt(μ/r³) in rad/s
    pub fn angular_velocity(&self) -> f64 {
        (MU_EARTH / self.radius_km.powi(3)).sqrt()
    }

    pub fn period_seconds(&self) -> f64 {
        2.0 * std::f64::consts::PI / self.angular_velocity()
    }

    /// State `seconds` after the orbit epoch
    pub fn state_after(&self, seconds: f64) -> Result<StateVector> {
        if !(self.radius_km.is_finite() && self.radius_km > 0.0) {
            return Err(OrbitalError::PropagationFailed(format!(
                "non-positive orbital radius {}",
                self.radius_km
            )));
        }

        let n = self.angular_velocity();
        let u = self.phase_rad + n * seconds;
        let r = self.radius_km;
        let speed = r * n;

        let in_plane_pos = Vector3::new(r * u.cos(), r * u.sin(), 0.0);
        let in_plane_vel = Vector3::new(-speed * u.sin(), speed * u.cos(), 0.0);

        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), self.raan_rad)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), self.inclination_rad);

        let epoch = self.epoch
            + chrono::Duration::milliseconds((seconds * 1000.0).round() as i64);

        Ok(StateVector {
            position: (rotation * in_plane_pos).into(),
            velocity: (rotation * in_plane_vel).into(),
            epoch,
        })
    }
}

impl Ephemeris for CircularOrbit {
    fn state_at(&self, time: DateTime<Utc>) -> Result<StateVector> {
        let seconds = time.signed_duration_since(self.epoch).num_milliseconds() as f64 / 1000.0;
        let mut state = self.state_after(seconds)?;
        state.epoch = time;
        Ok(state)
    }
}
