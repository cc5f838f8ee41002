//! Orbital Mechanics Library
//!
//! SGP4 propagation gateway, closed-form circular orbits for sandbox
//! scenarios, and the state-vector types shared by screening and scoring.
//!
//! Everything that can produce a position for a point in time implements
//! [`Ephemeris`]; screening never cares which propagator sits behind it.

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod circular;
pub mod propagation;
pub mod tle;

pub use circular::CircularOrbit;
pub use propagation::TleOrbit;

/// μ_Earth in km³/s²
pub const MU_EARTH: f64 = 398_600.4418;

/// Mean equatorial radius in km
pub const EARTH_RADIUS_KM: f64 = 6378.137;

#[derive(Error, Debug)]
pub enum OrbitalError {
    #[error("Invalid TLE format: {0}")]
    InvalidTle(String),
    #[error("Propagation failed: {0}")]
    PropagationFailed(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// Cartesian triple in an Earth-centered inertial frame (km or km/s)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cartesian {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Cartesian {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn magnitude(&self) -> f64 {
        self.to_vector().norm()
    }
}

impl From<Vector3<f64>> for Cartesian {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<[f64; 3]> for Cartesian {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Position (km) and velocity (km/s) at a single instant
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StateVector {
    pub position: Cartesian,
    pub velocity: Cartesian,
    pub epoch: DateTime<Utc>,
}

impl StateVector {
    /// Euclidean separation between the two positions in km
    pub fn distance_to(&self, other: &StateVector) -> f64 {
        (self.position.to_vector() - other.position.to_vector()).norm()
    }

    /// Magnitude of the velocity difference in km/s
    pub fn relative_speed(&self, other: &StateVector) -> f64 {
        (self.velocity.to_vector() - other.velocity.to_vector()).norm()
    }
}

/// A source of inertial states. Implementations may fail per call; callers
/// decide whether a failure skips a step or aborts.
pub trait Ephemeris: Send + Sync {
    fn state_at(&self, time: DateTime<Utc>) -> Result<StateVector>;
}

impl<E: Ephemeris + ?Sized> Ephemeris for Arc<E> {
    fn state_at(&self, time: DateTime<Utc>) -> Result<StateVector> {
        (**self).state_at(time)
    }
}

impl<E: Ephemeris + ?Sized> Ephemeris for Box<E> {
    fn state_at(&self, time: DateTime<Utc>) -> Result<StateVector> {
        (**self).state_at(time)
    }
}

/// Resolves an object identity to its state, `None` when the id is unknown
/// or the object cannot be propagated.
pub trait StateLookup {
    fn state_of(&self, id: &str, time: DateTime<Utc>) -> Option<StateVector>;
}

impl<E: Ephemeris> StateLookup for HashMap<String, E> {
    fn state_of(&self, id: &str, time: DateTime<Utc>) -> Option<StateVector> {
        self.get(id)?.state_at(time).ok()
    }
}
