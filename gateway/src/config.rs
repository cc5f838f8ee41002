//! Process configuration. Every flag can also come from the environment.

use anyhow::{anyhow, bail, Result};
use catalog_ingest::sources::{CELESTRAK_ACTIVE_URL, SPACE_TRACK_BASE};
use catalog_ingest::SpaceTrackCredentials;
use clap::Parser;
use collision_avoidance::maneuver::DEFAULT_FUEL_BUDGET;
use collision_avoidance::{ConjunctionScreener, DEFAULT_COLLISION_THRESHOLD_KM};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "conjunction-gateway",
    version,
    about = "Conjunction screening, risk scoring and alerting API"
)]
pub struct Config {
    /// Listen port
    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Minutes between catalog refreshes
    #[arg(long, env = "TLE_REFRESH_MINUTES", default_value_t = 15)]
    pub refresh_minutes: u64,

    /// Primary source (three-line text)
    #[arg(long, env = "CELESTRAK_URL", default_value = CELESTRAK_ACTIVE_URL)]
    pub celestrak_url: String,

    #[arg(long, env = "SPACETRACK_URL", default_value = SPACE_TRACK_BASE)]
    pub spacetrack_url: String,

    #[arg(long, env = "SPACETRACK_USER")]
    pub spacetrack_user: Option<String>,

    #[arg(long, env = "SPACETRACK_PASS", hide_env_values = true)]
    pub spacetrack_pass: Option<String>,

    /// Catalog snapshot file; no cache when unset
    #[arg(long, env = "CATALOG_CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    #[arg(long, env = "CATALOG_CACHE_TTL_SECONDS", default_value_t = catalog_ingest::cache::DEFAULT_CACHE_TTL_SECONDS)]
    pub cache_ttl_seconds: i64,

    /// Per-request timeout for catalog sources
    #[arg(long, env = "SOURCE_TIMEOUT_SECONDS", default_value_t = 8)]
    pub source_timeout_seconds: u64,

    /// Default Δv budget for maneuver plans (km/s)
    #[arg(long, env = "FUEL_BUDGET", default_value_t = DEFAULT_FUEL_BUDGET)]
    pub fuel_budget: f64,

    #[arg(long, env = "COLLISION_THRESHOLD_KM", default_value_t = DEFAULT_COLLISION_THRESHOLD_KM)]
    pub collision_threshold_km: f64,

    #[arg(long, env = "PREDICTION_WINDOW_HOURS", default_value_t = 156.0)]
    pub prediction_window_hours: f64,

    #[arg(long, env = "PREDICTION_STEP_SECONDS", default_value_t = 60)]
    pub prediction_step_seconds: u32,

    #[arg(long, env = "SCREENING_TOP_N", default_value_t = 10)]
    pub screening_top_n: usize,

    /// Hard deadline for screening and sandbox runs
    #[arg(long, env = "SCREENING_DEADLINE_SECONDS", default_value_t = 30)]
    pub screening_deadline_seconds: u64,

    /// Keplerian demo dataset
    #[arg(long, env = "STATIC_DATA_PATH", default_value = "data/orbitalData.json")]
    pub static_data_path: PathBuf,

    /// Max entries returned by the live listing
    #[arg(long, env = "LIVE_LIMIT", default_value_t = 500)]
    pub live_limit: usize,
}

impl Config {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_minutes.max(1) * 60)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_seconds)
    }

    pub fn screening_deadline(&self) -> Duration {
        Duration::from_secs(self.screening_deadline_seconds)
    }

    pub fn cache_ttl(&self) -> Result<chrono::Duration> {
        chrono::Duration::try_seconds(self.cache_ttl_seconds).ok_or_else(|| {
            anyhow!(
                "CATALOG_CACHE_TTL_SECONDS out of range: {}",
                self.cache_ttl_seconds
            )
        })
    }

    /// `None` unless both halves are present
    pub fn spacetrack_credentials(&self) -> Option<SpaceTrackCredentials> {
        match (&self.spacetrack_user, &self.spacetrack_pass) {
            (Some(identity), Some(password)) if !identity.is_empty() && !password.is_empty() => {
                Some(SpaceTrackCredentials {
                    identity: identity.clone(),
                    password: password.clone(),
                })
            }
            _ => None,
        }
    }

    pub fn screener(&self) -> Result<ConjunctionScreener> {
        let hours = self.prediction_window_hours;
        if !hours.is_finite() || hours < 0.0 {
            bail!("PREDICTION_WINDOW_HOURS must be a non-negative number, got {}", hours);
        }
        let horizon = chrono::Duration::try_minutes((hours * 60.0).round() as i64)
            .ok_or_else(|| anyhow!("PREDICTION_WINDOW_HOURS out of range: {}", hours))?;

        Ok(ConjunctionScreener::new(
            self.collision_threshold_km,
            horizon,
            self.prediction_step_seconds,
            self.screening_top_n,
        ))
    }
}
