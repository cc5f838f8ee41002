//! Catalog Ingestion
//!
//! Acquires the working set of tracked objects and keeps it fresh:
//!
//! | Order | Source | Tag |
//! |-------|--------|-----|
//! | 1 | CelesTrak GP feed (three-line text) | `CELESTRAK` |
//! | 2 | Space-Track `tle_latest` (cookie login) | `SPACE-TRACK` |
//! | 3 | Last good snapshot on disk | `CACHE` |
//!
//! Every refresh runs the whole chain from the top. A failed chain never
//! clears a previously good catalog.

use chrono::{DateTime, Utc};
use orbital_mechanics::TleOrbit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub mod cache;
pub mod normalize;
pub mod service;
pub mod sources;

pub use cache::{CatalogCache, FileCache};
pub use normalize::{normalize_records, RawElementSet};
pub use service::{CatalogSnapshot, IngestionService, LiveSatellite};
pub use sources::{CatalogSource, CelesTrakSource, SpaceTrackCredentials, SpaceTrackSource};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("{tag} unavailable: {reason}")]
    SourceUnavailable { tag: SourceTag, reason: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Cache error: {0}")]
    Cache(String),
}

impl IngestError {
    pub fn unavailable(tag: SourceTag, reason: impl fmt::Display) -> Self {
        Self::SourceUnavailable {
            tag,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    Satellite,
    Debris,
}

/// Which source produced a catalog entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceTag {
    #[serde(rename = "CELESTRAK")]
    Celestrak,
    #[serde(rename = "SPACE-TRACK")]
    SpaceTrack,
    #[serde(rename = "CACHE")]
    Cache,
    #[serde(rename = "STATIC")]
    Static,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Celestrak => "CELESTRAK",
            Self::SpaceTrack => "SPACE-TRACK",
            Self::Cache => "CACHE",
            Self::Static => "STATIC",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ingested object. Immutable; the whole catalog is replaced per refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedObject {
    pub id: String,
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub classification: ObjectClass,
    pub source: SourceTag,
    pub epoch: DateTime<Utc>,
}

/// A tracked object with its element set parsed once for propagation
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub object: TrackedObject,
    pub orbit: Arc<TleOrbit>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IngestionState {
    #[serde(rename = "UNINITIALIZED")]
    Uninitialized,
    #[serde(rename = "LIVE")]
    Live,
    #[serde(rename = "LIVE-FALLBACK")]
    LiveFallback,
    #[serde(rename = "CACHED")]
    Cached,
    #[serde(rename = "ERROR")]
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionStatus {
    pub state: IngestionState,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_source: SourceTag,
    pub fallback_reason: Option<String>,
    pub error: Option<String>,
    /// Cache read/write or source payload parse trouble, kept apart from
    /// network errors
    pub cache_error: Option<String>,
    pub live_count: usize,
}

impl Default for IngestionStatus {
    fn default() -> Self {
        Self {
            state: IngestionState::Uninitialized,
            last_refresh: None,
            last_attempt: None,
            last_source: SourceTag::Static,
            fallback_reason: None,
            error: None,
            cache_error: None,
            live_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&IngestionState::LiveFallback).unwrap(),
            "\"LIVE-FALLBACK\""
        );
        assert_eq!(serde_json::to_string(&SourceTag::SpaceTrack).unwrap(), "\"SPACE-TRACK\"");
        assert_eq!(serde_json::to_string(&ObjectClass::Debris).unwrap(), "\"debris\"");
    }

    #[test]
    fn test_default_status() {
        let status = IngestionStatus::default();
        assert_eq!(status.state, IngestionState::Uninitialized);
        assert_eq!(status.last_source, SourceTag::Static);

        let json = serde_json::to_value(&status).unwrap();
        assert!(json.get("liveCount").is_some());
        assert!(json.get("cacheError").is_some());
    }

    #[test]
    fn test_unavailable_message() {
        let err = IngestError::unavailable(SourceTag::SpaceTrack, "credentials missing");
        assert_eq!(err.to_string(), "SPACE-TRACK unavailable: credentials missing");
    }
}
