//! Ingestion state machine and the shared live catalog
//!
//! ```text
//! UNINITIALIZED ─refresh─▶ LIVE           primary answered
//!                        ▶ LIVE-FALLBACK  a later source answered
//!                        ▶ CACHED         every source failed, cache hit
//!                        ▶ ERROR          every source failed, no cache
//! ```
//!
//! The catalog and its status travel together in one [`CatalogSnapshot`]
//! behind an `Arc`. A refresh builds a complete new snapshot off-lock and
//! swaps it in, so readers see either the old catalog or the new one.

use crate::cache::CatalogCache;
use crate::normalize::{normalize_records, rehydrate};
use crate::sources::CatalogSource;
use crate::{CatalogEntry, IngestError, IngestionState, IngestionStatus, SourceTag, TrackedObject};
use chrono::{DateTime, Utc};
use orbital_mechanics::{Cartesian, Ephemeris, StateLookup, StateVector};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Immutable catalog + status pair
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
    status: IngestionStatus,
}

impl CatalogSnapshot {
    pub fn new(entries: Vec<CatalogEntry>, mut status: IngestionStatus) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.object.id.clone(), i))
            .collect();
        status.live_count = entries.len();
        Self {
            entries,
            index,
            status,
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn status(&self) -> &IngestionStatus {
        &self.status
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&CatalogEntry> {
        self.index.get(id.trim()).map(|&i| &self.entries[i])
    }
}

impl StateLookup for CatalogSnapshot {
    fn state_of(&self, id: &str, time: DateTime<Utc>) -> Option<StateVector> {
        self.find(id)?.orbit.state_at(time).ok()
    }
}

/// Catalog entry propagated to a requested instant
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSatellite {
    pub id: String,
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub epoch: DateTime<Utc>,
    pub source: SourceTag,
    pub position: Cartesian,
    pub velocity: Cartesian,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl LiveSatellite {
    fn from_state(object: &TrackedObject, state: StateVector) -> Self {
        Self {
            id: object.id.clone(),
            name: object.name.clone(),
            line1: object.line1.clone(),
            line2: object.line2.clone(),
            epoch: object.epoch,
            source: object.source,
            position: state.position,
            velocity: state.velocity,
            kind: match object.classification {
                crate::ObjectClass::Satellite => "SATELLITE",
                crate::ObjectClass::Debris => "DEBRIS",
            },
        }
    }
}

pub struct IngestionService {
    sources: Vec<Arc<dyn CatalogSource>>,
    cache: Option<Arc<dyn CatalogCache>>,
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl IngestionService {
    /// `sources` are tried in order; the first is the primary
    pub fn new(sources: Vec<Arc<dyn CatalogSource>>, cache: Option<Arc<dyn CatalogCache>>) -> Self {
        Self {
            sources,
            cache,
            current: RwLock::new(Arc::new(CatalogSnapshot::default())),
        }
    }

    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current.read().await.clone()
    }

    pub async fn status(&self) -> IngestionStatus {
        self.snapshot().await.status().clone()
    }

    pub async fn find(&self, id: &str) -> Option<CatalogEntry> {
        self.snapshot().await.find(id).cloned()
    }

    async fn publish(&self, snapshot: CatalogSnapshot) {
        *self.current.write().await = Arc::new(snapshot);
    }

    /// Runs the full source chain once. Never fails; the outcome is the
    /// resulting state and is also recorded in the status.
    pub async fn refresh(&self) -> IngestionState {
        let attempt = Utc::now();
        let previous = self.snapshot().await;
        // every reason a source was passed over, in chain order
        let mut failures: Vec<String> = Vec::new();
        // network and auth failures only; payload trouble goes to `parse_error`
        let mut network_failures: Vec<String> = Vec::new();
        let mut parse_error: Option<String> = None;

        for (position, source) in self.sources.iter().enumerate() {
            let tag = source.tag();
            let entries = match source.fetch().await {
                Ok(raw) => normalize_records(raw, tag),
                Err(e @ IngestError::Parse(_)) => {
                    warn!("Catalog source {} sent an unreadable payload: {}", tag, e);
                    let reason = format!("{} payload: {}", tag, e);
                    failures.push(reason.clone());
                    parse_error = Some(reason);
                    continue;
                }
                Err(e) => {
                    warn!("Catalog source {} failed: {}", tag, e);
                    failures.push(e.to_string());
                    network_failures.push(e.to_string());
                    continue;
                }
            };

            if entries.is_empty() {
                warn!("Catalog source {} returned no usable element sets", tag);
                let reason = format!("{} returned no usable element sets", tag);
                failures.push(reason.clone());
                network_failures.push(reason);
                continue;
            }

            let state = if position == 0 {
                IngestionState::Live
            } else {
                IngestionState::LiveFallback
            };
            let cache_error = self.persist(&entries).await.or(parse_error);

            info!("Catalog refreshed from {}: {} objects ({:?})", tag, entries.len(), state);

            self.publish(CatalogSnapshot::new(
                entries,
                IngestionStatus {
                    state,
                    last_refresh: Some(attempt),
                    last_attempt: Some(attempt),
                    last_source: tag,
                    fallback_reason: failures.first().cloned(),
                    error: None,
                    cache_error,
                    live_count: 0,
                },
            ))
            .await;
            return state;
        }

        let fatal = if !network_failures.is_empty() {
            network_failures.join("; ")
        } else if parse_error.is_some() {
            "every catalog source sent an unreadable payload".to_string()
        } else {
            "no catalog sources configured".to_string()
        };
        error!("All catalog sources failed: {}", fatal);

        let mut status = previous.status().clone();
        status.last_attempt = Some(attempt);
        status.fallback_reason = failures.first().cloned();
        status.error = Some(fatal);
        status.cache_error = parse_error.clone();

        match self.restore_from_cache().await {
            Ok(Some(entries)) => {
                info!("Catalog restored from cache: {} objects", entries.len());
                status.state = IngestionState::Cached;
                status.last_source = SourceTag::Cache;
                self.publish(CatalogSnapshot::new(entries, status)).await;
                IngestionState::Cached
            }
            outcome => {
                if let Err(e) = outcome {
                    warn!("Catalog cache unavailable: {}", e);
                    status.cache_error = Some(match parse_error {
                        Some(parse) => format!("{}; {}", parse, e),
                        None => e.to_string(),
                    });
                }
                // stale over none: keep whatever was live before
                status.state = IngestionState::Error;
                self.publish(CatalogSnapshot::new(previous.entries().to_vec(), status))
                    .await;
                IngestionState::Error
            }
        }
    }

    async fn persist(&self, entries: &[CatalogEntry]) -> Option<String> {
        let cache = self.cache.as_ref()?;
        let objects: Vec<TrackedObject> = entries.iter().map(|e| e.object.clone()).collect();
        match cache.store(&objects).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to persist catalog snapshot: {}", e);
                Some(e.to_string())
            }
        }
    }

    async fn restore_from_cache(&self) -> crate::Result<Option<Vec<CatalogEntry>>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        let Some(objects) = cache.load().await? else {
            return Ok(None);
        };

        let entries: Vec<CatalogEntry> = rehydrate(objects)
            .into_iter()
            .map(|mut entry| {
                entry.object.source = SourceTag::Cache;
                entry
            })
            .collect();
        Ok((!entries.is_empty()).then_some(entries))
    }

    /// Up to `limit` entries propagated to `as_of`. `None` when the catalog
    /// is empty so callers can fall back to static data; entries that fail
    /// to propagate are dropped.
    pub async fn live_satellites(
        &self,
        limit: usize,
        as_of: DateTime<Utc>,
    ) -> Option<Vec<LiveSatellite>> {
        let snapshot = self.snapshot().await;
        if snapshot.is_empty() {
            return None;
        }

        Some(
            snapshot
                .entries()
                .iter()
                .take(limit)
                .filter_map(|entry| {
                    let state = entry.orbit.state_at(as_of).ok()?;
                    Some(LiveSatellite::from_state(&entry.object, state))
                })
                .collect(),
        )
    }

    /// Refresh on a fixed interval for the life of the process. The first
    /// tick fires immediately.
    pub fn spawn_refresh_loop(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let state = self.refresh().await;
                if state == IngestionState::Error {
                    warn!("Catalog refresh ended in ERROR; serving previous catalog");
                }
            }
        })
    }
}
