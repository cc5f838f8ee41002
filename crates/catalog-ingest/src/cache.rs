//! Last-good catalog snapshot

use crate::{IngestError, Result, TrackedObject};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

pub const DEFAULT_CACHE_TTL_SECONDS: i64 = 3600;

/// Stores the most recent normalized catalog for the all-sources-down case
#[async_trait]
pub trait CatalogCache: Send + Sync {
    /// `Ok(None)` on a miss or an expired snapshot
    async fn load(&self) -> Result<Option<Vec<TrackedObject>>>;
    async fn store(&self, objects: &[TrackedObject]) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile {
    stored_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    objects: Vec<TrackedObject>,
}

/// JSON snapshot on local disk with an expiry stamp
pub struct FileCache {
    path: PathBuf,
    ttl: Duration,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl CatalogCache for FileCache {
    async fn load(&self) -> Result<Option<Vec<TrackedObject>>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(IngestError::Cache(format!("{}: {}", self.path.display(), e))),
        };

        let file: CacheFile = serde_json::from_slice(&bytes)
            .map_err(|e| IngestError::Cache(format!("corrupt snapshot: {}", e)))?;

        if file.expires_at <= Utc::now() {
            debug!("Catalog snapshot expired at {}", file.expires_at);
            return Ok(None);
        }
        Ok(Some(file.objects))
    }

    async fn store(&self, objects: &[TrackedObject]) -> Result<()> {
        let now = Utc::now();
        let file = CacheFile {
            stored_at: now,
            expires_at: now + self.ttl,
            objects: objects.to_vec(),
        };
        let json = serde_json::to_vec(&file).map_err(|e| IngestError::Cache(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IngestError::Cache(e.to_string()))?;
        }

        // write-then-rename
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| IngestError::Cache(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| IngestError::Cache(e.to_string()))?;

        debug!("Stored {} objects to {}", objects.len(), self.path.display());
        Ok(())
    }
}
