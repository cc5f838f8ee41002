use async_trait::async_trait;
use catalog_ingest::{
    CatalogCache, CatalogSource, FileCache, IngestError, IngestionService, IngestionState,
    RawElementSet, SourceTag, TrackedObject,
};
use chrono::{Duration, Utc};
use orbital_mechanics::StateLookup;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const ISS_LINE1: &str = "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992";
const ISS_LINE2: &str = "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";
const FRAGMENT_LINE1: &str = "1 99001U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9991";
const FRAGMENT_LINE2: &str = "2 99001  51.6461 221.2784 0001413  89.1723 280.5112 15.49507896236003";

fn iss() -> RawElementSet {
    RawElementSet {
        name: Some("ISS (ZARYA)".into()),
        line1: Some(ISS_LINE1.into()),
        line2: Some(ISS_LINE2.into()),
        ..Default::default()
    }
}

fn fragment() -> RawElementSet {
    RawElementSet {
        name: Some("ISS DEB".into()),
        line1: Some(FRAGMENT_LINE1.into()),
        line2: Some(FRAGMENT_LINE2.into()),
        ..Default::default()
    }
}

/// Scripted source: answers with `records` unless switched to failing
struct MockSource {
    tag: SourceTag,
    records: Mutex<Option<Vec<RawElementSet>>>,
    calls: AtomicUsize,
}

impl MockSource {
    fn up(tag: SourceTag, records: Vec<RawElementSet>) -> Arc<Self> {
        Arc::new(Self {
            tag,
            records: Mutex::new(Some(records)),
            calls: AtomicUsize::new(0),
        })
    }

    fn down(tag: SourceTag) -> Arc<Self> {
        Arc::new(Self {
            tag,
            records: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    fn set(&self, records: Option<Vec<RawElementSet>>) {
        *self.records.lock().unwrap() = records;
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for MockSource {
    fn tag(&self) -> SourceTag {
        self.tag
    }

    async fn fetch(&self) -> catalog_ingest::Result<Vec<RawElementSet>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| IngestError::unavailable(self.tag, "connection refused"))
    }
}

/// Answers, but with a body that does not decode
struct Malformed(SourceTag);

#[async_trait]
impl CatalogSource for Malformed {
    fn tag(&self) -> SourceTag {
        self.0
    }

    async fn fetch(&self) -> catalog_ingest::Result<Vec<RawElementSet>> {
        Err(IngestError::Parse("Space-Track payload: expected value".into()))
    }
}

#[derive(Default)]
struct MemoryCache {
    objects: Mutex<Option<Vec<TrackedObject>>>,
    fail_store: bool,
}

#[async_trait]
impl CatalogCache for MemoryCache {
    async fn load(&self) -> catalog_ingest::Result<Option<Vec<TrackedObject>>> {
        Ok(self.objects.lock().unwrap().clone())
    }

    async fn store(&self, objects: &[TrackedObject]) -> catalog_ingest::Result<()> {
        if self.fail_store {
            return Err(IngestError::Cache("disk full".into()));
        }
        *self.objects.lock().unwrap() = Some(objects.to_vec());
        Ok(())
    }
}

fn service(
    sources: Vec<Arc<MockSource>>,
    cache: Option<Arc<dyn CatalogCache>>,
) -> IngestionService {
    let sources: Vec<Arc<dyn CatalogSource>> = sources
        .into_iter()
        .map(|s| s as Arc<dyn CatalogSource>)
        .collect();
    IngestionService::new(sources, cache)
}

#[tokio::test]
async fn test_primary_success_is_live() {
    let primary = MockSource::up(SourceTag::Celestrak, vec![iss(), fragment()]);
    let secondary = MockSource::up(SourceTag::SpaceTrack, vec![iss()]);
    let svc = service(vec![primary.clone(), secondary.clone()], None);

    assert_eq!(svc.status().await.state, IngestionState::Uninitialized);
    assert_eq!(svc.refresh().await, IngestionState::Live);

    let status = svc.status().await;
    assert_eq!(status.last_source, SourceTag::Celestrak);
    assert_eq!(status.live_count, 2);
    assert!(status.fallback_reason.is_none());
    assert!(status.last_refresh.is_some());
    assert_eq!(secondary.calls(), 0);
}

#[tokio::test]
async fn test_secondary_after_primary_failure() {
    let primary = MockSource::down(SourceTag::Celestrak);
    let secondary = MockSource::up(SourceTag::SpaceTrack, vec![iss()]);
    let svc = service(vec![primary, secondary], None);

    assert_eq!(svc.refresh().await, IngestionState::LiveFallback);
    let status = svc.status().await;
    assert_eq!(status.last_source, SourceTag::SpaceTrack);
    assert!(status
        .fallback_reason
        .as_deref()
        .is_some_and(|r| r.contains("CELESTRAK")));
}

#[tokio::test]
async fn test_empty_payload_counts_as_unavailable() {
    let garbage = RawElementSet {
        line1: Some("1 junk".into()),
        line2: Some("2 junk".into()),
        ..Default::default()
    };
    let primary = MockSource::up(SourceTag::Celestrak, vec![garbage]);
    let secondary = MockSource::up(SourceTag::SpaceTrack, vec![iss()]);
    let svc = service(vec![primary, secondary], None);

    assert_eq!(svc.refresh().await, IngestionState::LiveFallback);
}

#[tokio::test]
async fn test_all_down_uses_cache() {
    let primary = MockSource::up(SourceTag::Celestrak, vec![iss(), fragment()]);
    let secondary = MockSource::down(SourceTag::SpaceTrack);
    let cache = Arc::new(MemoryCache::default());
    let svc = service(vec![primary.clone(), secondary], Some(cache.clone()));

    assert_eq!(svc.refresh().await, IngestionState::Live);
    assert!(cache.objects.lock().unwrap().is_some());

    primary.set(None);
    assert_eq!(svc.refresh().await, IngestionState::Cached);

    let status = svc.status().await;
    assert_eq!(status.last_source, SourceTag::Cache);
    assert_eq!(status.live_count, 2);
    assert!(status.error.is_some());

    let snapshot = svc.snapshot().await;
    assert!(snapshot.entries().iter().all(|e| e.object.source == SourceTag::Cache));
}

#[tokio::test]
async fn test_error_keeps_previous_catalog() {
    let primary = MockSource::up(SourceTag::Celestrak, vec![iss()]);
    let svc = service(vec![primary.clone()], None);

    assert_eq!(svc.refresh().await, IngestionState::Live);
    primary.set(None);
    assert_eq!(svc.refresh().await, IngestionState::Error);

    let status = svc.status().await;
    assert_eq!(status.state, IngestionState::Error);
    assert_eq!(status.live_count, 1);
    assert_eq!(status.last_source, SourceTag::Celestrak);
    assert!(status.error.is_some());
    assert!(svc.find("25544").await.is_some());
}

#[tokio::test]
async fn test_error_from_cold_start_has_no_catalog() {
    let svc = service(vec![MockSource::down(SourceTag::Celestrak)], None);
    assert_eq!(svc.refresh().await, IngestionState::Error);
    assert!(svc.live_satellites(10, Utc::now()).await.is_none());
}

#[tokio::test]
async fn test_primary_retried_every_cycle() {
    let primary = MockSource::down(SourceTag::Celestrak);
    let secondary = MockSource::up(SourceTag::SpaceTrack, vec![iss()]);
    let svc = service(vec![primary.clone(), secondary], None);

    svc.refresh().await;
    svc.refresh().await;
    assert_eq!(primary.calls(), 2);

    primary.set(Some(vec![iss()]));
    assert_eq!(svc.refresh().await, IngestionState::Live);
}

#[tokio::test]
async fn test_cache_write_failure_is_recorded_not_fatal() {
    let primary = MockSource::up(SourceTag::Celestrak, vec![iss()]);
    let cache = Arc::new(MemoryCache {
        fail_store: true,
        ..Default::default()
    });
    let svc = service(vec![primary], Some(cache));

    assert_eq!(svc.refresh().await, IngestionState::Live);
    let status = svc.status().await;
    assert!(status.cache_error.as_deref().is_some_and(|e| e.contains("disk full")));
    assert!(status.error.is_none());
}

#[tokio::test]
async fn test_live_satellites_and_lookup() {
    let primary = MockSource::up(SourceTag::Celestrak, vec![iss(), fragment()]);
    let svc = service(vec![primary], None);
    svc.refresh().await;

    let snapshot = svc.snapshot().await;
    let epoch = snapshot.find("25544").unwrap().orbit.epoch();

    let live = svc.live_satellites(1, epoch).await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].kind, "SATELLITE");

    let all = svc.live_satellites(500, epoch).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].kind, "DEBRIS");

    assert!(snapshot.state_of("25544", epoch).is_some());
    assert!(snapshot.state_of("00000", epoch).is_none());
}

#[tokio::test]
async fn test_file_cache_round_trip_through_service() {
    let dir = tempfile::tempdir().unwrap();
    let cache: Arc<dyn CatalogCache> =
        Arc::new(FileCache::new(dir.path().join("catalog.json"), Duration::hours(1)));

    let primary = MockSource::up(SourceTag::Celestrak, vec![iss()]);
    let warm = service(vec![primary], Some(cache.clone()));
    warm.refresh().await;

    // fresh process, every source down
    let cold = service(vec![MockSource::down(SourceTag::Celestrak)], Some(cache));
    assert_eq!(cold.refresh().await, IngestionState::Cached);
    assert!(cold.find("25544").await.is_some());
}

#[tokio::test]
async fn test_parse_error_kept_apart_from_network_errors() {
    let svc = IngestionService::new(
        vec![
            MockSource::down(SourceTag::Celestrak) as Arc<dyn CatalogSource>,
            Arc::new(Malformed(SourceTag::SpaceTrack)) as Arc<dyn CatalogSource>,
        ],
        None,
    );

    assert_eq!(svc.refresh().await, IngestionState::Error);
    let status = svc.status().await;
    let error = status.error.unwrap();
    assert!(error.contains("CELESTRAK"));
    assert!(!error.contains("expected value"));
    assert!(status
        .cache_error
        .as_deref()
        .is_some_and(|e| e.contains("SPACE-TRACK") && e.contains("expected value")));
}

#[tokio::test]
async fn test_parse_error_recorded_on_fallback_success() {
    let svc = IngestionService::new(
        vec![
            Arc::new(Malformed(SourceTag::Celestrak)) as Arc<dyn CatalogSource>,
            MockSource::up(SourceTag::SpaceTrack, vec![iss()]) as Arc<dyn CatalogSource>,
        ],
        None,
    );

    assert_eq!(svc.refresh().await, IngestionState::LiveFallback);
    let status = svc.status().await;
    assert!(status.error.is_none());
    assert!(status
        .cache_error
        .as_deref()
        .is_some_and(|e| e.contains("expected value")));
    assert!(status
        .fallback_reason
        .as_deref()
        .is_some_and(|r| r.contains("CELESTRAK")));
}
