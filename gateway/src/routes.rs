use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use alert_dispatch::{AlertError, CriticalEvent, DeliveryReport, Subscriber, SubscriberMetadata};
use catalog_ingest::{CatalogSnapshot, IngestionStatus, LiveSatellite};
use collision_avoidance::risk::heuristic_probability;
use collision_avoidance::{
    classify_severity, model_info, plan_avoidance_maneuver, run_sandbox_scenario_until,
    score_collision_risk, CancelFlag, CollisionError, ConjunctionEvent, ConjunctionScreener, ManeuverPlan, ModelInfo,
    RiskAssessment, RiskFeatures, RiskRequest, SandboxRequest, SandboxRun, ScreeningObject,
    Severity, Threat,
};

use crate::static_catalog::{sort_hazards, Hazard, SimpleHazard, StaticObject, StaticStatus};
use crate::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(untagged)]
pub enum SatelliteListing {
    Live(Vec<LiveSatellite>),
    Static(Vec<StaticObject>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertHealth {
    pub subscriber_count: usize,
    pub subscribers: Vec<Subscriber>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub ingestion: IngestionStatus,
    pub model: ModelInfo,
    pub alerts: AlertHealth,
    pub static_data: StaticStatus,
}

#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: SubscriberMetadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSendRequest {
    pub satellite_id: Option<String>,
    pub debris_id: Option<String>,
    pub probability: Option<f64>,
    #[serde(rename = "timeToCA")]
    pub time_to_ca: Option<f64>,
    pub relative_velocity: Option<f64>,
}

impl From<AlertSendRequest> for CriticalEvent {
    fn from(req: AlertSendRequest) -> Self {
        Self {
            satellite_id: req.satellite_id.unwrap_or_else(|| "UNKNOWN".to_string()),
            debris_id: req.debris_id.unwrap_or_else(|| "UNKNOWN".to_string()),
            probability: req.probability.unwrap_or(0.0),
            time_to_ca: req.time_to_ca.unwrap_or(0.0),
            relative_velocity: req.relative_velocity.unwrap_or(0.0),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManeuverRequest {
    pub satellite_id: Option<String>,
    #[serde(default)]
    pub threats: Vec<Threat>,
    pub fuel_budget: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenRequest {
    pub target_id: String,
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenResponse {
    pub target_id: String,
    pub start_time: DateTime<Utc>,
    pub threshold_km: f64,
    pub events: Vec<ConjunctionEvent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardRequest {
    pub target_name: Option<String>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Runs CPU-bound work on the blocking pool under a hard deadline. On
/// overrun the work's [`CancelFlag`] is raised so the worker stops at its
/// next step instead of holding a blocking thread.
async fn bounded<T, F>(deadline: Duration, work: F) -> Result<T, (StatusCode, String)>
where
    T: Send + 'static,
    F: FnOnce(CancelFlag) -> T + Send + 'static,
{
    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();
    let handle = tokio::task::spawn_blocking(move || work(worker_cancel));

    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Worker failed: {}", e),
        )),
        Err(_) => {
            cancel.cancel();
            tracing::warn!("Computation exceeded deadline of {:?}", deadline);
            Err((
                StatusCode::GATEWAY_TIMEOUT,
                format!("Computation exceeded {}s deadline", deadline.as_secs()),
            ))
        }
    }
}

/// Screens `target_id` against every other live catalog entry
fn screen_snapshot(
    snapshot: &CatalogSnapshot,
    screener: &ConjunctionScreener,
    target_id: &str,
    start: DateTime<Utc>,
    cancel: &CancelFlag,
) -> Result<Vec<ConjunctionEvent>, CollisionError> {
    let Some(entry) = snapshot.find(target_id) else {
        return Ok(Vec::new());
    };
    let target = ScreeningObject {
        id: &entry.object.id,
        name: &entry.object.name,
        ephemeris: entry.orbit.as_ref(),
    };
    let candidates: Vec<ScreeningObject> = snapshot
        .entries()
        .iter()
        .map(|e| ScreeningObject {
            id: &e.object.id,
            name: &e.object.name,
            ephemeris: e.orbit.as_ref(),
        })
        .collect();

    screener.predict_conjunctions_until(&target, &candidates, start, cancel)
}

fn computation_error(e: CollisionError) -> (StatusCode, String) {
    match e {
        CollisionError::Cancelled => (StatusCode::GATEWAY_TIMEOUT, e.to_string()),
        other => (StatusCode::BAD_REQUEST, other.to_string()),
    }
}

fn screened_hazard(event: &ConjunctionEvent, now: DateTime<Utc>) -> Hazard {
    let features = RiskFeatures {
        time_to_ca: (event.time - now).num_seconds().max(0) as f64,
        relative_velocity: event.target_state.relative_speed(&event.candidate_state),
        historical_miss_distance: event.distance_km,
        ..Default::default()
    };
    let severity = classify_severity(heuristic_probability(&features));

    Hazard {
        kind: "SCREENED",
        debris_name: event.candidate_name.clone(),
        debris_id: event.candidate_id.clone(),
        severity: severity.as_str().to_string(),
        distance: event.distance_km,
        time_to_collision: Some(features.time_to_ca),
        time: event.time.to_rfc3339(),
    }
}

fn target_name(req: HazardRequest) -> Result<String, (StatusCode, String)> {
    req.target_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "targetName is required".to_string()))
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Satellite not found".to_string())
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "conjunction-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /satellites - live catalog when populated, static dataset otherwise
pub async fn list_satellites(State(state): State<AppState>) -> Json<SatelliteListing> {
    let live = state
        .ingestion
        .live_satellites(state.config.live_limit, Utc::now())
        .await;
    match live {
        Some(live) => Json(SatelliteListing::Live(live)),
        None => Json(SatelliteListing::Static(
            state.static_data().await.satellites.clone(),
        )),
    }
}

/// GET /debris
pub async fn list_debris(State(state): State<AppState>) -> Json<Vec<StaticObject>> {
    Json(state.static_data().await.debris.clone())
}

/// GET /tle/status
pub async fn tle_status(State(state): State<AppState>) -> Json<IngestionStatus> {
    Json(state.ingestion.status().await)
}

/// GET /status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let subscribers = state.alerts.subscribers().await;
    Json(StatusResponse {
        ingestion: state.ingestion.status().await,
        model: model_info(),
        alerts: AlertHealth {
            subscriber_count: subscribers.len(),
            subscribers,
        },
        static_data: state.static_data().await.status(),
    })
}

/// POST /collision-risk - fans out an alert when CRITICAL
pub async fn collision_risk(
    State(state): State<AppState>,
    Json(req): Json<RiskRequest>,
) -> Json<RiskAssessment> {
    let snapshot = state.ingestion.snapshot().await;
    let assessment = score_collision_risk(&req, snapshot.as_ref(), Utc::now());

    if assessment.severity == Severity::Critical {
        if let (Some(sat), Some(debris)) = (&assessment.satellite_id, &assessment.debris_id) {
            let event = CriticalEvent {
                satellite_id: sat.clone(),
                debris_id: debris.clone(),
                probability: assessment.probability,
                time_to_ca: assessment.time_to_ca,
                relative_velocity: assessment.relative_velocity,
            };
            let alerts = state.alerts.clone();
            tokio::spawn(async move {
                let report = alerts.send_critical_alert(&event).await;
                tracing::info!(
                    "Critical alert {} vs {}: {} recipients",
                    event.satellite_id,
                    event.debris_id,
                    report.delivered
                );
            });
        }
    }

    Json(assessment)
}

/// POST /alert-subscribe
pub async fn alert_subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> ApiResult<Subscriber> {
    let email = req.email.unwrap_or_default();
    state
        .alerts
        .register_subscriber(&email, req.metadata)
        .await
        .map(Json)
        .map_err(|e| match e {
            AlertError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })
}

/// POST /alert-send
pub async fn alert_send(
    State(state): State<AppState>,
    Json(req): Json<AlertSendRequest>,
) -> Json<DeliveryReport> {
    let event = CriticalEvent::from(req);
    Json(state.alerts.send_critical_alert(&event).await)
}

/// POST /maneuver/plan
pub async fn maneuver_plan(
    State(state): State<AppState>,
    Json(req): Json<ManeuverRequest>,
) -> Json<ManeuverPlan> {
    let budget = req.fuel_budget.unwrap_or(state.config.fuel_budget);
    Json(plan_avoidance_maneuver(
        req.satellite_id.as_deref(),
        &req.threats,
        budget,
    ))
}

/// POST /simulator/run - circular-orbit sandbox
pub async fn simulator_run(
    State(state): State<AppState>,
    Json(req): Json<SandboxRequest>,
) -> ApiResult<SandboxRun> {
    let threshold = state.config.collision_threshold_km;
    bounded(state.config.screening_deadline(), move |cancel| {
        run_sandbox_scenario_until(&req, threshold, &cancel)
    })
    .await?
    .map(Json)
    .map_err(computation_error)
}

/// POST /conjunctions/screen - live catalog screening
pub async fn screen_conjunctions(
    State(state): State<AppState>,
    Json(req): Json<ScreenRequest>,
) -> ApiResult<ScreenResponse> {
    let snapshot = state.ingestion.snapshot().await;
    if snapshot.find(&req.target_id).is_none() {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Unknown target: {}", req.target_id),
        ));
    }

    let start = req.start_time.unwrap_or_else(Utc::now);
    let screener = state.screener.clone();
    let target_id = req.target_id.clone();
    let threshold_km = screener.threshold_km();

    let events = bounded(state.config.screening_deadline(), move |cancel| {
        screen_snapshot(&snapshot, &screener, &target_id, start, &cancel)
    })
    .await?
    .map_err(computation_error)?;

    Ok(Json(ScreenResponse {
        target_id: req.target_id,
        start_time: start,
        threshold_km,
        events,
    }))
}

/// POST /predict-hazard - static dataset first, then live screening
pub async fn predict_hazard(
    State(state): State<AppState>,
    Json(req): Json<HazardRequest>,
) -> ApiResult<Vec<Hazard>> {
    let name = target_name(req)?;
    let now = Utc::now();

    if let Some(hazards) = state.static_data().await.predict_hazards(&name, &now.to_rfc3339()) {
        return Ok(Json(hazards));
    }

    let snapshot = state.ingestion.snapshot().await;
    let Some(target_id) = snapshot
        .entries()
        .iter()
        .find(|e| e.object.name == name)
        .map(|e| e.object.id.clone())
    else {
        return Err(not_found());
    };

    let screener = state.screener.clone();
    let events = bounded(state.config.screening_deadline(), move |cancel| {
        screen_snapshot(&snapshot, &screener, &target_id, now, &cancel)
    })
    .await?
    .map_err(computation_error)?;

    let mut hazards: Vec<Hazard> = events.iter().map(|e| screened_hazard(e, now)).collect();
    sort_hazards(&mut hazards);
    Ok(Json(hazards))
}

/// POST /collisions - legacy simplified hazard list
pub async fn collisions(
    State(state): State<AppState>,
    Json(req): Json<HazardRequest>,
) -> ApiResult<Vec<SimpleHazard>> {
    let name = target_name(req)?;
    state
        .static_data()
        .await
        .simple_collisions(&name, &Utc::now().to_rfc3339())
        .map(Json)
        .ok_or_else(not_found)
}

/// POST /restart - reload the static dataset from disk
pub async fn restart(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    tracing::info!("Reloading static data...");
    let path = state.config.static_data_path.clone();
    let dataset = tokio::task::spawn_blocking(move || crate::static_catalog::StaticDataset::load(&path))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    *state.static_data.write().await = Arc::new(dataset);

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Static data reloaded"
    })))
}
