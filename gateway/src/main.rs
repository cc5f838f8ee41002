use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alert_dispatch::AlertDispatcher;
use catalog_ingest::{
    sources::http_client, CatalogCache, CatalogSource, CelesTrakSource, FileCache,
    IngestionService, SpaceTrackSource,
};
use collision_avoidance::ConjunctionScreener;

mod config;
mod routes;
mod static_catalog;

use config::Config;
use static_catalog::StaticDataset;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ingestion: Arc<IngestionService>,
    pub alerts: Arc<AlertDispatcher>,
    pub static_data: Arc<RwLock<Arc<StaticDataset>>>,
    pub screener: ConjunctionScreener,
}

impl AppState {
    pub fn new(
        config: Config,
        ingestion: Arc<IngestionService>,
        alerts: Arc<AlertDispatcher>,
    ) -> Result<Self> {
        let screener = config.screener()?;
        let static_data = StaticDataset::load(&config.static_data_path);
        Ok(Self {
            screener,
            config: Arc::new(config),
            ingestion,
            alerts,
            static_data: Arc::new(RwLock::new(Arc::new(static_data))),
        })
    }

    pub async fn static_data(&self) -> Arc<StaticDataset> {
        self.static_data.read().await.clone()
    }
}

pub fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/satellites", get(routes::list_satellites))
        .route("/debris", get(routes::list_debris))
        .route("/status", get(routes::status))
        .route("/tle/status", get(routes::tle_status))
        .route("/collision-risk", post(routes::collision_risk))
        .route("/alert-subscribe", post(routes::alert_subscribe))
        .route("/alert-send", post(routes::alert_send))
        .route("/maneuver/plan", post(routes::maneuver_plan))
        .route("/simulator/run", post(routes::simulator_run))
        .route("/conjunctions/screen", post(routes::screen_conjunctions))
        .route("/predict-hazard", post(routes::predict_hazard))
        .route("/collisions", post(routes::collisions))
        .route("/restart", post(routes::restart))
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn build_ingestion(config: &Config) -> Result<IngestionService> {
    let client = http_client(config.source_timeout())?;

    let sources: Vec<Arc<dyn CatalogSource>> = vec![
        Arc::new(CelesTrakSource::new(client.clone(), &config.celestrak_url)),
        Arc::new(SpaceTrackSource::new(
            client,
            &config.spacetrack_url,
            config.spacetrack_credentials(),
        )),
    ];

    let cache = match &config.cache_path {
        Some(path) => {
            tracing::info!("   Catalog cache at {}", path.display());
            Some(Arc::new(FileCache::new(path.clone(), config.cache_ttl()?)) as Arc<dyn CatalogCache>)
        }
        None => None,
    };

    Ok(IngestionService::new(sources, cache))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "conjunction_gateway=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    // reject out-of-range durations before anything starts
    config.screener()?;

    let ingestion = Arc::new(build_ingestion(&config)?);
    if config.spacetrack_credentials().is_none() {
        tracing::warn!("   Space-Track credentials not set; secondary source disabled");
    }
    ingestion.clone().spawn_refresh_loop(config.refresh_interval());

    let alerts = Arc::new(AlertDispatcher::default());
    let addr = format!("0.0.0.0:{}", config.port);
    let refresh_minutes = config.refresh_minutes;

    let state = AppState::new(config, ingestion, alerts)?;
    let app = app(state);

    tracing::info!("Conjunction gateway starting on {}", addr);
    tracing::info!("   Catalog refresh every {} min", refresh_minutes);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
