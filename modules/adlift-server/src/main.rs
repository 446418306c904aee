use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use adlift_bandit::{ArmStore, MemoryArmStore, PgArmStore, RewardUpdater, ThompsonSelector};
use adlift_common::Config;
use adlift_evolution::{
    EvolutionConfig, EvolutionOrchestrator, FitnessWeights, HttpLineageLog, HttpMetricsStore,
    HttpVariantRepository,
};

mod handlers;

use handlers::CampaignEvolutionState;

// --- App State ---

pub struct AppState {
    selector: ThompsonSelector,
    rewards: RewardUpdater,
    orchestrator: EvolutionOrchestrator,
    evolution_state: Mutex<HashMap<String, CampaignEvolutionState>>,
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("adlift=info".parse()?))
        .init();

    let config = Config::from_env()?;

    // Durable store when a database is configured, in-process otherwise.
    let store: Arc<dyn ArmStore> = match &config.database_url {
        Some(url) => {
            let pg = PgArmStore::connect(url).await?;
            pg.ensure_schema().await?;
            info!("using Postgres arm store");
            Arc::new(pg)
        }
        None => {
            info!("DATABASE_URL not set, using in-process arm store");
            Arc::new(MemoryArmStore::new())
        }
    };

    let orchestrator = EvolutionOrchestrator::new(
        Arc::new(HttpMetricsStore::new(config.metrics_base_url.clone())),
        Arc::new(HttpVariantRepository::new(config.variants_base_url.clone())),
        Arc::new(HttpLineageLog::new(config.lineage_base_url.clone())),
        EvolutionConfig {
            breeding_pool_pct: config.breeding_pool_pct,
            mutation_rate: config.mutation_rate,
            min_impressions: config.min_impressions,
            fitness_weights: FitnessWeights {
                ctr: config.fitness_weight_ctr,
                cvr: config.fitness_weight_cvr,
                revenue: config.fitness_weight_revenue,
            },
        },
    );

    let state = Arc::new(AppState {
        selector: ThompsonSelector::new(store.clone()),
        rewards: RewardUpdater::new(store),
        orchestrator,
        evolution_state: Mutex::new(HashMap::new()),
    });

    let app = router(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("AdLift server starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/select", post(handlers::select))
        .route("/reward", post(handlers::reward))
        .route("/evolve", post(handlers::evolve))
        .route(
            "/evolution-status/{campaign_id}",
            get(handlers::evolution_status),
        )
        .route("/health", get(handlers::health))
        .with_state(state)
        // Logging layer: method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
