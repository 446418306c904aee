use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use adlift_bandit::Selection;
use adlift_common::AdLiftError;
use adlift_evolution::EvolutionReport;

use crate::AppState;

// --- Request shapes ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRequest {
    pub campaign_id: String,
    pub segment: String,
    pub arms: Vec<String>,
    /// Opaque caller context; accepted for forward compatibility, unused.
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardRequest {
    pub campaign_id: String,
    pub segment: String,
    pub variant_id: String,
    #[serde(default = "default_reward")]
    pub reward: f64,
}

fn default_reward() -> f64 {
    1.0
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolveRequest {
    pub campaign_id: String,
    #[serde(default)]
    pub force: bool,
}

// --- Evolution status bookkeeping ---

/// Per-campaign view served by the status endpoint. The generation sticks at
/// the last completed cycle even when a later cycle skips.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignEvolutionState {
    pub current_generation: u32,
    pub last_result: EvolutionReport,
}

// --- Error mapping ---

#[derive(Debug)]
pub struct ApiError(AdLiftError);

impl From<AdLiftError> for ApiError {
    fn from(err: AdLiftError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AdLiftError::Validation(_) => StatusCode::BAD_REQUEST,
            AdLiftError::NotFound(_) => StatusCode::NOT_FOUND,
            AdLiftError::Dependency(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

// --- Handlers ---

pub async fn select(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<Selection>, ApiError> {
    let selection = state
        .selector
        .select(&req.campaign_id, &req.segment, &req.arms)
        .await?;
    Ok(Json(selection))
}

pub async fn reward(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RewardRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let params = state
        .rewards
        .reward(&req.campaign_id, &req.segment, &req.variant_id, req.reward)
        .await?;
    Ok(Json(json!({
        "ok": true,
        "alpha": params.alpha,
        "beta": params.beta,
    })))
}

/// Kick off a breeding cycle and return immediately; the outcome lands in
/// the per-campaign state for the status endpoint.
pub async fn evolve(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvolveRequest>,
) -> impl IntoResponse {
    let campaign_id = req.campaign_id.clone();

    let task_state = state.clone();
    tokio::spawn(async move {
        let report = task_state
            .orchestrator
            .evolve(&req.campaign_id, req.force)
            .await;

        let mut campaigns = task_state.evolution_state.lock().await;
        let prev_generation = campaigns
            .get(&req.campaign_id)
            .map(|s| s.current_generation)
            .unwrap_or(0);
        let current_generation = report.generation.unwrap_or(prev_generation).max(prev_generation);
        campaigns.insert(
            req.campaign_id.clone(),
            CampaignEvolutionState {
                current_generation,
                last_result: report,
            },
        );
    });

    info!(campaign_id = %campaign_id, "evolution cycle started in background");
    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "started", "campaignId": campaign_id })),
    )
}

pub async fn evolution_status(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<String>,
) -> Json<serde_json::Value> {
    let campaigns = state.evolution_state.lock().await;
    let known = campaigns.get(&campaign_id);
    Json(json!({
        "campaignId": campaign_id,
        "currentGeneration": known.map(|s| s.current_generation).unwrap_or(0),
        "lastEvolutionResult": known.map(|s| &s.last_result),
    }))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use adlift_bandit::{MemoryArmStore, RewardUpdater, ThompsonSelector};
    use adlift_evolution::{
        EvolutionConfig, EvolutionOrchestrator, HttpLineageLog, HttpMetricsStore,
        HttpVariantRepository,
    };

    fn test_state() -> Arc<AppState> {
        let store = Arc::new(MemoryArmStore::new());
        // Collaborator endpoints are never dialed by the bandit handlers.
        let orchestrator = EvolutionOrchestrator::new(
            Arc::new(HttpMetricsStore::new("http://127.0.0.1:9")),
            Arc::new(HttpVariantRepository::new("http://127.0.0.1:9")),
            Arc::new(HttpLineageLog::new("http://127.0.0.1:9")),
            EvolutionConfig::default(),
        );
        Arc::new(AppState {
            selector: ThompsonSelector::new(store.clone()),
            rewards: RewardUpdater::new(store),
            orchestrator,
            evolution_state: Mutex::new(HashMap::new()),
        })
    }

    #[tokio::test]
    async fn empty_arms_map_to_bad_request() {
        let result = select(
            State(test_state()),
            Json(SelectRequest {
                campaign_id: "c1".into(),
                segment: "human".into(),
                arms: vec![],
                context: None,
            }),
        )
        .await;

        let err = result.err().expect("empty arms must be rejected");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn select_then_reward_round_trip() {
        let state = test_state();

        let Json(selection) = select(
            State(state.clone()),
            Json(SelectRequest {
                campaign_id: "c1".into(),
                segment: "human".into(),
                arms: vec!["a".into(), "b".into()],
                context: None,
            }),
        )
        .await
        .unwrap();
        assert!(selection.explore);

        let Json(body) = reward(
            State(state),
            Json(RewardRequest {
                campaign_id: "c1".into(),
                segment: "human".into(),
                variant_id: selection.variant_id,
                reward: 10.0,
            }),
        )
        .await
        .unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(body["alpha"], 11.0);
        assert_eq!(body["beta"], 1.0);
    }

    #[tokio::test]
    async fn status_for_an_unknown_campaign_is_generation_zero() {
        let Json(body) = evolution_status(State(test_state()), Path("ghost".into())).await;
        assert_eq!(body["currentGeneration"], 0);
        assert!(body["lastEvolutionResult"].is_null());
    }
}
