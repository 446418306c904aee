//! HTTP collaborator clients with bounded retry.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::warn;

use adlift_common::{AdLiftError, EvolutionHistoryRecord, NewVariant, Variant, VariantMetrics};

use crate::traits::{LineageLog, MetricsStore, VariantRepository};

/// Max attempts per collaborator call.
const HTTP_MAX_ATTEMPTS: u32 = 3;
/// Base backoff duration. Actual delay is base * 2^attempt, capped, plus jitter.
const HTTP_RETRY_BASE: Duration = Duration::from_millis(500);
/// Backoff cap.
const HTTP_RETRY_CAP: Duration = Duration::from_secs(5);
/// Per-request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Send a request with retry on transport errors and 5xx responses.
///
/// Any other status returns to the caller for interpretation; a 404 is an
/// answer, not a transient fault. Exhausted attempts surface as a
/// dependency error.
async fn send_with_retry<F>(what: &str, build: F) -> Result<Response, AdLiftError>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error = String::new();

    for attempt in 0..HTTP_MAX_ATTEMPTS {
        if attempt > 0 {
            let backoff = (HTTP_RETRY_BASE * 2u32.pow(attempt)).min(HTTP_RETRY_CAP);
            let jitter = Duration::from_millis(rand::rng().random_range(0..250));
            tokio::time::sleep(backoff + jitter).await;
        }

        match build().timeout(HTTP_TIMEOUT).send().await {
            Ok(resp) if resp.status().is_server_error() => {
                last_error = format!("{what}: server returned {}", resp.status());
                if attempt + 1 < HTTP_MAX_ATTEMPTS {
                    warn!(
                        what,
                        attempt = attempt + 1,
                        status = %resp.status(),
                        "collaborator call failed, retrying"
                    );
                }
            }
            Ok(resp) => return Ok(resp),
            Err(e) => {
                last_error = format!("{what}: {e}");
                if attempt + 1 < HTTP_MAX_ATTEMPTS {
                    warn!(
                        what,
                        attempt = attempt + 1,
                        error = %e,
                        "collaborator call failed, retrying"
                    );
                }
            }
        }
    }

    Err(AdLiftError::Dependency(last_error))
}

fn check_status(what: &str, resp: Response) -> Result<Response, AdLiftError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else if status == StatusCode::NOT_FOUND {
        Err(AdLiftError::NotFound(format!("{what}: {status}")))
    } else {
        Err(AdLiftError::Dependency(format!(
            "{what}: unexpected status {status}"
        )))
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    what: &str,
    resp: Response,
) -> Result<T, AdLiftError> {
    resp.json()
        .await
        .map_err(|e| AdLiftError::Dependency(format!("{what}: invalid response body: {e}")))
}

fn trimmed(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

// ---------------------------------------------------------------------------
// Metrics store
// ---------------------------------------------------------------------------

pub struct HttpMetricsStore {
    client: Client,
    base_url: String,
}

impl HttpMetricsStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: trimmed(base_url),
        }
    }
}

#[async_trait]
impl MetricsStore for HttpMetricsStore {
    async fn get_aggregated_metrics(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<VariantMetrics>, AdLiftError> {
        let url = format!("{}/campaigns/{campaign_id}/metrics", self.base_url);
        let resp = send_with_retry("metrics fetch", || self.client.get(&url)).await?;
        let resp = check_status("metrics fetch", resp)?;
        parse_json("metrics fetch", resp).await
    }

    async fn write_fitness(&self, variant_id: &str, score: f64) -> Result<(), AdLiftError> {
        let url = format!("{}/variants/{variant_id}/fitness", self.base_url);
        let body = serde_json::json!({ "fitnessScore": score });
        let resp = send_with_retry("fitness write", || self.client.post(&url).json(&body)).await?;
        check_status("fitness write", resp)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Variant repository
// ---------------------------------------------------------------------------

pub struct HttpVariantRepository {
    client: Client,
    base_url: String,
}

impl HttpVariantRepository {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: trimmed(base_url),
        }
    }
}

#[derive(Deserialize)]
struct CreatedVariant {
    id: String,
}

#[async_trait]
impl VariantRepository for HttpVariantRepository {
    async fn create_variant(&self, variant: &NewVariant) -> Result<String, AdLiftError> {
        let url = format!("{}/variants", self.base_url);
        let resp =
            send_with_retry("variant create", || self.client.post(&url).json(variant)).await?;
        let resp = check_status("variant create", resp)?;
        let created: CreatedVariant = parse_json("variant create", resp).await?;
        Ok(created.id)
    }

    async fn get_variant_by_id(&self, id: &str) -> Result<Option<Variant>, AdLiftError> {
        let url = format!("{}/variants/{id}", self.base_url);
        let resp = send_with_retry("variant fetch", || self.client.get(&url)).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_status("variant fetch", resp)?;
        let variant: Variant = parse_json("variant fetch", resp).await?;
        Ok(Some(variant))
    }
}

// ---------------------------------------------------------------------------
// Lineage log
// ---------------------------------------------------------------------------

pub struct HttpLineageLog {
    client: Client,
    base_url: String,
}

impl HttpLineageLog {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: trimmed(base_url),
        }
    }
}

#[async_trait]
impl LineageLog for HttpLineageLog {
    async fn append(&self, record: &EvolutionHistoryRecord) -> Result<(), AdLiftError> {
        let url = format!("{}/evolution-history", self.base_url);
        let resp =
            send_with_retry("lineage append", || self.client.post(&url).json(record)).await?;
        check_status("lineage append", resp)?;
        Ok(())
    }
}
