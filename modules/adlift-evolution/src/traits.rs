//! Collaborator seams for the evolution cycle.
//!
//! Implemented by the HTTP clients in [`crate::http`] for production and by
//! in-process fakes in the orchestrator tests.

use async_trait::async_trait;

use adlift_common::{AdLiftError, EvolutionHistoryRecord, NewVariant, Variant, VariantMetrics};

/// Aggregated metrics source plus the fitness write-back channel.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Snapshot of per-variant performance for one campaign. Eventually
    /// consistent; the cycle treats it as a point-in-time view.
    async fn get_aggregated_metrics(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<VariantMetrics>, AdLiftError>;

    /// Persist a computed fitness score onto the variant's record.
    async fn write_fitness(&self, variant_id: &str, score: f64) -> Result<(), AdLiftError>;
}

/// Durable home of variant configurations.
#[async_trait]
pub trait VariantRepository: Send + Sync {
    /// Create a variant and return its assigned id.
    async fn create_variant(&self, variant: &NewVariant) -> Result<String, AdLiftError>;

    /// Fetch a variant by id. `None` when the repository does not know it.
    async fn get_variant_by_id(&self, id: &str) -> Result<Option<Variant>, AdLiftError>;
}

/// Append-only breeding audit trail.
#[async_trait]
pub trait LineageLog: Send + Sync {
    async fn append(&self, record: &EvolutionHistoryRecord) -> Result<(), AdLiftError>;
}
