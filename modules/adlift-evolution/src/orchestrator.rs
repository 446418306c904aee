//! The evolution cycle: a coarse state machine over external collaborators.
//!
//! `IDLE → CHECKING_ELIGIBILITY → {SKIPPED | BREEDING} → PERSISTING →
//! {COMPLETED | ERROR}`. The cycle runs out-of-band from the bandit hot path,
//! holds no arm-store locks, and treats the metrics snapshot as eventually
//! consistent.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use adlift_common::{AdLiftError, EvolutionHistoryRecord, NewVariant, Variant};

use crate::fitness::{self, FitnessWeights};
use crate::genetics::{self, Offspring};
use crate::selection::{select_parents, ScoredVariant};
use crate::traits::{LineageLog, MetricsStore, VariantRepository};

/// Tuning for the breeding cycle.
#[derive(Debug, Clone, Copy)]
pub struct EvolutionConfig {
    /// Top percentage of the population kept as breeding stock.
    pub breeding_pool_pct: f64,
    /// Per-field mutation probability stamped onto offspring.
    pub mutation_rate: f64,
    /// Minimum total impressions before an unforced cycle proceeds.
    pub min_impressions: u64,
    pub fitness_weights: FitnessWeights,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            breeding_pool_pct: 20.0,
            mutation_rate: 0.15,
            min_impressions: 1000,
            fitness_weights: FitnessWeights::default(),
        }
    }
}

/// Where a cycle currently is. Logged as the machine advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    CheckingEligibility,
    Breeding,
    Persisting,
    Completed,
    Skipped,
    Error,
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CyclePhase::Idle => write!(f, "idle"),
            CyclePhase::CheckingEligibility => write!(f, "checking_eligibility"),
            CyclePhase::Breeding => write!(f, "breeding"),
            CyclePhase::Persisting => write!(f, "persisting"),
            CyclePhase::Completed => write!(f, "completed"),
            CyclePhase::Skipped => write!(f, "skipped"),
            CyclePhase::Error => write!(f, "error"),
        }
    }
}

/// Terminal status of one cycle. Callers branch on this data instead of
/// catching errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvolutionStatus {
    Completed,
    Skipped,
    Error,
}

/// The record of one `evolve()` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionReport {
    pub campaign_id: String,
    pub status: EvolutionStatus,
    pub reason: Option<String>,
    /// Target generation of this cycle; None when breeding never started.
    pub generation: Option<u32>,
    pub parents_selected: usize,
    pub offspring_created: usize,
    pub average_parent_fitness: f64,
    pub finished_at: DateTime<Utc>,
}

/// Gates, sequences, and persists one full breeding cycle.
pub struct EvolutionOrchestrator {
    metrics: Arc<dyn MetricsStore>,
    variants: Arc<dyn VariantRepository>,
    lineage: Arc<dyn LineageLog>,
    config: EvolutionConfig,
}

impl EvolutionOrchestrator {
    pub fn new(
        metrics: Arc<dyn MetricsStore>,
        variants: Arc<dyn VariantRepository>,
        lineage: Arc<dyn LineageLog>,
        config: EvolutionConfig,
    ) -> Self {
        Self {
            metrics,
            variants,
            lineage,
            config,
        }
    }

    /// Run one full breeding cycle for a campaign.
    ///
    /// Not idempotent: every invocation attempts a new generation. The only
    /// brake on generation growth is the eligibility gate and whatever
    /// cadence the external trigger imposes.
    pub async fn evolve(&self, campaign_id: &str, force: bool) -> EvolutionReport {
        info!(
            campaign_id,
            force,
            phase = %CyclePhase::CheckingEligibility,
            "evolution cycle started"
        );

        let metrics = match self.metrics.get_aggregated_metrics(campaign_id).await {
            Ok(m) => m,
            Err(e) => {
                return self.finish_error(
                    campaign_id,
                    format!("metrics snapshot unavailable: {e}"),
                    None,
                    0,
                    0.0,
                )
            }
        };

        if metrics.is_empty() {
            return self.finish_skipped(campaign_id, "no metrics found for campaign");
        }

        let total_impressions: u64 = metrics.iter().map(|m| m.metrics.impressions).sum();
        if !force && total_impressions < self.config.min_impressions {
            return self.finish_skipped(
                campaign_id,
                format!(
                    "not enough interactions yet (have {total_impressions}, need {})",
                    self.config.min_impressions
                ),
            );
        }

        // Fitness pass. The write-back is a side effect on the variant
        // repository's records; a failed write does not stop the cycle.
        let mut scored = Vec::with_capacity(metrics.len());
        for m in &metrics {
            let fitness = fitness::score(&m.metrics, &self.config.fitness_weights);
            if let Err(e) = self.metrics.write_fitness(&m.variant_id, fitness).await {
                warn!(
                    campaign_id,
                    variant_id = %m.variant_id,
                    error = %e,
                    "fitness write-back failed"
                );
            }
            scored.push(ScoredVariant {
                variant_id: m.variant_id.clone(),
                fitness,
            });
        }

        if scored.len() < 2 {
            return self.finish_skipped(campaign_id, "not enough variants to breed (need at least 2)");
        }

        let parents = select_parents(scored, self.config.breeding_pool_pct);
        let parents_selected = parents.len();
        let average_parent_fitness =
            parents.iter().map(|p| p.fitness).sum::<f64>() / parents.len() as f64;

        // Load parent configurations; unloadable parents drop out of the pool.
        let mut loaded: Vec<Variant> = Vec::with_capacity(parents.len());
        for parent in &parents {
            match self.variants.get_variant_by_id(&parent.variant_id).await {
                Ok(Some(v)) => loaded.push(v),
                Ok(None) => warn!(
                    campaign_id,
                    variant_id = %parent.variant_id,
                    "parent variant missing, dropping from pool"
                ),
                Err(e) => warn!(
                    campaign_id,
                    variant_id = %parent.variant_id,
                    error = %e,
                    "parent variant unloadable, dropping from pool"
                ),
            }
        }
        if loaded.len() < 2 {
            return self.finish_skipped(campaign_id, "fewer than 2 loadable parent configurations");
        }

        let generation = loaded
            .iter()
            .map(|v| v.agent_config.evolution.generation)
            .max()
            .unwrap_or(0)
            + 1;

        info!(
            campaign_id,
            phase = %CyclePhase::Breeding,
            parents = loaded.len(),
            generation,
            "breeding from parent pool"
        );

        // Group by (agent_type, segment); only groups of two or more breed.
        let mut groups: HashMap<(String, String), Vec<Variant>> = HashMap::new();
        for v in loaded {
            groups
                .entry((v.agent_type.clone(), v.segment.clone()))
                .or_default()
                .push(v);
        }

        let mut offspring: Vec<(String, String, Offspring)> = Vec::new();
        for ((agent_type, segment), group) in groups {
            if group.len() < 2 {
                continue;
            }
            let mut rng = rand::rng();
            match genetics::breed_group(&mut rng, &group, self.config.mutation_rate) {
                Ok(bred) => offspring.extend(
                    bred.into_iter()
                        .map(|o| (agent_type.clone(), segment.clone(), o)),
                ),
                Err(e) => warn!(
                    campaign_id,
                    agent_type = %agent_type,
                    segment = %segment,
                    error = %e,
                    "breeding group failed"
                ),
            }
        }

        info!(
            campaign_id,
            phase = %CyclePhase::Persisting,
            offspring = offspring.len(),
            "persisting offspring"
        );

        let mut created = 0usize;
        for (agent_type, segment, child) in &offspring {
            match self
                .persist_offspring(campaign_id, agent_type, segment, child)
                .await
            {
                Ok(child_id) => {
                    created += 1;
                    info!(campaign_id, child_id = %child_id, "offspring created");
                }
                Err(e) => {
                    warn!(campaign_id, error = %e, "offspring persistence failed, skipping")
                }
            }
        }

        if created == 0 {
            let reason = if offspring.is_empty() {
                "no breeding group with at least 2 parents".to_string()
            } else {
                "all offspring failed to persist".to_string()
            };
            return self.finish_error(
                campaign_id,
                reason,
                Some(generation),
                parents_selected,
                average_parent_fitness,
            );
        }

        info!(
            campaign_id,
            phase = %CyclePhase::Completed,
            generation,
            offspring_created = created,
            "evolution cycle completed"
        );

        EvolutionReport {
            campaign_id: campaign_id.to_string(),
            status: EvolutionStatus::Completed,
            reason: None,
            generation: Some(generation),
            parents_selected,
            offspring_created: created,
            average_parent_fitness,
            finished_at: Utc::now(),
        }
    }

    /// Create the offspring variant, then append its lineage record.
    ///
    /// The variant exists even if the audit append fails; lineage is an
    /// append-only trail, not a transaction participant.
    async fn persist_offspring(
        &self,
        campaign_id: &str,
        agent_type: &str,
        segment: &str,
        child: &Offspring,
    ) -> Result<String, AdLiftError> {
        let child_id = self
            .variants
            .create_variant(&NewVariant {
                campaign_id: campaign_id.to_string(),
                segment: segment.to_string(),
                agent_type: agent_type.to_string(),
                agent_config: child.config.clone(),
            })
            .await?;

        let generation = child.config.evolution.generation;
        let record = EvolutionHistoryRecord {
            campaign_id: campaign_id.to_string(),
            generation,
            parent_ids: child.parent_ids.clone(),
            child_id: child_id.clone(),
            mutations_applied: child.mutations_applied.clone(),
            reason: format!("automatic evolution cycle - generation {generation}"),
            timestamp: Utc::now(),
        };
        if let Err(e) = self.lineage.append(&record).await {
            warn!(campaign_id, child_id = %child_id, error = %e, "lineage append failed");
        }

        Ok(child_id)
    }

    fn finish_skipped(&self, campaign_id: &str, reason: impl Into<String>) -> EvolutionReport {
        let reason = reason.into();
        info!(campaign_id, phase = %CyclePhase::Skipped, reason = %reason, "evolution cycle skipped");
        EvolutionReport {
            campaign_id: campaign_id.to_string(),
            status: EvolutionStatus::Skipped,
            reason: Some(reason),
            generation: None,
            parents_selected: 0,
            offspring_created: 0,
            average_parent_fitness: 0.0,
            finished_at: Utc::now(),
        }
    }

    fn finish_error(
        &self,
        campaign_id: &str,
        reason: String,
        generation: Option<u32>,
        parents_selected: usize,
        average_parent_fitness: f64,
    ) -> EvolutionReport {
        warn!(campaign_id, phase = %CyclePhase::Error, reason = %reason, "evolution cycle failed");
        EvolutionReport {
            campaign_id: campaign_id.to_string(),
            status: EvolutionStatus::Error,
            reason: Some(reason),
            generation,
            parents_selected,
            offspring_created: 0,
            average_parent_fitness,
            finished_at: Utc::now(),
        }
    }
}
