use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Bandit Types ---

/// Keyspace for one campaign/segment pair.
///
/// All arm statistics are partitioned by this key. Different keys never
/// contend; concurrency control only matters within one keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArmKey {
    pub campaign_id: String,
    pub segment: String,
}

impl ArmKey {
    pub fn new(campaign_id: impl Into<String>, segment: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            segment: segment.into(),
        }
    }
}

impl std::fmt::Display for ArmKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "arms:{}:{}", self.campaign_id, self.segment)
    }
}

/// Beta posterior parameters for one arm.
///
/// Both start at 1.0 (uninformative prior) and only ever increase. Arm rows
/// are never deleted for the life of the campaign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaParams {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for BetaParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

/// Additive update folded atomically into one arm's Beta parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaDelta {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaDelta {
    /// The no-op delta. Upserting it creates an absent arm at the prior
    /// without touching an existing one, so it doubles as lazy initialization.
    pub const ZERO: BetaDelta = BetaDelta {
        alpha: 0.0,
        beta: 0.0,
    };

    /// Positive rewards accrue to alpha, non-positive to beta.
    ///
    /// A reward of exactly 0 contributes to neither parameter: the update is
    /// a documented no-op, not an implicit failure count.
    pub fn from_reward(value: f64) -> Self {
        if value > 0.0 {
            Self {
                alpha: value,
                beta: 0.0,
            }
        } else {
            Self {
                alpha: 0.0,
                beta: value.abs(),
            }
        }
    }
}

// --- Agent Configuration ---

/// How an agent speaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    pub tone: String,
    pub style: String,
    /// 2–4 traits drawn from the trait pool.
    pub traits: Vec<String>,
}

/// What an agent optimizes for and how it gets there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub objective: String,
    /// 2–4 tactics drawn from the tactic pool.
    pub tactics: Vec<String>,
    /// How quickly the agent shifts tactics in response to signals, in [0, 1].
    pub adaptation_rate: f64,
}

/// Generation parameters for the agent's text model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    pub model: String,
    /// Derived from the structured fields; regenerated on every breeding,
    /// never inherited verbatim.
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Breeding provenance carried by every agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionMeta {
    pub generation: u32,
    /// Empty for seed agents, exactly two ids for bred offspring.
    #[serde(default)]
    pub parent_ids: Vec<String>,
    pub mutation_rate: f64,
    pub fitness_score: f64,
}

/// Full configuration of one content variant's agent.
///
/// Immutable once created; each generation is a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub personality: Personality,
    pub strategy: Strategy,
    pub llm_config: LlmConfig,
    pub evolution: EvolutionMeta,
}

// --- Variants ---

/// A content variant as stored by the variant repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub campaign_id: String,
    /// Audience segment, e.g. "human" or "agent".
    pub segment: String,
    /// e.g. landing_page, social_media, placement, visual, ai_context.
    pub agent_type: String,
    pub agent_config: AgentConfig,
}

/// Payload for creating a variant. The repository assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVariant {
    pub campaign_id: String,
    pub segment: String,
    pub agent_type: String,
    pub agent_config: AgentConfig,
}

// --- Metrics ---

/// Aggregated performance counters for one variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub conversions: u64,
    #[serde(default)]
    pub revenue: f64,
}

impl PerformanceMetrics {
    /// Click-through rate. Zero when there are no impressions.
    pub fn ctr(&self) -> f64 {
        if self.impressions == 0 {
            0.0
        } else {
            self.clicks as f64 / self.impressions as f64
        }
    }

    /// Conversions per click. Zero when there are no clicks.
    pub fn cvr(&self) -> f64 {
        if self.clicks == 0 {
            0.0
        } else {
            self.conversions as f64 / self.clicks as f64
        }
    }
}

/// Metrics snapshot for one variant, as returned by the metrics store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantMetrics {
    pub variant_id: String,
    #[serde(flatten)]
    pub metrics: PerformanceMetrics,
}

// --- Lineage ---

/// One append-only lineage fact: which parents produced which child, with
/// which mutations, and why. Written once per successful offspring, never
/// updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionHistoryRecord {
    pub campaign_id: String,
    pub generation: u32,
    pub parent_ids: [String; 2],
    pub child_id: String,
    pub mutations_applied: Vec<String>,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}
