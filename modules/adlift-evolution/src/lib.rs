//! Fitness-driven regeneration of the variant population.
//!
//! Out-of-band from the bandit hot path: pull a metrics snapshot, score each
//! variant, keep the fittest as breeding stock, breed offspring with
//! crossover and mutation, persist them, and append lineage records.

pub mod fitness;
pub mod genetics;
pub mod http;
pub mod orchestrator;
pub mod selection;
pub mod traits;

pub use fitness::FitnessWeights;
pub use http::{HttpLineageLog, HttpMetricsStore, HttpVariantRepository};
pub use orchestrator::{
    CyclePhase, EvolutionConfig, EvolutionOrchestrator, EvolutionReport, EvolutionStatus,
};
pub use traits::{LineageLog, MetricsStore, VariantRepository};
