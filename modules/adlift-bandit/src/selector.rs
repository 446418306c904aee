//! Thompson Sampling arm selection.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use adlift_common::{AdLiftError, ArmKey, BetaDelta};

use crate::sampling::sample_beta;
use crate::store::ArmStore;

/// Outcome of one selection call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub variant_id: String,
    /// Always true: every decision is a posterior draw, never a frozen
    /// greedy choice.
    pub explore: bool,
}

/// Picks the arm whose posterior draw wins this impression.
pub struct ThompsonSelector {
    store: Arc<dyn ArmStore>,
}

impl ThompsonSelector {
    pub fn new(store: Arc<dyn ArmStore>) -> Self {
        Self { store }
    }

    /// Select an arm for one impression.
    ///
    /// Arms never seen before are persisted at the (1, 1) prior before
    /// sampling. One fresh Beta sample is drawn per requested arm per call;
    /// caching draws across calls would freeze exploration. The maximum
    /// sample wins, and an exact tie keeps the earlier arm in input order.
    /// Arms present in the store but absent from the request are ignored.
    pub async fn select(
        &self,
        campaign_id: &str,
        segment: &str,
        arms: &[String],
    ) -> Result<Selection, AdLiftError> {
        if arms.is_empty() {
            return Err(AdLiftError::Validation(
                "arms list must be non-empty".to_string(),
            ));
        }

        let key = ArmKey::new(campaign_id, segment);
        let mut params = self.store.get_all(&key).await?;

        for arm in arms {
            if !params.contains_key(arm) {
                let created = self.store.upsert(&key, arm, BetaDelta::ZERO).await?;
                params.insert(arm.clone(), created);
            }
        }

        let mut rng = rand::rng();
        let mut winner = &arms[0];
        let mut best = f64::NEG_INFINITY;
        for arm in arms {
            let p = params.get(arm).copied().unwrap_or_default();
            let sample = sample_beta(&mut rng, p.alpha, p.beta);
            if sample > best {
                best = sample;
                winner = arm;
            }
        }

        debug!(keyspace = %key, winner = %winner, sample = best, "arm selected");

        Ok(Selection {
            variant_id: winner.clone(),
            explore: true,
        })
    }
}
