//! Folding observed outcomes into arm posteriors.

use std::sync::Arc;

use adlift_common::{AdLiftError, ArmKey, BetaDelta, BetaParams};

use crate::store::ArmStore;

/// Applies reward deltas through the store's atomic upsert.
pub struct RewardUpdater {
    store: Arc<dyn ArmStore>,
}

impl RewardUpdater {
    pub fn new(store: Arc<dyn ArmStore>) -> Self {
        Self { store }
    }

    /// Fold one observed outcome into an arm's posterior and return the
    /// updated parameters.
    ///
    /// Positive values add to alpha, non-positive values add their magnitude
    /// to beta. Accumulation is unbounded: posterior mass only grows over a
    /// campaign's life. An arm rewarded before it was ever selected is
    /// created at the prior plus the delta.
    pub async fn reward(
        &self,
        campaign_id: &str,
        segment: &str,
        arm_id: &str,
        value: f64,
    ) -> Result<BetaParams, AdLiftError> {
        let key = ArmKey::new(campaign_id, segment);
        self.store
            .upsert(&key, arm_id, BetaDelta::from_reward(value))
            .await
    }
}
