//! Arm statistics storage.
//!
//! The contract is deliberately small: read a keyspace, atomically fold a
//! delta into one arm. The per-arm upsert must be atomic; concurrent reward
//! traffic on the same arm must never lose an update.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use adlift_common::{AdLiftError, ArmKey, BetaDelta, BetaParams};

/// Persistence seam for Beta parameters per (campaign, segment, arm).
///
/// Implemented by [`MemoryArmStore`] (in-process) and
/// [`crate::PgArmStore`] (durable).
#[async_trait]
pub trait ArmStore: Send + Sync {
    /// All arms recorded under one campaign/segment keyspace.
    async fn get_all(&self, key: &ArmKey) -> Result<HashMap<String, BetaParams>, AdLiftError>;

    /// Atomically fold `delta` into one arm's parameters, creating the arm at
    /// the (1, 1) prior when absent. Returns the updated parameters.
    ///
    /// A [`BetaDelta::ZERO`] upsert initializes an absent arm and leaves an
    /// existing one untouched.
    async fn upsert(
        &self,
        key: &ArmKey,
        arm_id: &str,
        delta: BetaDelta,
    ) -> Result<BetaParams, AdLiftError>;
}

/// In-process store: the production fallback when no database is configured,
/// and the store tests run against.
#[derive(Default)]
pub struct MemoryArmStore {
    arms: Mutex<HashMap<ArmKey, HashMap<String, BetaParams>>>,
}

impl MemoryArmStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArmStore for MemoryArmStore {
    async fn get_all(&self, key: &ArmKey) -> Result<HashMap<String, BetaParams>, AdLiftError> {
        Ok(self
            .arms
            .lock()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert(
        &self,
        key: &ArmKey,
        arm_id: &str,
        delta: BetaDelta,
    ) -> Result<BetaParams, AdLiftError> {
        let mut arms = self.arms.lock().await;
        let params = arms
            .entry(key.clone())
            .or_default()
            .entry(arm_id.to_string())
            .or_default();
        params.alpha += delta.alpha;
        params.beta += delta.beta;
        Ok(*params)
    }
}
