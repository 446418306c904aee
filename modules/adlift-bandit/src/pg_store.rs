//! Durable arm statistics in Postgres.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use adlift_common::{AdLiftError, ArmKey, BetaDelta, BetaParams};

use crate::store::ArmStore;

/// Keyed Postgres store for Beta parameters.
///
/// The upsert is a single `INSERT … ON CONFLICT … DO UPDATE` statement, so
/// concurrent rewards on the same arm serialize on the row and no update is
/// lost.
#[derive(Clone)]
pub struct PgArmStore {
    pool: PgPool,
}

impl PgArmStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, AdLiftError> {
        let pool = PgPool::connect(url).await.map_err(db_err)?;
        Ok(Self { pool })
    }

    /// Create the arm_stats table when it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), AdLiftError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS arm_stats (
                campaign_id TEXT             NOT NULL,
                segment     TEXT             NOT NULL,
                arm_id      TEXT             NOT NULL,
                alpha       DOUBLE PRECISION NOT NULL,
                beta        DOUBLE PRECISION NOT NULL,
                updated_at  TIMESTAMPTZ      NOT NULL DEFAULT now(),
                PRIMARY KEY (campaign_id, segment, arm_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        info!("arm_stats schema ready");
        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> AdLiftError {
    AdLiftError::Database(e.to_string())
}

#[async_trait]
impl ArmStore for PgArmStore {
    async fn get_all(&self, key: &ArmKey) -> Result<HashMap<String, BetaParams>, AdLiftError> {
        let rows = sqlx::query_as::<_, (String, f64, f64)>(
            r#"
            SELECT arm_id, alpha, beta
            FROM arm_stats
            WHERE campaign_id = $1 AND segment = $2
            "#,
        )
        .bind(&key.campaign_id)
        .bind(&key.segment)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(arm_id, alpha, beta)| (arm_id, BetaParams { alpha, beta }))
            .collect())
    }

    async fn upsert(
        &self,
        key: &ArmKey,
        arm_id: &str,
        delta: BetaDelta,
    ) -> Result<BetaParams, AdLiftError> {
        let (alpha, beta) = sqlx::query_as::<_, (f64, f64)>(
            r#"
            INSERT INTO arm_stats (campaign_id, segment, arm_id, alpha, beta)
            VALUES ($1, $2, $3, 1.0 + $4, 1.0 + $5)
            ON CONFLICT (campaign_id, segment, arm_id)
            DO UPDATE SET alpha = arm_stats.alpha + $4,
                          beta  = arm_stats.beta  + $5,
                          updated_at = now()
            RETURNING alpha, beta
            "#,
        )
        .bind(&key.campaign_id)
        .bind(&key.segment)
        .bind(arm_id)
        .bind(delta.alpha)
        .bind(delta.beta)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(BetaParams { alpha, beta })
    }
}
