use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::storage::traits::{OutcomeRecord, OutcomeStore};

pub struct PostgresOutcomeStore {
    pool: PgPool,
}

impl PostgresOutcomeStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(include_str!("../../migrations/V001__outcomes.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OutcomeStore for PostgresOutcomeStore {
    async fn record_outcome(&self, outcome: &OutcomeRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO execution_outcomes
                (id, request_id, agent_id, capability_id, invocation_type,
                 success, confidence, needs_human_review, error, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(outcome.id)
        .bind(outcome.request_id)
        .bind(&outcome.agent_id)
        .bind(&outcome.capability_id)
        .bind(outcome.invocation_type.as_str())
        .bind(outcome.success)
        .bind(outcome.confidence)
        .bind(outcome.needs_human_review)
        .bind(&outcome.error)
        .bind(outcome.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
