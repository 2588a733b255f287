use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{ExecutionContext, ExecutionResult, InvocationType};

/// One persisted invocation outcome. The engine writes these and never reads
/// them back; routing decisions are made from live health counters only.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OutcomeRecord {
    pub id: Uuid,
    pub request_id: Uuid,
    pub agent_id: String,
    pub capability_id: String,
    pub invocation_type: InvocationType,
    pub success: bool,
    pub confidence: Option<f32>,
    pub needs_human_review: bool,
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl OutcomeRecord {
    pub fn from_result(
        agent_id: &str,
        capability_id: &str,
        ctx: &ExecutionContext,
        result: &ExecutionResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id: ctx.request_id,
            agent_id: agent_id.to_string(),
            capability_id: capability_id.to_string(),
            invocation_type: ctx.invocation_type,
            success: result.success,
            confidence: result.confidence,
            needs_human_review: result.needs_human_review,
            error: result.error.clone(),
            recorded_at: Utc::now(),
        }
    }
}

/// Write-only sink for outcome history.
#[async_trait]
pub trait OutcomeStore: Send + Sync {
    async fn record_outcome(&self, outcome: &OutcomeRecord) -> Result<()>;
}
