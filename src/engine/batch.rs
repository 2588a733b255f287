use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::{Duration, Instant};

use super::action::ActionMap;
use super::dispatch::Dispatcher;
use crate::agents::Agent;
use crate::error::EngineError;
use crate::types::{ExecutionContext, ExecutionResult};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Hard wall-clock budget for the whole batch.
    pub deadline_ms: u64,
    /// Items per payload for capabilities that support batch input.
    pub chunk_size: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            deadline_ms: 60_000,
            chunk_size: 25,
        }
    }
}

/// A time-boxed batch is a partial result, not a failure: items left at the
/// deadline are reported as remaining, never errored.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub action: String,
    pub total_items: usize,
    pub processed_items: usize,
    pub remaining_items: usize,
    pub deadline_hit: bool,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<ExecutionResult>,
}

/// Drives a single action across many items under a wall-clock deadline.
/// This is the retry surface for the scheduled jobs: the engine itself never
/// retries, a later batch picks up the remainder.
pub struct BatchRunner {
    dispatcher: Arc<Dispatcher>,
    actions: Arc<ActionMap>,
}

impl BatchRunner {
    pub fn new(dispatcher: Arc<Dispatcher>, actions: Arc<ActionMap>) -> Self {
        Self {
            dispatcher,
            actions,
        }
    }

    pub async fn run(
        &self,
        action: &str,
        items: Vec<Value>,
        ctx: &ExecutionContext,
        options: &BatchOptions,
    ) -> Result<BatchReport, EngineError> {
        let route = self
            .actions
            .resolve(action)
            .ok_or_else(|| EngineError::UnknownAction(action.to_string()))?;

        let agent = self
            .dispatcher
            .registry()
            .get(&route.agent_id)
            .ok_or_else(|| EngineError::AgentNotFound(route.agent_id.clone()))?;
        let capability = agent
            .descriptor()
            .capability(&route.capability_id)
            .cloned()
            .ok_or_else(|| EngineError::CapabilityNotFound {
                agent: route.agent_id.clone(),
                capability: route.capability_id.clone(),
            })?;

        let deadline = Instant::now() + Duration::from_millis(options.deadline_ms);
        let total_items = items.len();
        let mut processed_items = 0;
        let mut deadline_hit = false;
        let mut results = Vec::new();

        if capability.supports_batch {
            for chunk in items.chunks(options.chunk_size.max(1)) {
                // Stop enqueuing once the budget is spent; in-flight work is
                // never cut short.
                if Instant::now() >= deadline {
                    deadline_hit = true;
                    break;
                }
                let result = self
                    .dispatcher
                    .dispatch(
                        &route.agent_id,
                        &route.capability_id,
                        &json!({ "items": chunk }),
                        &ctx.derived(),
                    )
                    .await;
                processed_items += chunk.len();
                results.push(result);
            }
        } else {
            for item in &items {
                if Instant::now() >= deadline {
                    deadline_hit = true;
                    break;
                }
                let result = self
                    .dispatcher
                    .dispatch(&route.agent_id, &route.capability_id, item, &ctx.derived())
                    .await;
                processed_items += 1;
                results.push(result);
            }
        }

        if deadline_hit {
            log::warn!(
                "batch '{}' hit its deadline with {}/{} items processed",
                action,
                processed_items,
                total_items
            );
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        Ok(BatchReport {
            action: action.to_string(),
            total_items,
            processed_items,
            remaining_items: total_items - processed_items,
            deadline_hit,
            succeeded,
            failed: results.len() - succeeded,
            results,
        })
    }
}
