use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::providers::{LLMProvider, Message};
use crate::types::{Capability, ExecutionContext, ExecutionResult};

/// Metadata key set when the AI path failed and the rule fallback ran. The
/// dispatcher reads it to mark the agent's AI path unavailable.
pub const AI_DEGRADED_KEY: &str = "ai_degraded";

/// Escalation policy for AI-assisted results.
#[derive(Debug, Clone, Copy)]
pub struct ReviewPolicy {
    pub confidence_threshold: f32,
}

impl ReviewPolicy {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
        }
    }

    /// Flags successful results of AI capabilities whose confidence falls
    /// below the threshold. Confidence is not meaningful for rule-only
    /// capabilities, so those pass through untouched.
    pub fn apply(&self, capability: &Capability, mut result: ExecutionResult) -> ExecutionResult {
        if !capability.requires_ai || !result.success {
            return result;
        }

        let confidence = result.confidence.unwrap_or(0.0);
        if confidence < self.confidence_threshold && !result.needs_human_review {
            result.flag_for_review(
                format!(
                    "{}: confidence {:.2} below threshold {:.2}",
                    capability.id, confidence, self.confidence_threshold
                ),
                format!("Review the {} output before acting on it", capability.id),
            );
        }
        result
    }
}

/// One way of satisfying a capability. The orchestrator never sees which
/// strategy ran; both sides produce the same ExecutionResult contract.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, input: &Value, ctx: &ExecutionContext) -> Result<ExecutionResult>;
}

/// AI-assisted strategy: sends the input payload to the inference provider
/// under a capability-specific system prompt.
pub struct AiStrategy {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
}

impl AiStrategy {
    pub fn new(provider: Arc<dyn LLMProvider>, system_prompt: &str) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.to_string(),
        }
    }
}

#[async_trait]
impl ExecutionStrategy for AiStrategy {
    fn name(&self) -> &str {
        "ai"
    }

    async fn run(&self, input: &Value, _ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(serde_json::to_string(input)?),
        ];

        let response = self.provider.complete(&messages).await?;
        Ok(parse_model_output(&response))
    }
}

/// Model output is expected as a JSON object:
/// `{"data": ..., "confidence": 0.0-1.0, "review": bool}`.
/// Unstructured output is kept but marked low confidence.
fn parse_model_output(response: &str) -> ExecutionResult {
    let trimmed = response.trim();
    let candidates = std::iter::once(trimmed).chain(
        response
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with('{')),
    );

    for candidate in candidates {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
            let data = map
                .get("data")
                .cloned()
                .unwrap_or_else(|| Value::Object(map.clone()));
            let confidence = map
                .get("confidence")
                .and_then(|c| c.as_f64())
                .map(|c| c as f32)
                .unwrap_or(0.5);

            let mut result = ExecutionResult::ok(data).with_confidence(confidence);
            if map.get("review").and_then(|r| r.as_bool()).unwrap_or(false) {
                result.flag_for_review(
                    "model requested manual review",
                    "Inspect the model output before acting on it",
                );
            }
            return result;
        }
    }

    ExecutionResult::ok(json!({ "response": response }))
        .with_confidence(0.3)
        .with_warning("unstructured model output")
}

/// Selects between the AI strategy and the deterministic rule fallback for
/// one capability invocation.
pub struct HybridRunner {
    provider: Option<Arc<dyn LLMProvider>>,
    review: ReviewPolicy,
}

impl HybridRunner {
    pub fn new(provider: Option<Arc<dyn LLMProvider>>, review: ReviewPolicy) -> Self {
        Self { provider, review }
    }

    /// AI first for `requires_ai` capabilities unless the context opted out;
    /// rule fallback on AI transport failure, with a warning on the result.
    pub async fn run(
        &self,
        capability: &Capability,
        prompt: &str,
        rules: &dyn ExecutionStrategy,
        input: &Value,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionResult> {
        let mut ai_failure: Option<String> = None;

        if capability.requires_ai && ctx.prefer_ai {
            if let Some(provider) = &self.provider {
                let ai = AiStrategy::new(provider.clone(), prompt);
                match ai.run(input, ctx).await {
                    Ok(result) if result.success => {
                        let result = result.with_meta("strategy", json!("ai"));
                        return Ok(self.review.apply(capability, result));
                    }
                    Ok(result) => {
                        ai_failure =
                            Some(result.error.unwrap_or_else(|| "ai path failed".to_string()));
                    }
                    Err(e) => {
                        log::warn!("AI path failed for capability {}: {}", capability.id, e);
                        ai_failure = Some(e.to_string());
                    }
                }
            }
        }

        let mut result = rules.run(input, ctx).await?;
        result
            .metadata
            .insert("strategy".to_string(), json!(rules.name()));
        if let Some(reason) = ai_failure {
            result
                .warnings
                .push(format!("AI path unavailable, used rule fallback: {}", reason));
            result
                .metadata
                .insert(AI_DEGRADED_KEY.to_string(), json!(true));
        }
        Ok(self.review.apply(capability, result))
    }
}
