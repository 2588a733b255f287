use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::hybrid::{ExecutionStrategy, HybridRunner, ReviewPolicy};
use super::Agent;
use crate::providers::LLMProvider;
use crate::types::{
    AgentDescriptor, AgentDomain, AgentMode, Capability, ErrorKind, ExecutionContext,
    ExecutionResult,
};

const EXPOSURE_PROMPT: &str = r#"You analyze a person's data-broker exposure.

Given a JSON payload listing the brokers where the subject currently appears
and each listing's sensitivity, produce an exposure assessment. Respond with
a JSON object:
{"data": {"score": 0-100, "drivers": [...]}, "confidence": 0.0-1.0}"#;

/// Sensitivity weights for the rule-based exposure score.
const WEIGHT_HIGH: u64 = 10;
const WEIGHT_MEDIUM: u64 = 5;
const WEIGHT_LOW: u64 = 2;

/// Owns growth analysis: exposure scoring and broker-coverage reporting.
pub struct GrowthAgent {
    descriptor: AgentDescriptor,
    hybrid: HybridRunner,
}

impl GrowthAgent {
    pub const ID: &'static str = "growth";

    pub fn new(provider: Option<Arc<dyn LLMProvider>>, review: ReviewPolicy) -> Self {
        let descriptor = AgentDescriptor {
            id: Self::ID.to_string(),
            name: "Growth Analysis".to_string(),
            domain: AgentDomain::Growth,
            mode: AgentMode::OnDemand,
            version: "1.0.0".to_string(),
            description: "Scores exposure and reports broker coverage".to_string(),
            capabilities: vec![
                Capability::new("analyze_exposure", "Analyze exposure", true, true),
                Capability::new("coverage_report", "Report broker coverage", false, true),
            ],
        };

        Self {
            descriptor,
            hybrid: HybridRunner::new(provider, review),
        }
    }
}

#[async_trait]
impl Agent for GrowthAgent {
    fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        capability: &str,
        input: &Value,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionResult> {
        let Some(cap) = self.descriptor.capability(capability) else {
            return Ok(ExecutionResult::failure(
                ErrorKind::CapabilityNotFound,
                format!(
                    "Agent '{}' has no capability '{}'",
                    self.descriptor.id, capability
                ),
            ));
        };

        match cap.id.as_str() {
            "analyze_exposure" => {
                self.hybrid
                    .run(cap, EXPOSURE_PROMPT, &ExposureRules, input, ctx)
                    .await
            }
            "coverage_report" => self.hybrid.run(cap, "", &CoverageRules, input, ctx).await,
            _ => Ok(ExecutionResult::failure(
                ErrorKind::CapabilityNotFound,
                format!(
                    "Agent '{}' has no capability '{}'",
                    self.descriptor.id, capability
                ),
            )),
        }
    }
}

/// Deterministic fallback: weighted listing count, clamped to 0..100.
struct ExposureRules;

fn listing_weight(listing: &Value) -> u64 {
    match listing["sensitivity"].as_str() {
        Some("high") => WEIGHT_HIGH,
        Some("medium") => WEIGHT_MEDIUM,
        _ => WEIGHT_LOW,
    }
}

#[async_trait]
impl ExecutionStrategy for ExposureRules {
    fn name(&self) -> &str {
        "exposure_rules"
    }

    async fn run(&self, input: &Value, _ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let empty = Vec::new();
        let listings = input["listings"]
            .as_array()
            .or_else(|| input["items"].as_array())
            .unwrap_or(&empty);

        let score: u64 = listings.iter().map(listing_weight).sum::<u64>().min(100);

        Ok(ExecutionResult::ok(json!({
            "score": score,
            "listing_count": listings.len(),
        }))
        .with_confidence(0.65))
    }
}

/// Pure aggregation of scan coverage.
struct CoverageRules;

#[async_trait]
impl ExecutionStrategy for CoverageRules {
    fn name(&self) -> &str {
        "coverage_rules"
    }

    async fn run(&self, input: &Value, _ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let scanned = input["brokers_scanned"].as_u64().unwrap_or(0);
        let supported = input["brokers_supported"].as_u64().unwrap_or(0).max(1);
        let coverage = (scanned as f64 / supported as f64 * 100.0).min(100.0);

        Ok(ExecutionResult::ok(json!({
            "brokers_scanned": scanned,
            "brokers_supported": supported,
            "coverage_pct": coverage.round(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> GrowthAgent {
        GrowthAgent::new(None, ReviewPolicy::new(0.7))
    }

    #[tokio::test]
    async fn test_exposure_score_is_weighted_and_clamped() {
        let listings: Vec<Value> = (0..20)
            .map(|i| json!({"broker": format!("b{}", i), "sensitivity": "high"}))
            .collect();

        let result = agent()
            .execute(
                "analyze_exposure",
                &json!({ "listings": listings }),
                &ExecutionContext::on_demand(),
            )
            .await
            .unwrap();

        assert_eq!(result.data["score"], 100);
        assert_eq!(result.data["listing_count"], 20);
    }

    #[tokio::test]
    async fn test_exposure_low_confidence_triggers_review() {
        // Rule fallback confidence (0.65) sits below the 0.7 threshold for
        // an AI capability, so the review policy escalates.
        let result = agent()
            .execute(
                "analyze_exposure",
                &json!({"listings": []}),
                &ExecutionContext::on_demand(),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.needs_human_review);
    }

    #[tokio::test]
    async fn test_coverage_report() {
        let result = agent()
            .execute(
                "coverage_report",
                &json!({"brokers_scanned": 40, "brokers_supported": 50}),
                &ExecutionContext::scheduled(),
            )
            .await
            .unwrap();

        assert_eq!(result.data["coverage_pct"], 80.0);
        assert!(!result.needs_human_review);
    }
}
