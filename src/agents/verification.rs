use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

use super::hybrid::{ExecutionStrategy, HybridRunner, ReviewPolicy};
use super::Agent;
use crate::providers::LLMProvider;
use crate::types::{
    AgentDescriptor, AgentDomain, AgentMode, Capability, ErrorKind, ExecutionContext,
    ExecutionResult,
};

const VERIFY_PROMPT: &str = r#"You verify whether personal-data listings were actually removed.

Given a JSON payload describing a previously found listing and the current
scan observation, decide whether the listing is gone. Respond with a JSON
object:
{"data": {"removed": true/false, "evidence": "..."}, "confidence": 0.0-1.0}

Set "review": true when the page changed shape and the observation is
ambiguous."#;

const CLASSIFY_PROMPT: &str = r#"You decide whether a found record belongs to the monitored person.

Given a JSON payload with the record's fields and the subject's profile,
respond with a JSON object:
{"data": {"is_match": true/false, "matched_fields": [...]}, "confidence": 0.0-1.0}"#;

/// Recheck cadence caps out at quarterly.
const MAX_RECHECK_DAYS: i64 = 90;

/// Owns scan verification: confirming removals, matching records to
/// subjects, and scheduling rechecks.
pub struct VerificationAgent {
    descriptor: AgentDescriptor,
    hybrid: HybridRunner,
}

impl VerificationAgent {
    pub const ID: &'static str = "verification";

    pub fn new(provider: Option<Arc<dyn LLMProvider>>, review: ReviewPolicy) -> Self {
        let descriptor = AgentDescriptor {
            id: Self::ID.to_string(),
            name: "Scan Verification".to_string(),
            domain: AgentDomain::Verification,
            mode: AgentMode::Automatic,
            version: "1.0.0".to_string(),
            description: "Confirms removals and matches found records to subjects".to_string(),
            capabilities: vec![
                Capability::new("verify_removal", "Verify a removal", true, true),
                Capability::new("classify_match", "Classify a found record", true, false),
                Capability::new("schedule_recheck", "Schedule the next recheck", false, false),
            ],
        };

        Self {
            descriptor,
            hybrid: HybridRunner::new(provider, review),
        }
    }
}

#[async_trait]
impl Agent for VerificationAgent {
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
            "verify_removal" => {
                self.hybrid
                    .run(cap, VERIFY_PROMPT, &VerifyRules, input, ctx)
                    .await
            }
            "classify_match" => {
                self.hybrid
                    .run(cap, CLASSIFY_PROMPT, &ClassifyRules, input, ctx)
                    .await
            }
            "schedule_recheck" => self.hybrid.run(cap, "", &RecheckRules, input, ctx).await,
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

/// Deterministic fallback: trust the scanner's presence flag.
struct VerifyRules;

fn verdict_of(item: &Value) -> Value {
    let present = item["listing_present"].as_bool().unwrap_or(true);
    json!({
        "broker": item["broker"],
        "removed": !present,
    })
}

#[async_trait]
impl ExecutionStrategy for VerifyRules {
    fn name(&self) -> &str {
        "verify_rules"
    }

    async fn run(&self, input: &Value, _ctx: &ExecutionContext) -> Result<ExecutionResult> {
        if let Some(items) = input["items"].as_array() {
            let verdicts: Vec<Value> = items.iter().map(verdict_of).collect();
            let removed = verdicts.iter().filter(|v| v["removed"] == true).count();
            let still_listed = verdicts.len() - removed;
            return Ok(ExecutionResult::ok(json!({
                "verdicts": verdicts,
                "removed": removed,
                "still_listed": still_listed,
            }))
            .with_confidence(0.8));
        }

        Ok(ExecutionResult::ok(verdict_of(input)).with_confidence(0.8))
    }
}

/// Deterministic fallback: field-overlap score against the subject profile.
struct ClassifyRules;

#[async_trait]
impl ExecutionStrategy for ClassifyRules {
    fn name(&self) -> &str {
        "classify_rules"
    }

    async fn run(&self, input: &Value, _ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let matched = input["matched_fields"]
            .as_array()
            .map(|f| f.len())
            .unwrap_or(0);
        let total = input["total_fields"].as_u64().unwrap_or(0).max(1) as usize;
        let score = matched as f32 / total as f32;

        Ok(ExecutionResult::ok(json!({
            "is_match": score >= 0.5,
            "match_score": score,
            "matched_fields": input["matched_fields"],
        }))
        .with_confidence(score.max(1.0 - score)))
    }
}

/// Exponential backoff on recheck attempts, capped at quarterly.
struct RecheckRules;

#[async_trait]
impl ExecutionStrategy for RecheckRules {
    fn name(&self) -> &str {
        "recheck_rules"
    }

    async fn run(&self, input: &Value, _ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let attempt = input["attempt"].as_u64().unwrap_or(0).min(16) as u32;
        let days = (7i64 << attempt).min(MAX_RECHECK_DAYS);
        let next_check = Utc::now() + Duration::days(days);

        Ok(ExecutionResult::ok(json!({
            "attempt": attempt,
            "interval_days": days,
            "next_check": next_check.to_rfc3339(),
        })))
    }
}
