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

const NOTICE_PROMPT: &str = r#"You write short progress notices for a personal-data removal service.

Given a JSON payload with the user's first name and their removal counts,
write a two-sentence plain-language update. Respond with a JSON object:
{"data": {"notice": "..."}, "confidence": 0.0-1.0}"#;

/// Owns user-facing content generation: notices and scan summaries.
pub struct ContentAgent {
    descriptor: AgentDescriptor,
    hybrid: HybridRunner,
}

impl ContentAgent {
    pub const ID: &'static str = "content";

    pub fn new(provider: Option<Arc<dyn LLMProvider>>, review: ReviewPolicy) -> Self {
        let descriptor = AgentDescriptor {
            id: Self::ID.to_string(),
            name: "Content Generation".to_string(),
            domain: AgentDomain::Content,
            mode: AgentMode::OnDemand,
            version: "1.0.0".to_string(),
            description: "Drafts user-facing notices and scan summaries".to_string(),
            capabilities: vec![
                Capability::new("draft_notice", "Draft a progress notice", true, false),
                Capability::new("render_summary", "Render a scan summary", false, true),
            ],
        };

        Self {
            descriptor,
            hybrid: HybridRunner::new(provider, review),
        }
    }
}

#[async_trait]
impl Agent for ContentAgent {
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
            "draft_notice" => {
                self.hybrid
                    .run(cap, NOTICE_PROMPT, &NoticeRules, input, ctx)
                    .await
            }
            "render_summary" => self.hybrid.run(cap, "", &SummaryRules, input, ctx).await,
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

/// Deterministic fallback: fixed-template notice.
struct NoticeRules;

#[async_trait]
impl ExecutionStrategy for NoticeRules {
    fn name(&self) -> &str {
        "notice_rules"
    }

    async fn run(&self, input: &Value, _ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let name = input["user_name"].as_str().unwrap_or("there");
        let removed = input["removed_count"].as_u64().unwrap_or(0);
        let pending = input["pending_count"].as_u64().unwrap_or(0);

        let notice = format!(
            "Hi {name}, we have removed your information from {removed} site(s) so far. \
             {pending} request(s) are still in progress and we will keep checking on them."
        );

        Ok(ExecutionResult::ok(json!({ "notice": notice })).with_confidence(0.8))
    }
}

/// Pure aggregation of scan statistics into a one-line summary.
struct SummaryRules;

#[async_trait]
impl ExecutionStrategy for SummaryRules {
    fn name(&self) -> &str {
        "summary_rules"
    }

    async fn run(&self, input: &Value, _ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let scanned = input["scanned"].as_u64().unwrap_or(0);
        let found = input["found"].as_u64().unwrap_or(0);
        let removed = input["removed"].as_u64().unwrap_or(0);

        Ok(ExecutionResult::ok(json!({
            "summary": format!(
                "Scanned {scanned} broker(s): {found} listing(s) found, {removed} removed."
            ),
            "scanned": scanned,
            "found": found,
            "removed": removed,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> ContentAgent {
        ContentAgent::new(None, ReviewPolicy::new(0.7))
    }

    #[tokio::test]
    async fn test_draft_notice_rule_fallback() {
        let result = agent()
            .execute(
                "draft_notice",
                &json!({"user_name": "Sam", "removed_count": 4, "pending_count": 2}),
                &ExecutionContext::on_demand(),
            )
            .await
            .unwrap();

        assert!(result.success);
        let notice = result.data["notice"].as_str().unwrap();
        assert!(notice.contains("Sam"));
        assert!(notice.contains('4'));
    }

    #[tokio::test]
    async fn test_render_summary() {
        let result = agent()
            .execute(
                "render_summary",
                &json!({"scanned": 50, "found": 12, "removed": 9}),
                &ExecutionContext::scheduled(),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.data["summary"].as_str().unwrap().contains("12"));
        assert!(result.confidence.is_none());
    }
}
