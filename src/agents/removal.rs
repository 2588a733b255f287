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

const SUBMIT_PROMPT: &str = r#"You draft opt-out requests for a personal-data removal service.

Given a JSON payload with the data broker, the contact channel, and the
subject's details, draft the removal request text. Respond with a JSON object:
{"data": {"request": "...", "broker": "...", "channel": "..."}, "confidence": 0.0-1.0}

Set "review": true if the broker's process is unusual or the payload is
incomplete."#;

const APPEAL_PROMPT: &str = r#"You draft appeal letters for rejected data-removal requests.

Given a JSON payload with the broker, the rejection reason, and the original
request, draft a firm but professional appeal citing the subject's right to
erasure. Respond with a JSON object:
{"data": {"appeal": "...", "broker": "..."}, "confidence": 0.0-1.0}"#;

/// Days after which an unanswered opt-out request is considered overdue.
const OVERDUE_AFTER_DAYS: u64 = 45;

/// Owns the removal domain: filing opt-out requests against data brokers and
/// tracking their progress.
pub struct RemovalAgent {
    descriptor: AgentDescriptor,
    hybrid: HybridRunner,
}

impl RemovalAgent {
    pub const ID: &'static str = "removal";

    pub fn new(provider: Option<Arc<dyn LLMProvider>>, review: ReviewPolicy) -> Self {
        let descriptor = AgentDescriptor {
            id: Self::ID.to_string(),
            name: "Removal Automation".to_string(),
            domain: AgentDomain::Removal,
            mode: AgentMode::Hybrid,
            version: "1.0.0".to_string(),
            description: "Files and tracks opt-out requests against data brokers".to_string(),
            capabilities: vec![
                Capability::new("submit_request", "Submit opt-out request", true, false),
                Capability::new("check_status", "Check request status", false, true),
                Capability::new("generate_appeal", "Generate appeal letter", true, false),
            ],
        };

        Self {
            descriptor,
            hybrid: HybridRunner::new(provider, review),
        }
    }
}

#[async_trait]
impl Agent for RemovalAgent {
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
            "submit_request" => {
                self.hybrid
                    .run(cap, SUBMIT_PROMPT, &SubmitRules, input, ctx)
                    .await
            }
            "check_status" => self.hybrid.run(cap, "", &StatusRules, input, ctx).await,
            "generate_appeal" => {
                self.hybrid
                    .run(cap, APPEAL_PROMPT, &AppealRules, input, ctx)
                    .await
            }
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

/// Deterministic fallback: template-based opt-out request.
struct SubmitRules;

#[async_trait]
impl ExecutionStrategy for SubmitRules {
    fn name(&self) -> &str {
        "submit_rules"
    }

    async fn run(&self, input: &Value, _ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let broker = input["broker"].as_str().unwrap_or("the data broker");
        let channel = input["channel"].as_str().unwrap_or("email");
        let subject = input["subject_name"].as_str().unwrap_or("the data subject");

        let request = format!(
            "To {broker}: I am writing on behalf of {subject} to request the removal \
             of their personal information from your records and any public listings. \
             Please confirm deletion within 45 days as required by applicable privacy law."
        );

        Ok(ExecutionResult::ok(json!({
            "request": request,
            "broker": broker,
            "channel": channel,
        }))
        .with_confidence(0.75))
    }
}

/// Pure status derivation; handles single payloads and batch item arrays.
struct StatusRules;

fn status_of(item: &Value) -> Value {
    let days = item["days_since_submission"].as_u64().unwrap_or(0);
    let confirmed = item["confirmation_received"].as_bool().unwrap_or(false);

    let status = if confirmed {
        "confirmed"
    } else if days > OVERDUE_AFTER_DAYS {
        "overdue"
    } else {
        "pending"
    };

    json!({
        "broker": item["broker"],
        "status": status,
        "days_since_submission": days,
    })
}

#[async_trait]
impl ExecutionStrategy for StatusRules {
    fn name(&self) -> &str {
        "status_rules"
    }

    async fn run(&self, input: &Value, _ctx: &ExecutionContext) -> Result<ExecutionResult> {
        if let Some(items) = input["items"].as_array() {
            let statuses: Vec<Value> = items.iter().map(status_of).collect();
            let overdue = statuses
                .iter()
                .filter(|s| s["status"] == "overdue")
                .count();

            let mut result = ExecutionResult::ok(json!({
                "statuses": statuses,
                "overdue": overdue,
            }));
            if overdue > 0 {
                result.flag_for_review(
                    format!("{} removal request(s) overdue", overdue),
                    "Resubmit the overdue opt-out requests or escalate to the broker",
                );
            }
            return Ok(result);
        }

        let status = status_of(input);
        let mut result = ExecutionResult::ok(status.clone());
        if status["status"] == "overdue" {
            result.flag_for_review(
                "removal request overdue",
                "Resubmit the opt-out request or escalate to the broker",
            );
        }
        Ok(result)
    }
}

/// Deterministic fallback: boilerplate appeal citing the right to erasure.
struct AppealRules;

#[async_trait]
impl ExecutionStrategy for AppealRules {
    fn name(&self) -> &str {
        "appeal_rules"
    }

    async fn run(&self, input: &Value, _ctx: &ExecutionContext) -> Result<ExecutionResult> {
        let broker = input["broker"].as_str().unwrap_or("the data broker");
        let reason = input["rejection_reason"].as_str().unwrap_or("unspecified");

        let appeal = format!(
            "To {broker}: your rejection (reason: {reason}) does not satisfy the \
             subject's statutory right to erasure. We request that you reprocess the \
             removal or provide the specific legal basis for retention within 30 days."
        );

        Ok(ExecutionResult::ok(json!({
            "appeal": appeal,
            "broker": broker,
        }))
        .with_confidence(0.7))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> RemovalAgent {
        RemovalAgent::new(None, ReviewPolicy::new(0.7))
    }

    #[tokio::test]
    async fn test_unknown_capability_is_a_failed_result() {
        let result = agent()
            .execute("scrape_site", &json!({}), &ExecutionContext::on_demand())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::CapabilityNotFound));
    }

    #[tokio::test]
    async fn test_submit_request_falls_back_to_rules_without_provider() {
        let result = agent()
            .execute(
                "submit_request",
                &json!({"broker": "PeopleFinder", "subject_name": "J. Doe"}),
                &ExecutionContext::on_demand(),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.metadata["strategy"], "submit_rules");
        assert!(result.data["request"]
            .as_str()
            .unwrap()
            .contains("PeopleFinder"));
    }

    #[tokio::test]
    async fn test_check_status_overdue_escalates() {
        let result = agent()
            .execute(
                "check_status",
                &json!({"broker": "PeopleFinder", "days_since_submission": 60}),
                &ExecutionContext::scheduled(),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.data["status"], "overdue");
        assert!(result.needs_human_review);
        assert!(!result.suggested_actions.is_empty());
    }

    #[tokio::test]
    async fn test_check_status_batch_items() {
        let result = agent()
            .execute(
                "check_status",
                &json!({"items": [
                    {"broker": "A", "days_since_submission": 10},
                    {"broker": "B", "confirmation_received": true},
                    {"broker": "C", "days_since_submission": 90},
                ]}),
                &ExecutionContext::batch(),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.data["statuses"].as_array().unwrap().len(), 3);
        assert_eq!(result.data["overdue"], 1);
    }
}
