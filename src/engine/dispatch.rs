use serde_json::Value;
use std::sync::Arc;

use crate::agents::hybrid::AI_DEGRADED_KEY;
use crate::agents::Agent;
use crate::health::HealthMonitor;
use crate::registry::AgentRegistry;
use crate::storage::{OutcomeRecord, OutcomeStore};
use crate::types::{ErrorKind, ExecutionContext, ExecutionResult};

/// Executes one (agent, capability) invocation behind the availability gate.
/// Every failure mode comes back as a failed ExecutionResult; nothing is
/// thrown past this boundary.
pub struct Dispatcher {
    registry: Arc<AgentRegistry>,
    monitor: Arc<HealthMonitor>,
    outcomes: Arc<dyn OutcomeStore>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<AgentRegistry>,
        monitor: Arc<HealthMonitor>,
        outcomes: Arc<dyn OutcomeStore>,
    ) -> Self {
        Self {
            registry,
            monitor,
            outcomes,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    pub async fn dispatch(
        &self,
        agent_id: &str,
        capability_id: &str,
        input: &Value,
        ctx: &ExecutionContext,
    ) -> ExecutionResult {
        let Some(agent) = self.registry.get(agent_id) else {
            return ExecutionResult::failure(
                ErrorKind::AgentNotFound,
                format!("Agent '{}' not found", agent_id),
            );
        };

        let Some(capability) = agent.descriptor().capability(capability_id).cloned() else {
            return ExecutionResult::failure(
                ErrorKind::CapabilityNotFound,
                format!("Agent '{}' has no capability '{}'", agent_id, capability_id),
            );
        };

        if !self.registry.config(agent_id).enabled {
            return ExecutionResult::failure(
                ErrorKind::AgentDisabled,
                format!("Agent '{}' is disabled", agent_id),
            );
        }

        // The health gate runs before every dispatch; an unavailable agent
        // never sees the invocation.
        if !self.monitor.is_available(agent_id) {
            let status = self.monitor.status(agent_id);
            return ExecutionResult::failure(
                ErrorKind::AgentUnavailable,
                format!("Agent '{}' is unavailable ({})", agent_id, status.as_str()),
            );
        }

        let ctx = if capability.requires_ai && !self.monitor.ai_available(agent_id) {
            ctx.without_ai()
        } else {
            ctx.clone()
        };

        let result = match agent.execute(capability_id, input, &ctx).await {
            Ok(result) => result,
            Err(e) => ExecutionResult::failure(ErrorKind::ExecutionFailure, e.to_string()),
        };

        // One counter update per invocation, not per sub-step.
        if result.success {
            self.monitor.record_success(agent_id);
        } else {
            self.monitor.record_failure(
                agent_id,
                result.error.as_deref().unwrap_or("execution failed"),
            );
        }

        if result.metadata.get(AI_DEGRADED_KEY).is_some() {
            self.monitor.set_ai_available(agent_id, false);
        }

        let record = OutcomeRecord::from_result(agent_id, capability_id, &ctx, &result);
        if let Err(e) = self.outcomes.record_outcome(&record).await {
            log::warn!("failed to record outcome for {}: {}", agent_id, e);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{builtin_agents, ReviewPolicy};
    use crate::storage::InMemoryOutcomeStore;
    use serde_json::json;

    fn dispatcher() -> (Dispatcher, Arc<InMemoryOutcomeStore>) {
        let registry = Arc::new(AgentRegistry::new());
        for agent in builtin_agents(None, ReviewPolicy::new(0.7)) {
            registry.register(agent).unwrap();
        }
        let outcomes = Arc::new(InMemoryOutcomeStore::new());
        (
            Dispatcher::new(
                registry,
                Arc::new(HealthMonitor::new(3)),
                outcomes.clone(),
            ),
            outcomes,
        )
    }

    #[tokio::test]
    async fn test_dispatch_unknown_agent() {
        let (dispatcher, outcomes) = dispatcher();
        let result = dispatcher
            .dispatch("ghost-agent", "anything", &json!({}), &ExecutionContext::on_demand())
            .await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::AgentNotFound));
        assert_eq!(result.error.as_deref(), Some("Agent 'ghost-agent' not found"));
        // Refusals before execution are not outcome history.
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_unknown_capability() {
        let (dispatcher, _) = dispatcher();
        let result = dispatcher
            .dispatch("removal", "scrape_site", &json!({}), &ExecutionContext::on_demand())
            .await;

        assert_eq!(result.error_kind, Some(ErrorKind::CapabilityNotFound));
    }

    #[tokio::test]
    async fn test_dispatch_disabled_agent() {
        let (dispatcher, _) = dispatcher();
        dispatcher.registry().set_enabled("removal", false).unwrap();

        let result = dispatcher
            .dispatch(
                "removal",
                "check_status",
                &json!({}),
                &ExecutionContext::on_demand(),
            )
            .await;

        assert_eq!(result.error_kind, Some(ErrorKind::AgentDisabled));
    }

    #[tokio::test]
    async fn test_dispatch_unhealthy_agent_is_refused() {
        let (dispatcher, outcomes) = dispatcher();
        for _ in 0..3 {
            dispatcher.monitor().record_failure("removal", "boom");
        }

        let result = dispatcher
            .dispatch(
                "removal",
                "check_status",
                &json!({}),
                &ExecutionContext::on_demand(),
            )
            .await;

        assert_eq!(result.error_kind, Some(ErrorKind::AgentUnavailable));
        assert!(result.error.as_deref().unwrap().contains("UNHEALTHY"));
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_successful_dispatch_records_outcome_and_resets_health() {
        let (dispatcher, outcomes) = dispatcher();
        dispatcher.monitor().record_failure("removal", "blip");

        let result = dispatcher
            .dispatch(
                "removal",
                "check_status",
                &json!({"days_since_submission": 2}),
                &ExecutionContext::scheduled(),
            )
            .await;

        assert!(result.success);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes.records()[0].capability_id, "check_status");
        assert_eq!(
            dispatcher.monitor().snapshot("removal").consecutive_failures,
            0
        );
    }
}
