use std::collections::HashMap;

use crate::agents::Agent;
use crate::error::EngineError;
use crate::registry::AgentRegistry;

/// Actions with this prefix name workflows instead of single capabilities.
pub const WORKFLOW_PREFIX: &str = "workflow.";

#[derive(Debug, Clone)]
pub struct ActionRoute {
    pub agent_id: String,
    pub capability_id: String,
}

/// The orchestrator-owned mapping from product-level action names to
/// (agent, capability) pairs. Fixed at startup and validated against the
/// registry; an unknown action at call time is a typed refusal, never a
/// silent no-op.
pub struct ActionMap {
    routes: HashMap<String, ActionRoute>,
}

impl ActionMap {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// The action vocabulary for the standard agent set.
    pub fn builtin() -> Self {
        let mut map = Self::new();
        map.insert("submit_removal", "removal", "submit_request");
        map.insert("check_removal_status", "removal", "check_status");
        map.insert("generate_appeal", "removal", "generate_appeal");
        map.insert("verify_removal", "verification", "verify_removal");
        map.insert("classify_match", "verification", "classify_match");
        map.insert("schedule_recheck", "verification", "schedule_recheck");
        map.insert("analyze_exposure", "growth", "analyze_exposure");
        map.insert("coverage_report", "growth", "coverage_report");
        map.insert("draft_notice", "content", "draft_notice");
        map.insert("render_summary", "content", "render_summary");
        map
    }

    pub fn insert(&mut self, action: &str, agent_id: &str, capability_id: &str) {
        self.routes.insert(
            action.to_string(),
            ActionRoute {
                agent_id: agent_id.to_string(),
                capability_id: capability_id.to_string(),
            },
        );
    }

    pub fn resolve(&self, action: &str) -> Option<&ActionRoute> {
        self.routes.get(action)
    }

    pub fn actions(&self) -> Vec<&str> {
        let mut actions: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        actions.sort_unstable();
        actions
    }

    /// Every route must resolve to a registered agent and a declared
    /// capability. Run once at startup, before any dispatch.
    pub fn validate(&self, registry: &AgentRegistry) -> Result<(), EngineError> {
        for (action, route) in &self.routes {
            let agent = registry
                .get(&route.agent_id)
                .ok_or_else(|| EngineError::AgentNotFound(route.agent_id.clone()))?;

            if agent.descriptor().capability(&route.capability_id).is_none() {
                log::error!(
                    "action '{}' routes to missing capability {}/{}",
                    action,
                    route.agent_id,
                    route.capability_id
                );
                return Err(EngineError::CapabilityNotFound {
                    agent: route.agent_id.clone(),
                    capability: route.capability_id.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Default for ActionMap {
    fn default() -> Self {
        Self::new()
    }
}
