use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Duration;

use super::action::{ActionMap, WORKFLOW_PREFIX};
use super::catalog::WorkflowCatalog;
use super::dispatch::Dispatcher;
use super::workflow::WorkflowEngine;
use crate::agents::Agent;
use crate::error::EngineError;
use crate::health::HealthMonitor;
use crate::registry::AgentRegistry;
use crate::storage::OutcomeStore;
use crate::types::{
    ErrorKind, ExecutionContext, ExecutionResult, HealthStatus, Workflow, WorkflowOptions,
};

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestrationRequest {
    pub action: String,
    #[serde(default)]
    pub input: Value,
    pub context: Option<ExecutionContext>,
    pub workflow: Option<WorkflowOptions>,
}

impl OrchestrationRequest {
    pub fn action(action: &str, input: Value) -> Self {
        Self {
            action: action.to_string(),
            input,
            context: None,
            workflow: None,
        }
    }

    pub fn with_options(mut self, options: WorkflowOptions) -> Self {
        self.workflow = Some(options);
        self
    }

    pub fn with_context(mut self, ctx: ExecutionContext) -> Self {
        self.context = Some(ctx);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct OrchestrationResponse {
    pub success: bool,
    pub results: Vec<ExecutionResult>,
    pub metadata: HashMap<String, Value>,
    pub errors: Vec<String>,
    pub is_workflow: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub agent_id: String,
    pub name: String,
    pub status: HealthStatus,
    pub is_available: bool,
    pub consecutive_failures: u32,
    pub ai_available: bool,
    pub capability_count: usize,
    pub issues: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub unhealthy: usize,
    pub error: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub agents: Vec<AgentStatus>,
    pub summary: StatusSummary,
    pub workflows: Vec<Workflow>,
}

/// Resolves a requested action or workflow against the registry and
/// normalizes the outcome. Stateless apart from the static action map and
/// its references to the engine parts.
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    monitor: Arc<HealthMonitor>,
    catalog: Arc<WorkflowCatalog>,
    actions: Arc<ActionMap>,
    dispatcher: Arc<Dispatcher>,
    workflows: WorkflowEngine,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<AgentRegistry>,
        monitor: Arc<HealthMonitor>,
        catalog: Arc<WorkflowCatalog>,
        actions: ActionMap,
        outcomes: Arc<dyn OutcomeStore>,
        default_workflow_timeout: Duration,
    ) -> Result<Self, EngineError> {
        actions.validate(&registry)?;
        let actions = Arc::new(actions);
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            monitor.clone(),
            outcomes,
        ));
        let workflows = WorkflowEngine::new(
            catalog.clone(),
            actions.clone(),
            dispatcher.clone(),
            default_workflow_timeout,
        );

        Ok(Self {
            registry,
            monitor,
            catalog,
            actions,
            dispatcher,
            workflows,
        })
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn action_map(&self) -> Arc<ActionMap> {
        self.actions.clone()
    }

    /// Routes a single action or a `workflow.*` action and returns the
    /// normalized result set. Failures come back inside the response; this
    /// never errors.
    pub async fn orchestrate(&self, request: OrchestrationRequest) -> OrchestrationResponse {
        let ctx = request.context.unwrap_or_else(ExecutionContext::on_demand);

        let mut metadata = HashMap::new();
        metadata.insert("request_id".to_string(), json!(ctx.request_id));
        metadata.insert("action".to_string(), json!(request.action));

        let is_workflow =
            request.action.starts_with(WORKFLOW_PREFIX) || request.workflow.is_some();

        if is_workflow {
            let workflow_id = request
                .action
                .strip_prefix(WORKFLOW_PREFIX)
                .unwrap_or(&request.action)
                .to_string();
            let options = request.workflow.unwrap_or_default();

            return match self
                .workflows
                .run(&workflow_id, &request.input, &ctx, &options)
                .await
            {
                Ok(run) => {
                    metadata.insert("workflow_id".to_string(), json!(run.workflow_id));
                    metadata.insert("aborted".to_string(), json!(run.aborted));
                    let errors = run.results.iter().filter_map(|r| r.error.clone()).collect();
                    OrchestrationResponse {
                        success: run.success,
                        results: run.results,
                        metadata,
                        errors,
                        is_workflow: true,
                    }
                }
                Err(e) => OrchestrationResponse {
                    success: false,
                    results: Vec::new(),
                    metadata,
                    errors: vec![e.to_string()],
                    is_workflow: true,
                },
            };
        }

        let result = match self.actions.resolve(&request.action) {
            Some(route) => {
                self.dispatcher
                    .dispatch(&route.agent_id, &route.capability_id, &request.input, &ctx)
                    .await
            }
            None => ExecutionResult::failure(
                ErrorKind::CapabilityNotFound,
                format!("Unknown action '{}'", request.action),
            ),
        };

        OrchestrationResponse {
            success: result.success,
            errors: result.error.iter().cloned().collect(),
            results: vec![result],
            metadata,
            is_workflow: false,
        }
    }

    /// Direct capability invocation, bypassing the action vocabulary.
    pub async fn invoke(
        &self,
        agent_id: &str,
        capability_id: &str,
        input: &Value,
        ctx: &ExecutionContext,
    ) -> ExecutionResult {
        self.dispatcher
            .dispatch(agent_id, capability_id, input, ctx)
            .await
    }

    /// QA surface: probes one agent or all of them without executing any
    /// capability, refreshing the monitor's probe state.
    pub async fn validate(&self, agent_id: Option<&str>) -> Result<Vec<AgentStatus>, EngineError> {
        let agents = match agent_id {
            Some(id) => vec![self
                .registry
                .get(id)
                .ok_or_else(|| EngineError::AgentNotFound(id.to_string()))?],
            None => self.registry.all(),
        };

        let probes = futures::future::join_all(agents.iter().map(|agent| agent.probe())).await;

        let mut statuses = Vec::with_capacity(agents.len());
        for (agent, probe) in agents.iter().zip(probes) {
            let id = &agent.descriptor().id;
            match probe {
                Ok(()) => self.monitor.record_probe_ok(id),
                Err(e) => {
                    log::warn!("health probe failed for agent {}: {}", id, e);
                    self.monitor.record_probe_error(id, &e.to_string());
                }
            }
            statuses.push(self.agent_status(agent));
        }
        Ok(statuses)
    }

    fn agent_status(&self, agent: &Arc<dyn Agent>) -> AgentStatus {
        let descriptor = agent.descriptor();
        let snapshot = self.monitor.snapshot(&descriptor.id);
        let enabled = self.registry.config(&descriptor.id).enabled;

        let mut issues = Vec::new();
        if !enabled {
            issues.push("disabled by operator config".to_string());
        }
        if snapshot.consecutive_failures > 0 {
            issues.push(format!(
                "{} consecutive failure(s)",
                snapshot.consecutive_failures
            ));
        }
        if !snapshot.ai_available {
            issues.push("AI path unavailable".to_string());
        }
        if let Some(message) = &snapshot.error_message {
            issues.push(message.clone());
        }

        AgentStatus {
            agent_id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            status: snapshot.status,
            is_available: enabled && snapshot.status.is_available(),
            consecutive_failures: snapshot.consecutive_failures,
            ai_available: snapshot.ai_available,
            capability_count: descriptor.capability_count(),
            issues,
        }
    }

    /// Introspection: per-agent health plus the workflow catalog.
    pub fn status_report(&self) -> StatusReport {
        let agents: Vec<AgentStatus> = self
            .registry
            .all()
            .iter()
            .map(|agent| self.agent_status(agent))
            .collect();

        let mut summary = StatusSummary::default();
        for agent in &agents {
            summary.total += 1;
            match agent.status {
                HealthStatus::Healthy => summary.healthy += 1,
                HealthStatus::Degraded => summary.degraded += 1,
                HealthStatus::Unhealthy => summary.unhealthy += 1,
                HealthStatus::Error => summary.error += 1,
            }
        }

        StatusReport {
            agents,
            summary,
            workflows: self.catalog.list(),
        }
    }
}
