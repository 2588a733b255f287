pub mod action;
pub mod batch;
pub mod catalog;
pub mod dispatch;
pub mod orchestrator;
pub mod workflow;

pub use action::{ActionMap, ActionRoute, WORKFLOW_PREFIX};
pub use batch::{BatchOptions, BatchReport, BatchRunner};
pub use catalog::WorkflowCatalog;
pub use dispatch::Dispatcher;
pub use orchestrator::{
    AgentStatus, OrchestrationRequest, OrchestrationResponse, Orchestrator, StatusReport,
    StatusSummary,
};
pub use workflow::{WorkflowEngine, WorkflowRun};

use std::sync::Arc;
use tokio::time::Duration;

use crate::agents::{builtin_agents, ReviewPolicy};
use crate::config::Config;
use crate::error::EngineError;
use crate::health::HealthMonitor;
use crate::providers::LLMProvider;
use crate::registry::AgentRegistry;
use crate::storage::OutcomeStore;

/// The wired-up engine: explicitly constructed at process start and passed
/// around by reference, no hidden globals.
pub struct Engine {
    pub registry: Arc<AgentRegistry>,
    pub monitor: Arc<HealthMonitor>,
    pub catalog: Arc<WorkflowCatalog>,
    pub orchestrator: Arc<Orchestrator>,
    pub batch: Arc<BatchRunner>,
}

/// Registers the builtin agent set and workflow catalog and validates the
/// action vocabulary against them.
pub fn assemble(
    config: &Config,
    provider: Option<Arc<dyn LLMProvider>>,
    outcomes: Arc<dyn OutcomeStore>,
) -> Result<Engine, EngineError> {
    let registry = Arc::new(AgentRegistry::new());
    let review = ReviewPolicy::new(config.confidence_threshold);
    for agent in builtin_agents(provider, review) {
        registry.register(agent)?;
    }

    let monitor = Arc::new(HealthMonitor::new(config.failure_threshold));
    let catalog = Arc::new(WorkflowCatalog::builtin());

    let orchestrator = Arc::new(Orchestrator::new(
        registry.clone(),
        monitor.clone(),
        catalog.clone(),
        ActionMap::builtin(),
        outcomes,
        Duration::from_millis(config.workflow_timeout_ms),
    )?);

    let batch = Arc::new(BatchRunner::new(
        orchestrator.dispatcher(),
        orchestrator.action_map(),
    ));

    Ok(Engine {
        registry,
        monitor,
        catalog,
        orchestrator,
        batch,
    })
}
