//! Integration tests for single-action orchestration: routing, the health
//! gate, hybrid confidence escalation, outcome recording, and the batch
//! runner's time box.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

use expunge::agents::{builtin_agents, Agent, ReviewPolicy};
use expunge::engine::{
    assemble, ActionMap, BatchOptions, OrchestrationRequest, Orchestrator, WorkflowCatalog,
};
use expunge::health::HealthMonitor;
use expunge::registry::AgentRegistry;
use expunge::storage::InMemoryOutcomeStore;
use expunge::types::{
    AgentDescriptor, AgentDomain, AgentMode, Capability, ErrorKind, ExecutionContext,
    ExecutionResult, HealthStatus,
};
use expunge::Config;

/// Test agent with switchable failure modes and an execution counter.
struct ScriptedAgent {
    descriptor: AgentDescriptor,
    executions: AtomicUsize,
    fail_executions: AtomicBool,
    fail_probe: AtomicBool,
    delay: Duration,
}

impl ScriptedAgent {
    fn new(id: &str) -> Self {
        Self {
            descriptor: AgentDescriptor {
                id: id.to_string(),
                name: format!("Scripted {}", id),
                domain: AgentDomain::Verification,
                mode: AgentMode::Automatic,
                version: "0.0.1".to_string(),
                description: "test double".to_string(),
                capabilities: vec![Capability::new("work", "Do work", false, false)],
            },
            executions: AtomicUsize::new(0),
            fail_executions: AtomicBool::new(false),
            fail_probe: AtomicBool::new(false),
            delay: Duration::ZERO,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn execute(
        &self,
        capability: &str,
        _input: &Value,
        _ctx: &ExecutionContext,
    ) -> Result<ExecutionResult> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_executions.load(Ordering::SeqCst) {
            return Ok(ExecutionResult::failure(
                ErrorKind::ExecutionFailure,
                format!("{} blew up", capability),
            ));
        }
        Ok(ExecutionResult::ok(json!({ "capability": capability })))
    }

    async fn probe(&self) -> Result<()> {
        if self.fail_probe.load(Ordering::SeqCst) {
            anyhow::bail!("probe exploded");
        }
        Ok(())
    }
}

fn scripted_engine(
    agent: Arc<ScriptedAgent>,
    failure_threshold: u32,
) -> (Arc<Orchestrator>, Arc<HealthMonitor>, Arc<InMemoryOutcomeStore>) {
    let registry = Arc::new(AgentRegistry::new());
    registry.register(agent.clone()).unwrap();

    let mut actions = ActionMap::new();
    actions.insert("do_work", &agent.descriptor().id, "work");

    let monitor = Arc::new(HealthMonitor::new(failure_threshold));
    let outcomes = Arc::new(InMemoryOutcomeStore::new());
    let orchestrator = Arc::new(
        Orchestrator::new(
            registry,
            monitor.clone(),
            Arc::new(WorkflowCatalog::new()),
            actions,
            outcomes.clone(),
            Duration::from_secs(30),
        )
        .unwrap(),
    );
    (orchestrator, monitor, outcomes)
}

fn builtin_engine() -> expunge::engine::Engine {
    assemble(
        &Config::default(),
        None,
        Arc::new(InMemoryOutcomeStore::new()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_unknown_agent_refused_with_structured_error() {
    let engine = builtin_engine();

    let result = engine
        .orchestrator
        .invoke(
            "ghost-agent",
            "anything",
            &json!({}),
            &ExecutionContext::on_demand(),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Agent 'ghost-agent' not found"));
    assert_eq!(result.error_kind, Some(ErrorKind::AgentNotFound));
}

#[tokio::test]
async fn test_unknown_action_is_typed_refusal() {
    let engine = builtin_engine();

    let response = engine
        .orchestrator
        .orchestrate(OrchestrationRequest::action("steal_data", json!({})))
        .await;

    assert!(!response.success);
    assert!(!response.is_workflow);
    assert_eq!(
        response.results[0].error_kind,
        Some(ErrorKind::CapabilityNotFound)
    );
}

#[tokio::test]
async fn test_unhealthy_agent_never_executes() {
    let agent = Arc::new(ScriptedAgent::new("flaky"));
    agent.fail_executions.store(true, Ordering::SeqCst);
    let (orchestrator, monitor, _) = scripted_engine(agent.clone(), 3);

    // Three failing invocations push the agent to UNHEALTHY.
    for _ in 0..3 {
        let response = orchestrator
            .orchestrate(OrchestrationRequest::action("do_work", json!({})))
            .await;
        assert!(!response.success);
    }
    assert_eq!(monitor.status("flaky"), HealthStatus::Unhealthy);
    assert_eq!(agent.executions(), 3);

    // The health gate refuses the fourth before the agent sees it.
    let response = orchestrator
        .orchestrate(OrchestrationRequest::action("do_work", json!({})))
        .await;

    assert!(!response.success);
    assert_eq!(
        response.results[0].error_kind,
        Some(ErrorKind::AgentUnavailable)
    );
    assert_eq!(agent.executions(), 3);
}

#[tokio::test]
async fn test_health_transitions_and_recovery() {
    let agent = Arc::new(ScriptedAgent::new("wobbly"));
    let (orchestrator, monitor, _) = scripted_engine(agent.clone(), 3);

    assert_eq!(monitor.status("wobbly"), HealthStatus::Healthy);

    agent.fail_executions.store(true, Ordering::SeqCst);
    for expected in [HealthStatus::Degraded, HealthStatus::Degraded, HealthStatus::Unhealthy] {
        orchestrator
            .orchestrate(OrchestrationRequest::action("do_work", json!({})))
            .await;
        assert_eq!(monitor.status("wobbly"), expected);
    }

    // Operator reset re-opens the gate; one success holds it open.
    monitor.record_success("wobbly");
    agent.fail_executions.store(false, Ordering::SeqCst);

    let response = orchestrator
        .orchestrate(OrchestrationRequest::action("do_work", json!({})))
        .await;
    assert!(response.success);
    assert_eq!(monitor.status("wobbly"), HealthStatus::Healthy);
    assert_eq!(monitor.snapshot("wobbly").consecutive_failures, 0);
}

#[tokio::test]
async fn test_disabled_agent_refused() {
    let engine = builtin_engine();
    engine.registry.set_enabled("content", false).unwrap();

    let result = engine
        .orchestrator
        .invoke(
            "content",
            "render_summary",
            &json!({}),
            &ExecutionContext::on_demand(),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::AgentDisabled));
}

#[tokio::test]
async fn test_low_confidence_result_is_escalated() {
    let engine = builtin_engine();

    // Without an inference provider the exposure analysis runs on rules at
    // confidence 0.65, under the default 0.7 threshold.
    let response = engine
        .orchestrator
        .orchestrate(OrchestrationRequest::action(
            "analyze_exposure",
            json!({"listings": [{"broker": "A", "sensitivity": "high"}]}),
        ))
        .await;

    assert!(response.success);
    let result = &response.results[0];
    assert!(result.confidence.unwrap() < 0.7);
    assert!(result.needs_human_review);
    assert!(!result.manager_review_items.is_empty());
    assert!(!result.suggested_actions.is_empty());
}

#[tokio::test]
async fn test_outcomes_are_recorded_write_only() {
    let agent = Arc::new(ScriptedAgent::new("sink"));
    let (orchestrator, _, outcomes) = scripted_engine(agent, 3);

    orchestrator
        .orchestrate(OrchestrationRequest::action("do_work", json!({})))
        .await;
    orchestrator
        .orchestrate(OrchestrationRequest::action("do_work", json!({})))
        .await;

    let records = outcomes.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.agent_id == "sink" && r.success));
    assert_ne!(records[0].request_id, records[1].request_id);
}

#[tokio::test]
async fn test_probe_failure_marks_agent_error() {
    let agent = Arc::new(ScriptedAgent::new("broken-probe"));
    agent.fail_probe.store(true, Ordering::SeqCst);
    let (orchestrator, monitor, _) = scripted_engine(agent.clone(), 3);

    let statuses = orchestrator.validate(None).await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].status, HealthStatus::Error);
    assert!(!statuses[0].is_available);
    assert!(statuses[0].issues.iter().any(|i| i.contains("probe")));

    // ERROR closes the dispatch gate like UNHEALTHY does.
    let response = orchestrator
        .orchestrate(OrchestrationRequest::action("do_work", json!({})))
        .await;
    assert_eq!(
        response.results[0].error_kind,
        Some(ErrorKind::AgentUnavailable)
    );
    assert_eq!(agent.executions(), 0);

    // A passing probe clears the sentinel.
    agent.fail_probe.store(false, Ordering::SeqCst);
    let statuses = orchestrator.validate(Some("broken-probe")).await.unwrap();
    assert_eq!(statuses[0].status, HealthStatus::Healthy);
    assert_eq!(monitor.status("broken-probe"), HealthStatus::Healthy);
}

#[tokio::test]
async fn test_validate_unknown_agent_errors() {
    let engine = builtin_engine();
    assert!(engine.orchestrator.validate(Some("ghost-agent")).await.is_err());
}

#[tokio::test]
async fn test_status_report_shape() {
    let engine = builtin_engine();
    engine.monitor.record_failure("removal", "hiccup");

    let report = engine.orchestrator.status_report();
    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.healthy, 3);
    assert_eq!(report.summary.degraded, 1);
    assert_eq!(report.workflows.len(), 3);

    let removal = report
        .agents
        .iter()
        .find(|a| a.agent_id == "removal")
        .unwrap();
    assert_eq!(removal.capability_count, 3);
    assert!(removal.is_available);
    assert_eq!(removal.consecutive_failures, 1);
}

#[tokio::test]
async fn test_batch_stops_enqueuing_at_deadline() {
    let agent = Arc::new(ScriptedAgent::new("slow").with_delay(Duration::from_millis(100)));
    let (orchestrator, _, _) = scripted_engine(agent, 10);
    let batch = expunge::engine::BatchRunner::new(
        orchestrator.dispatcher(),
        orchestrator.action_map(),
    );

    let items: Vec<Value> = (0..10).map(|i| json!({ "item": i })).collect();
    let report = batch
        .run(
            "do_work",
            items,
            &ExecutionContext::batch(),
            &BatchOptions {
                deadline_ms: 250,
                chunk_size: 25,
            },
        )
        .await
        .unwrap();

    // A partial, time-boxed report rather than a failed batch.
    assert!(report.deadline_hit);
    assert!(report.processed_items >= 1);
    assert!(report.processed_items < report.total_items);
    assert_eq!(
        report.remaining_items,
        report.total_items - report.processed_items
    );
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn test_batch_chunks_batch_capable_capability() {
    let engine = builtin_engine();

    let items: Vec<Value> = (0..60)
        .map(|i| json!({"broker": format!("b{}", i), "listing_present": i % 2 == 0}))
        .collect();

    let report = engine
        .batch
        .run(
            "verify_removal",
            items,
            &ExecutionContext::batch(),
            &BatchOptions {
                deadline_ms: 60_000,
                chunk_size: 25,
            },
        )
        .await
        .unwrap();

    assert!(!report.deadline_hit);
    assert_eq!(report.processed_items, 60);
    assert_eq!(report.results.len(), 3); // 25 + 25 + 10
    assert_eq!(report.succeeded, 3);
}

#[tokio::test]
async fn test_registry_duplicate_rejected_end_to_end() {
    let engine = builtin_engine();
    let duplicate = builtin_agents(None, ReviewPolicy::new(0.7))
        .into_iter()
        .next()
        .unwrap();

    assert!(engine.registry.register(duplicate).is_err());
    assert_eq!(engine.registry.len(), 4);
    assert_eq!(engine.registry.stats().total_capabilities, 10);
}
