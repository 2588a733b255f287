use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::{timeout_at, Duration, Instant};

use super::action::ActionMap;
use super::catalog::WorkflowCatalog;
use super::dispatch::Dispatcher;
use crate::error::EngineError;
use crate::types::{
    ErrorKind, ExecutionContext, ExecutionResult, Workflow, WorkflowOptions, WorkflowStep,
};

/// Outcome of one workflow run. Results stay aligned with the declared step
/// order; a halted or aborted run simply has fewer of them.
#[derive(Debug)]
pub struct WorkflowRun {
    pub workflow_id: String,
    pub results: Vec<ExecutionResult>,
    pub aborted: bool,
    pub success: bool,
}

/// Executes the ordered steps of a workflow against the dispatcher, with
/// sequential or parallel scheduling, stop-on-error semantics, and a
/// wall-clock bound for the whole run.
pub struct WorkflowEngine {
    catalog: Arc<WorkflowCatalog>,
    actions: Arc<ActionMap>,
    dispatcher: Arc<Dispatcher>,
    default_timeout: Duration,
}

fn annotate(step: &WorkflowStep, mut result: ExecutionResult) -> ExecutionResult {
    result.metadata.insert("step".to_string(), json!(step.id));
    result
        .metadata
        .insert("action".to_string(), json!(step.action));
    result
}

async fn run_step(
    dispatcher: &Dispatcher,
    actions: &ActionMap,
    step: &WorkflowStep,
    input: &Value,
    ctx: &ExecutionContext,
) -> ExecutionResult {
    let result = match actions.resolve(&step.action) {
        Some(route) => {
            dispatcher
                .dispatch(&route.agent_id, &route.capability_id, input, ctx)
                .await
        }
        None => ExecutionResult::failure(
            ErrorKind::CapabilityNotFound,
            format!("Unknown action '{}' for step '{}'", step.action, step.id),
        ),
    };
    annotate(step, result)
}

fn step_timeout(step: &WorkflowStep) -> ExecutionResult {
    annotate(
        step,
        ExecutionResult::failure(
            ErrorKind::StepTimeout,
            format!("Step '{}' exceeded the workflow time budget", step.id),
        ),
    )
}

/// Every required step must have run and succeeded. Results are positionally
/// aligned with the steps, so a halted run fails any required step it never
/// reached.
fn aggregate_success(workflow: &Workflow, results: &[ExecutionResult]) -> bool {
    workflow.steps.iter().enumerate().all(|(i, step)| {
        !step.required || results.get(i).map(|r| r.success).unwrap_or(false)
    })
}

impl WorkflowEngine {
    pub fn new(
        catalog: Arc<WorkflowCatalog>,
        actions: Arc<ActionMap>,
        dispatcher: Arc<Dispatcher>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            actions,
            dispatcher,
            default_timeout,
        }
    }

    pub async fn run(
        &self,
        workflow_id: &str,
        input: &Value,
        ctx: &ExecutionContext,
        options: &WorkflowOptions,
    ) -> Result<WorkflowRun, EngineError> {
        let workflow = self
            .catalog
            .get(workflow_id)
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))?;

        if !workflow.enabled {
            return Err(EngineError::WorkflowDisabled(workflow.id));
        }

        let timeout = options
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout);
        let deadline = Instant::now() + timeout;

        let (results, aborted) = if options.parallel {
            self.run_parallel(&workflow, input, ctx, deadline).await
        } else {
            self.run_sequential(&workflow, input, ctx, options.stop_on_error, deadline)
                .await
        };

        let success = !aborted && aggregate_success(&workflow, &results);
        Ok(WorkflowRun {
            workflow_id: workflow.id,
            results,
            aborted,
            success,
        })
    }

    /// Step N settles before step N+1 starts. The first failed required step
    /// halts the remainder under stop_on_error; completed results are always
    /// returned.
    async fn run_sequential(
        &self,
        workflow: &Workflow,
        input: &Value,
        ctx: &ExecutionContext,
        stop_on_error: bool,
        deadline: Instant,
    ) -> (Vec<ExecutionResult>, bool) {
        let mut results = Vec::with_capacity(workflow.steps.len());
        let mut aborted = false;

        for step in &workflow.steps {
            if Instant::now() >= deadline {
                results.push(step_timeout(step));
                aborted = true;
                break;
            }

            match timeout_at(deadline, run_step(&self.dispatcher, &self.actions, step, input, ctx))
                .await
            {
                Ok(result) => {
                    let halt = stop_on_error && step.required && !result.success;
                    results.push(result);
                    if halt {
                        break;
                    }
                }
                Err(_) => {
                    results.push(step_timeout(step));
                    aborted = true;
                    break;
                }
            }
        }

        (results, aborted)
    }

    /// All steps dispatched concurrently; the engine waits for every step to
    /// settle or for the deadline. Steps still outstanding at the deadline
    /// are recorded as timed out, not silently dropped; their tasks are left
    /// to finish on their own (cooperative cancellation only).
    async fn run_parallel(
        &self,
        workflow: &Workflow,
        input: &Value,
        ctx: &ExecutionContext,
        deadline: Instant,
    ) -> (Vec<ExecutionResult>, bool) {
        let mut handles = Vec::with_capacity(workflow.steps.len());
        for step in &workflow.steps {
            let dispatcher = self.dispatcher.clone();
            let actions = self.actions.clone();
            let step = step.clone();
            let input = input.clone();
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                run_step(&dispatcher, &actions, &step, &input, &ctx).await
            }));
        }

        let mut results = Vec::with_capacity(workflow.steps.len());
        let mut aborted = false;

        for (step, handle) in workflow.steps.iter().zip(handles) {
            match timeout_at(deadline, handle).await {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => {
                    log::error!("workflow step '{}' panicked: {}", step.id, e);
                    results.push(annotate(
                        step,
                        ExecutionResult::failure(
                            ErrorKind::ExecutionFailure,
                            format!("Step '{}' panicked", step.id),
                        ),
                    ));
                }
                Err(_) => {
                    results.push(step_timeout(step));
                    aborted = true;
                }
            }
        }

        (results, aborted)
    }
}
