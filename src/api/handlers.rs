use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::agents::Agent;
use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::engine::{AgentStatus, OrchestrationRequest, OrchestrationResponse, StatusReport};
use crate::health::HealthSnapshot;
use crate::registry::{AgentConfig, RegistryStats};
use crate::types::{AgentDescriptor, ErrorKind, ExecutionContext, ExecutionResult, Workflow};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn get_config(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "failure_threshold": state.config.failure_threshold,
        "confidence_threshold": state.config.confidence_threshold,
        "workflow_timeout_ms": state.config.workflow_timeout_ms,
        "batch_chunk_size": state.config.batch_chunk_size,
    }))
}

#[derive(Deserialize)]
pub struct InvokeRequest {
    pub agent_id: String,
    pub capability_id: String,
    #[serde(default)]
    pub input: Value,
    pub context: Option<ExecutionContext>,
}

#[derive(Serialize)]
pub struct InvokeResponse {
    pub success: bool,
    pub result: ExecutionResult,
    pub metadata: HashMap<String, Value>,
    pub error: Option<String>,
}

/// Direct capability invocation. Unknown ids and health-gate refusals map to
/// HTTP statuses; a capability that ran and failed is still a 200 with
/// `success=false`.
pub async fn invoke(
    State(state): State<AppState>,
    Json(request): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, ApiError> {
    let ctx = request.context.unwrap_or_else(ExecutionContext::on_demand);
    let result = state
        .orchestrator
        .invoke(&request.agent_id, &request.capability_id, &request.input, &ctx)
        .await;

    match result.error_kind {
        Some(ErrorKind::AgentNotFound) | Some(ErrorKind::CapabilityNotFound) => Err(
            ApiError::not_found(result.error.unwrap_or_else(|| "not found".to_string())),
        ),
        Some(ErrorKind::AgentUnavailable) | Some(ErrorKind::AgentDisabled) => Err(
            ApiError::unavailable(result.error.unwrap_or_else(|| "unavailable".to_string())),
        ),
        _ => {
            let mut metadata = HashMap::new();
            metadata.insert("request_id".to_string(), json!(ctx.request_id));
            metadata.insert("agent_id".to_string(), json!(request.agent_id));
            metadata.insert("capability_id".to_string(), json!(request.capability_id));

            Ok(Json(InvokeResponse {
                success: result.success,
                error: result.error.clone(),
                metadata,
                result,
            }))
        }
    }
}

pub async fn orchestrate(
    State(state): State<AppState>,
    Json(request): Json<OrchestrationRequest>,
) -> Json<OrchestrationResponse> {
    Json(state.orchestrator.orchestrate(request).await)
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.orchestrator.status_report())
}

#[derive(Serialize)]
pub struct AgentsResponse {
    pub agents: Vec<AgentDescriptor>,
    pub stats: RegistryStats,
}

pub async fn list_agents(State(state): State<AppState>) -> Json<AgentsResponse> {
    let agents = state
        .registry
        .all()
        .iter()
        .map(|agent| agent.descriptor().clone())
        .collect();

    Json(AgentsResponse {
        agents,
        stats: state.registry.stats(),
    })
}

#[derive(Serialize)]
pub struct AgentDetail {
    pub descriptor: AgentDescriptor,
    pub config: AgentConfig,
    pub health: HealthSnapshot,
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AgentDetail>, ApiError> {
    let agent = state
        .registry
        .get(&id)
        .ok_or_else(|| ApiError::not_found(format!("Agent '{}' not found", id)))?;

    Ok(Json(AgentDetail {
        descriptor: agent.descriptor().clone(),
        config: state.registry.config(&id),
        health: state.monitor.snapshot(&id),
    }))
}

pub async fn list_workflows(State(state): State<AppState>) -> Json<Vec<Workflow>> {
    Json(state.catalog.list())
}

#[derive(Deserialize, Default)]
pub struct ValidateRequest {
    pub agent_id: Option<String>,
}

/// Batch QA entrypoint: probes agents without executing any capability.
pub async fn validate(
    State(state): State<AppState>,
    request: Option<Json<ValidateRequest>>,
) -> Result<Json<Vec<AgentStatus>>, ApiError> {
    let agent_id = request.and_then(|Json(r)| r.agent_id);
    let statuses = state
        .orchestrator
        .validate(agent_id.as_deref())
        .await
        .map_err(ApiError::from)?;
    Ok(Json(statuses))
}
