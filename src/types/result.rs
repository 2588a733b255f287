use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Classification of a failed invocation. The orchestrator never throws
/// these past its boundary; they travel inside a failed ExecutionResult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AgentNotFound,
    CapabilityNotFound,
    AgentUnavailable,
    AgentDisabled,
    WorkflowNotFound,
    WorkflowDisabled,
    StepTimeout,
    ExecutionFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::AgentNotFound => "agent_not_found",
            ErrorKind::CapabilityNotFound => "capability_not_found",
            ErrorKind::AgentUnavailable => "agent_unavailable",
            ErrorKind::AgentDisabled => "agent_disabled",
            ErrorKind::WorkflowNotFound => "workflow_not_found",
            ErrorKind::WorkflowDisabled => "workflow_disabled",
            ErrorKind::StepTimeout => "step_timeout",
            ErrorKind::ExecutionFailure => "execution_failure",
        }
    }

    /// Whether the caller may reasonably retry later. Caller errors and
    /// config errors are not retryable; health-gate refusals and timeouts
    /// are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::AgentUnavailable | ErrorKind::StepTimeout)
    }
}

/// Normalized outcome of one capability invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub data: Value,
    pub confidence: Option<f32>,
    pub needs_human_review: bool,
    #[serde(default)]
    pub manager_review_items: Vec<String>,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl ExecutionResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            confidence: None,
            needs_human_review: false,
            manager_review_items: Vec::new(),
            suggested_actions: Vec::new(),
            warnings: Vec::new(),
            error: None,
            error_kind: None,
            metadata: HashMap::new(),
        }
    }

    /// Failed results carry no data, only the error and its kind.
    pub fn failure(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            confidence: None,
            needs_human_review: false,
            manager_review_items: Vec::new(),
            suggested_actions: Vec::new(),
            warnings: Vec::new(),
            error: Some(error.into()),
            error_kind: Some(kind),
            metadata: HashMap::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_meta(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Escalate this result to a human operator.
    pub fn flag_for_review(&mut self, item: impl Into<String>, action: impl Into<String>) {
        self.needs_human_review = true;
        self.manager_review_items.push(item.into());
        self.suggested_actions.push(action.into());
    }
}
