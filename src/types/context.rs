use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use super::{InvocationType, Priority, RequestId};

/// Per-invocation metadata threaded through one call chain. Short-lived,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub request_id: RequestId,
    pub invocation_type: InvocationType,
    pub priority: Priority,
    pub prefer_ai: bool,
    pub user_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(invocation_type: InvocationType) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            invocation_type,
            priority: Priority::Normal,
            prefer_ai: true,
            user_id: None,
            metadata: HashMap::new(),
        }
    }

    pub fn on_demand() -> Self {
        Self::new(InvocationType::OnDemand)
    }

    pub fn scheduled() -> Self {
        Self::new(InvocationType::Scheduled)
    }

    pub fn manual() -> Self {
        Self::new(InvocationType::Manual)
    }

    pub fn batch() -> Self {
        Self::new(InvocationType::Batch)
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Copy of this context with the AI preference cleared. Used when the
    /// health monitor reports the AI path down for the target agent.
    pub fn without_ai(&self) -> Self {
        let mut ctx = self.clone();
        ctx.prefer_ai = false;
        ctx
    }

    /// Copy of this context with a fresh request id. Each dispatch in a
    /// batch counts as its own invocation.
    pub fn derived(&self) -> Self {
        let mut ctx = self.clone();
        ctx.request_id = Uuid::new_v4();
        ctx
    }
}
