pub mod agent;
pub mod context;
pub mod result;
pub mod workflow;

pub use agent::{AgentDescriptor, Capability};
pub use context::ExecutionContext;
pub use result::{ErrorKind, ExecutionResult};
pub use workflow::{Workflow, WorkflowOptions, WorkflowStep};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RequestId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentDomain {
    Removal,
    Verification,
    Growth,
    Content,
}

impl AgentDomain {
    pub fn as_str(&self) -> &str {
        match self {
            AgentDomain::Removal => "removal",
            AgentDomain::Verification => "verification",
            AgentDomain::Growth => "growth",
            AgentDomain::Content => "content",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    Automatic,
    OnDemand,
    Hybrid,
}

impl AgentMode {
    pub fn as_str(&self) -> &str {
        match self {
            AgentMode::Automatic => "automatic",
            AgentMode::OnDemand => "on_demand",
            AgentMode::Hybrid => "hybrid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationType {
    OnDemand,
    Scheduled,
    Manual,
    Batch,
}

impl InvocationType {
    pub fn as_str(&self) -> &str {
        match self {
            InvocationType::OnDemand => "on_demand",
            InvocationType::Scheduled => "scheduled",
            InvocationType::Manual => "manual",
            InvocationType::Batch => "batch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,   // No consecutive failures
    Degraded,  // Failing but still dispatchable
    Unhealthy, // Failure threshold reached, dispatch refused
    Error,     // Health probe itself failed
}

impl HealthStatus {
    pub fn as_str(&self) -> &str {
        match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Degraded => "DEGRADED",
            HealthStatus::Unhealthy => "UNHEALTHY",
            HealthStatus::Error => "ERROR",
        }
    }

    /// Whether an agent in this state may receive dispatches. ERROR is
    /// treated the same as UNHEALTHY.
    pub fn is_available(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_availability() {
        assert!(HealthStatus::Healthy.is_available());
        assert!(HealthStatus::Degraded.is_available());
        assert!(!HealthStatus::Unhealthy.is_available());
        assert!(!HealthStatus::Error.is_available());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }
}
