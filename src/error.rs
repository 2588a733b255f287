use thiserror::Error;

use crate::types::ErrorKind;

/// Typed errors surfaced at the registration, catalog, and API boundary.
/// Capability failures never travel this way; they are returned as failed
/// ExecutionResults (see types::result).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Agent '{0}' is already registered")]
    DuplicateAgent(String),

    #[error("Agent '{agent}' declares duplicate capability '{capability}'")]
    DuplicateCapability { agent: String, capability: String },

    #[error("Agent '{0}' not found")]
    AgentNotFound(String),

    #[error("Agent '{agent}' has no capability '{capability}'")]
    CapabilityNotFound { agent: String, capability: String },

    #[error("Agent '{0}' is unavailable")]
    AgentUnavailable(String),

    #[error("Agent '{0}' is disabled")]
    AgentDisabled(String),

    #[error("Workflow '{0}' not found")]
    WorkflowNotFound(String),

    #[error("Workflow '{0}' is disabled")]
    WorkflowDisabled(String),

    #[error("Workflow '{0}' is already registered")]
    DuplicateWorkflow(String),

    #[error("Invalid workflow definition: {0}")]
    InvalidWorkflow(String),

    #[error("Unknown action '{0}'")]
    UnknownAction(String),
}

impl EngineError {
    /// Result-level classification for errors that can also appear as
    /// failed ExecutionResults.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EngineError::AgentNotFound(_) => Some(ErrorKind::AgentNotFound),
            EngineError::CapabilityNotFound { .. } | EngineError::UnknownAction(_) => {
                Some(ErrorKind::CapabilityNotFound)
            }
            EngineError::AgentUnavailable(_) => Some(ErrorKind::AgentUnavailable),
            EngineError::AgentDisabled(_) => Some(ErrorKind::AgentDisabled),
            EngineError::WorkflowNotFound(_) => Some(ErrorKind::WorkflowNotFound),
            EngineError::WorkflowDisabled(_) => Some(ErrorKind::WorkflowDisabled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_shape() {
        let err = EngineError::AgentNotFound("ghost-agent".to_string());
        assert_eq!(err.to_string(), "Agent 'ghost-agent' not found");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            EngineError::WorkflowDisabled("x".into()).kind(),
            Some(ErrorKind::WorkflowDisabled)
        );
        assert_eq!(EngineError::DuplicateAgent("x".into()).kind(), None);
    }
}
