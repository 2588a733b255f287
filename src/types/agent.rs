use serde::{Deserialize, Serialize};

use super::{AgentDomain, AgentMode};

/// One named operation an agent can perform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub id: String,
    pub name: String,
    pub requires_ai: bool,
    pub supports_batch: bool,
}

impl Capability {
    pub fn new(id: &str, name: &str, requires_ai: bool, supports_batch: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            requires_ai,
            supports_batch,
        }
    }
}

/// Static description of a registered agent. Immutable after registration;
/// the mutable health snapshot lives in the HealthMonitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: String,
    pub name: String,
    pub domain: AgentDomain,
    pub mode: AgentMode,
    pub version: String,
    pub description: String,
    pub capabilities: Vec<Capability>,
}

impl AgentDescriptor {
    pub fn capability(&self, id: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.id == id)
    }

    pub fn capability_count(&self) -> usize {
        self.capabilities.len()
    }

    /// Capability ids must be unique within the owning agent.
    pub fn duplicate_capability(&self) -> Option<&str> {
        for (i, cap) in self.capabilities.iter().enumerate() {
            if self.capabilities[..i].iter().any(|c| c.id == cap.id) {
                return Some(&cap.id);
            }
        }
        None
    }
}
