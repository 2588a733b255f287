use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::agents::Agent;
use crate::error::EngineError;

/// Per-agent operational toggles, independent of the agent's own code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub enabled: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub total_agents: usize,
    pub enabled_agents: usize,
    pub total_capabilities: usize,
    pub by_domain: HashMap<String, usize>,
    pub by_mode: HashMap<String, usize>,
}

/// Process-wide catalog of registered agents. Registration happens once at
/// start-up; lookups are read-mostly afterwards.
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Arc<dyn Agent>>>,
    configs: RwLock<HashMap<String, AgentConfig>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            configs: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, agent: Arc<dyn Agent>) -> Result<(), EngineError> {
        let descriptor = agent.descriptor();

        if let Some(capability) = descriptor.duplicate_capability() {
            return Err(EngineError::DuplicateCapability {
                agent: descriptor.id.clone(),
                capability: capability.to_string(),
            });
        }

        let mut agents = self.agents.write().unwrap();
        if agents.contains_key(&descriptor.id) {
            return Err(EngineError::DuplicateAgent(descriptor.id.clone()));
        }

        self.configs
            .write()
            .unwrap()
            .entry(descriptor.id.clone())
            .or_default();
        agents.insert(descriptor.id.clone(), agent);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.read().unwrap().get(id).cloned()
    }

    pub fn config(&self, id: &str) -> AgentConfig {
        self.configs
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), EngineError> {
        if !self.agents.read().unwrap().contains_key(id) {
            return Err(EngineError::AgentNotFound(id.to_string()));
        }
        self.configs
            .write()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .enabled = enabled;
        Ok(())
    }

    /// All registered agents, ordered by id for stable listings.
    pub fn all(&self) -> Vec<Arc<dyn Agent>> {
        let mut agents: Vec<_> = self.agents.read().unwrap().values().cloned().collect();
        agents.sort_by(|a, b| a.descriptor().id.cmp(&b.descriptor().id));
        agents
    }

    pub fn len(&self) -> usize {
        self.agents.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> RegistryStats {
        let agents = self.agents.read().unwrap();
        let configs = self.configs.read().unwrap();

        let mut by_domain: HashMap<String, usize> = HashMap::new();
        let mut by_mode: HashMap<String, usize> = HashMap::new();
        let mut total_capabilities = 0;
        let mut enabled_agents = 0;

        for agent in agents.values() {
            let descriptor = agent.descriptor();
            *by_domain
                .entry(descriptor.domain.as_str().to_string())
                .or_insert(0) += 1;
            *by_mode
                .entry(descriptor.mode.as_str().to_string())
                .or_insert(0) += 1;
            total_capabilities += descriptor.capability_count();

            if configs.get(&descriptor.id).map(|c| c.enabled).unwrap_or(true) {
                enabled_agents += 1;
            }
        }

        RegistryStats {
            total_agents: agents.len(),
            enabled_agents,
            total_capabilities,
            by_domain,
            by_mode,
        }
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{builtin_agents, ReviewPolicy};

    fn populated_registry() -> AgentRegistry {
        let registry = AgentRegistry::new();
        for agent in builtin_agents(None, ReviewPolicy::new(0.7)) {
            registry.register(agent).unwrap();
        }
        registry
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = populated_registry();
        assert_eq!(registry.len(), 4);
        assert!(registry.get("removal").is_some());
        assert!(registry.get("ghost-agent").is_none());
    }

    #[test]
    fn test_lookup_returns_same_instance() {
        let registry = populated_registry();
        let a = registry.get("removal").unwrap();
        let b = registry.get("removal").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_duplicate_registration_rejected_and_count_unchanged() {
        let registry = populated_registry();
        let duplicate = builtin_agents(None, ReviewPolicy::new(0.7))
            .into_iter()
            .next()
            .unwrap();

        let err = registry.register(duplicate).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateAgent(_)));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_stats() {
        let registry = populated_registry();
        let stats = registry.stats();

        assert_eq!(stats.total_agents, 4);
        assert_eq!(stats.enabled_agents, 4);
        assert_eq!(stats.total_capabilities, 10);
        assert_eq!(stats.by_domain.get("removal"), Some(&1));
        assert_eq!(stats.by_mode.get("on_demand"), Some(&2));
    }

    #[test]
    fn test_set_enabled() {
        let registry = populated_registry();
        registry.set_enabled("removal", false).unwrap();

        assert!(!registry.config("removal").enabled);
        assert_eq!(registry.stats().enabled_agents, 3);
        assert!(registry.set_enabled("ghost-agent", false).is_err());
    }
}
