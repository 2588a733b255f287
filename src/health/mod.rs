use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use crate::types::HealthStatus;

/// Point-in-time view of one agent's health. Status is derived from the
/// counters at query time, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub consecutive_failures: u32,
    pub ai_available: bool,
    pub error_message: Option<String>,
}

struct AgentHealth {
    consecutive_failures: AtomicU32,
    ai_available: AtomicBool,
    last_error: RwLock<Option<String>>,
    probe_error: RwLock<Option<String>>,
}

impl AgentHealth {
    fn new() -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            ai_available: AtomicBool::new(true),
            last_error: RwLock::new(None),
            probe_error: RwLock::new(None),
        }
    }
}

/// Tracks per-agent failure counters and AI availability. The counters are
/// the only mutable shared state in the engine; one increment or reset per
/// invocation, safe under concurrent dispatches of the same agent.
pub struct HealthMonitor {
    agents: RwLock<HashMap<String, Arc<AgentHealth>>>,
    failure_threshold: u32,
}

impl HealthMonitor {
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            failure_threshold: failure_threshold.max(1),
        }
    }

    fn entry(&self, agent_id: &str) -> Arc<AgentHealth> {
        if let Some(health) = self.agents.read().unwrap().get(agent_id) {
            return health.clone();
        }
        self.agents
            .write()
            .unwrap()
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(AgentHealth::new()))
            .clone()
    }

    pub fn record_success(&self, agent_id: &str) {
        let health = self.entry(agent_id);
        health.consecutive_failures.store(0, Ordering::Relaxed);
        *health.last_error.write().unwrap() = None;
    }

    pub fn record_failure(&self, agent_id: &str, error: &str) {
        let health = self.entry(agent_id);
        health.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        *health.last_error.write().unwrap() = Some(error.to_string());
    }

    pub fn record_probe_ok(&self, agent_id: &str) {
        let health = self.entry(agent_id);
        *health.probe_error.write().unwrap() = None;
        health.ai_available.store(true, Ordering::Relaxed);
    }

    pub fn record_probe_error(&self, agent_id: &str, error: &str) {
        *self.entry(agent_id).probe_error.write().unwrap() = Some(error.to_string());
    }

    pub fn set_ai_available(&self, agent_id: &str, available: bool) {
        self.entry(agent_id)
            .ai_available
            .store(available, Ordering::Relaxed);
    }

    pub fn ai_available(&self, agent_id: &str) -> bool {
        self.entry(agent_id).ai_available.load(Ordering::Relaxed)
    }

    /// Pure function of the counters: 0 failures is HEALTHY, anything below
    /// the threshold is DEGRADED, the threshold and above is UNHEALTHY. A
    /// failed probe overrides to ERROR.
    pub fn status(&self, agent_id: &str) -> HealthStatus {
        let health = self.entry(agent_id);

        if health.probe_error.read().unwrap().is_some() {
            return HealthStatus::Error;
        }

        let failures = health.consecutive_failures.load(Ordering::Relaxed);
        if failures == 0 {
            HealthStatus::Healthy
        } else if failures < self.failure_threshold {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        }
    }

    pub fn is_available(&self, agent_id: &str) -> bool {
        self.status(agent_id).is_available()
    }

    pub fn snapshot(&self, agent_id: &str) -> HealthSnapshot {
        let health = self.entry(agent_id);
        let status = self.status(agent_id);
        let error_message = health
            .probe_error
            .read()
            .unwrap()
            .clone()
            .or_else(|| health.last_error.read().unwrap().clone());

        HealthSnapshot {
            status,
            consecutive_failures: health.consecutive_failures.load(Ordering::Relaxed),
            ai_available: health.ai_available.load(Ordering::Relaxed),
            error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untracked_agent_is_healthy() {
        let monitor = HealthMonitor::new(3);
        assert_eq!(monitor.status("removal"), HealthStatus::Healthy);
        assert!(monitor.is_available("removal"));
    }

    #[test]
    fn test_status_thresholds() {
        let monitor = HealthMonitor::new(3);

        monitor.record_failure("removal", "timeout");
        assert_eq!(monitor.status("removal"), HealthStatus::Degraded);

        monitor.record_failure("removal", "timeout");
        assert_eq!(monitor.status("removal"), HealthStatus::Degraded);

        monitor.record_failure("removal", "timeout");
        assert_eq!(monitor.status("removal"), HealthStatus::Unhealthy);
        assert!(!monitor.is_available("removal"));
    }

    #[test]
    fn test_success_resets_counter() {
        let monitor = HealthMonitor::new(3);
        for _ in 0..5 {
            monitor.record_failure("removal", "boom");
        }
        assert_eq!(monitor.status("removal"), HealthStatus::Unhealthy);

        monitor.record_success("removal");
        let snapshot = monitor.snapshot("removal");
        assert_eq!(snapshot.status, HealthStatus::Healthy);
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(snapshot.error_message.is_none());
    }

    #[test]
    fn test_probe_error_overrides_to_error_state() {
        let monitor = HealthMonitor::new(3);
        monitor.record_probe_error("growth", "probe panicked");

        assert_eq!(monitor.status("growth"), HealthStatus::Error);
        assert!(!monitor.is_available("growth"));

        monitor.record_probe_ok("growth");
        assert_eq!(monitor.status("growth"), HealthStatus::Healthy);
    }

    #[test]
    fn test_ai_availability_flag() {
        let monitor = HealthMonitor::new(3);
        assert!(monitor.ai_available("removal"));

        monitor.set_ai_available("removal", false);
        assert!(!monitor.ai_available("removal"));
        // AI loss alone does not make the agent unavailable.
        assert!(monitor.is_available("removal"));

        monitor.record_probe_ok("removal");
        assert!(monitor.ai_available("removal"));
    }

    #[test]
    fn test_concurrent_failures_all_counted() {
        let monitor = Arc::new(HealthMonitor::new(100));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let monitor = monitor.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    monitor.record_failure("removal", "x");
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(monitor.snapshot("removal").consecutive_failures, 400);
    }
}
