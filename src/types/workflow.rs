use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// One step of a workflow, mapped to an orchestrator action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub name: String,
    pub action: String,
    #[serde(default = "default_true")]
    pub required: bool,
}

impl WorkflowStep {
    pub fn new(id: &str, name: &str, action: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            action: action.to_string(),
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Static workflow definition. Loaded once, read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub version: String,
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// Engine-level execution options for one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOptions {
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_true")]
    pub stop_on_error: bool,
    pub timeout_ms: Option<u64>,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            stop_on_error: true,
            timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_required_defaults_true() {
        let step: WorkflowStep = serde_json::from_str(
            r#"{"id": "s1", "name": "Step 1", "action": "submit_removal"}"#,
        )
        .unwrap();
        assert!(step.required);

        let step: WorkflowStep = serde_json::from_str(
            r#"{"id": "s2", "name": "Step 2", "action": "draft_notice", "required": false}"#,
        )
        .unwrap();
        assert!(!step.required);
    }

    #[test]
    fn test_options_defaults() {
        let options = WorkflowOptions::default();
        assert!(!options.parallel);
        assert!(options.stop_on_error);
        assert!(options.timeout_ms.is_none());
    }

    #[test]
    fn test_workflow_deserializes_from_yaml() {
        let yaml = r#"
id: recheck
name: Recheck
description: Re-verify a pending removal
version: "1.0.0"
steps:
  - id: verify
    name: Verify
    action: verify_removal
  - id: schedule
    name: Schedule
    action: schedule_recheck
    required: false
"#;
        let workflow: Workflow = serde_yaml::from_str(yaml).unwrap();
        assert!(workflow.enabled);
        assert_eq!(workflow.steps.len(), 2);
        assert!(workflow.steps[0].required);
        assert!(!workflow.steps[1].required);
    }
}
