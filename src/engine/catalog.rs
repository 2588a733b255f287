use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use crate::error::EngineError;
use crate::types::{Workflow, WorkflowStep};

/// Read-only-at-runtime catalog of workflow definitions: the built-in set
/// plus any operator-supplied YAML files loaded at startup.
pub struct WorkflowCatalog {
    workflows: RwLock<HashMap<String, Workflow>>,
}

impl WorkflowCatalog {
    pub fn new() -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
        }
    }

    /// The standard workflows shipped with the engine.
    pub fn builtin() -> Self {
        let catalog = Self::new();

        catalog
            .register(Workflow {
                id: "full_removal".to_string(),
                name: "Full Removal Cycle".to_string(),
                description: "Classify a found record, file the opt-out, schedule verification"
                    .to_string(),
                enabled: true,
                version: "1.0.0".to_string(),
                steps: vec![
                    WorkflowStep::new("classify", "Classify the record", "classify_match"),
                    WorkflowStep::new("submit", "Submit the opt-out", "submit_removal"),
                    WorkflowStep::new("schedule", "Schedule the recheck", "schedule_recheck"),
                    WorkflowStep::new("notify", "Notify the user", "draft_notice").optional(),
                ],
            })
            .expect("builtin workflow ids are unique");

        catalog
            .register(Workflow {
                id: "recheck_cycle".to_string(),
                name: "Recheck Cycle".to_string(),
                description: "Re-verify pending removals and reschedule the stragglers"
                    .to_string(),
                enabled: true,
                version: "1.0.0".to_string(),
                steps: vec![
                    WorkflowStep::new("verify", "Verify the removal", "verify_removal"),
                    WorkflowStep::new("status", "Check request status", "check_removal_status"),
                    WorkflowStep::new("schedule", "Schedule the next recheck", "schedule_recheck"),
                ],
            })
            .expect("builtin workflow ids are unique");

        catalog
            .register(Workflow {
                id: "exposure_report".to_string(),
                name: "Exposure Report".to_string(),
                description: "Score current exposure and render the user summary".to_string(),
                enabled: true,
                version: "1.0.0".to_string(),
                steps: vec![
                    WorkflowStep::new("analyze", "Analyze exposure", "analyze_exposure"),
                    WorkflowStep::new("coverage", "Report coverage", "coverage_report"),
                    WorkflowStep::new("summary", "Render the summary", "render_summary")
                        .optional(),
                ],
            })
            .expect("builtin workflow ids are unique");

        catalog
    }

    fn check(workflow: &Workflow) -> Result<(), EngineError> {
        if workflow.steps.is_empty() {
            return Err(EngineError::InvalidWorkflow(format!(
                "workflow '{}' has no steps",
                workflow.id
            )));
        }
        for (i, step) in workflow.steps.iter().enumerate() {
            if workflow.steps[..i].iter().any(|s| s.id == step.id) {
                return Err(EngineError::InvalidWorkflow(format!(
                    "workflow '{}' repeats step id '{}'",
                    workflow.id, step.id
                )));
            }
        }
        Ok(())
    }

    pub fn register(&self, workflow: Workflow) -> Result<(), EngineError> {
        Self::check(&workflow)?;
        let mut workflows = self.workflows.write().unwrap();
        if workflows.contains_key(&workflow.id) {
            return Err(EngineError::DuplicateWorkflow(workflow.id));
        }
        workflows.insert(workflow.id.clone(), workflow);
        Ok(())
    }

    /// Loads operator-defined workflows from a YAML document (a sequence of
    /// workflow definitions). Entries replace same-id workflows, so an
    /// operator file can override a built-in.
    pub fn load_yaml(&self, source: &str) -> Result<usize, EngineError> {
        let parsed: Vec<Workflow> = serde_yaml::from_str(source)
            .map_err(|e| EngineError::InvalidWorkflow(e.to_string()))?;

        for workflow in &parsed {
            Self::check(workflow)?;
        }

        let count = parsed.len();
        let mut workflows = self.workflows.write().unwrap();
        for workflow in parsed {
            workflows.insert(workflow.id.clone(), workflow);
        }
        Ok(count)
    }

    pub fn load_yaml_file(&self, path: &Path) -> Result<usize, EngineError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| EngineError::InvalidWorkflow(format!("{}: {}", path.display(), e)))?;
        self.load_yaml(&source)
    }

    pub fn get(&self, id: &str) -> Option<Workflow> {
        self.workflows.read().unwrap().get(id).cloned()
    }

    /// Catalog listing, ordered by id for stable output.
    pub fn list(&self) -> Vec<Workflow> {
        let mut workflows: Vec<_> = self.workflows.read().unwrap().values().cloned().collect();
        workflows.sort_by(|a, b| a.id.cmp(&b.id));
        workflows
    }

    pub fn len(&self) -> usize {
        self.workflows.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WorkflowCatalog {
    fn default() -> Self {
        Self::new()
    }
}
