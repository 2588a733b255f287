pub mod content;
pub mod growth;
pub mod hybrid;
pub mod removal;
pub mod verification;

pub use content::ContentAgent;
pub use growth::GrowthAgent;
pub use hybrid::{AiStrategy, ExecutionStrategy, HybridRunner, ReviewPolicy};
pub use removal::RemovalAgent;
pub use verification::VerificationAgent;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::providers::LLMProvider;
use crate::types::{AgentDescriptor, ExecutionContext, ExecutionResult};

/// A registered component owning one domain of capabilities. Descriptors are
/// immutable after registration; execution must be safe under concurrent
/// invocations.
#[async_trait]
pub trait Agent: Send + Sync {
    fn descriptor(&self) -> &AgentDescriptor;

    async fn execute(
        &self,
        capability: &str,
        input: &Value,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionResult>;

    /// Cheap liveness check used by the QA validation surface. Runs no
    /// capability.
    async fn probe(&self) -> Result<()> {
        Ok(())
    }
}

/// The standard agent set registered at process start.
pub fn builtin_agents(
    provider: Option<Arc<dyn LLMProvider>>,
    review: ReviewPolicy,
) -> Vec<Arc<dyn Agent>> {
    vec![
        Arc::new(RemovalAgent::new(provider.clone(), review)),
        Arc::new(VerificationAgent::new(provider.clone(), review)),
        Arc::new(GrowthAgent::new(provider.clone(), review)),
        Arc::new(ContentAgent::new(provider, review)),
    ]
}
