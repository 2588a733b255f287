use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::storage::traits::{OutcomeRecord, OutcomeStore};

#[derive(Clone)]
pub struct InMemoryOutcomeStore {
    records: Arc<RwLock<Vec<OutcomeRecord>>>,
}

impl InMemoryOutcomeStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> Vec<OutcomeRecord> {
        self.records.read().unwrap().clone()
    }
}

impl Default for InMemoryOutcomeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutcomeStore for InMemoryOutcomeStore {
    async fn record_outcome(&self, outcome: &OutcomeRecord) -> Result<()> {
        self.records.write().unwrap().push(outcome.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExecutionContext, ExecutionResult};
    use serde_json::json;

    #[tokio::test]
    async fn test_record_outcome() {
        let store = InMemoryOutcomeStore::new();
        let ctx = ExecutionContext::on_demand();
        let result = ExecutionResult::ok(json!({})).with_confidence(0.9);

        let record = OutcomeRecord::from_result("removal", "submit_request", &ctx, &result);
        store.record_outcome(&record).await.unwrap();

        assert_eq!(store.len(), 1);
        let stored = &store.records()[0];
        assert_eq!(stored.agent_id, "removal");
        assert_eq!(stored.request_id, ctx.request_id);
        assert!(stored.success);
    }
}
