//! Result Store
//!
//! [`ResultSink`] is the seam between the connection state machine and
//! persistence. Production uses MongoDB; tests use the in-memory sink.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::Collection;
use smc_testcase::TestcaseResult;
use tokio::sync::Mutex;

use crate::mongoc::{self, DbiResult, MongoConfig};

/// Append-only sink for testcase results
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persist one result
    async fn insert(&self, result: &TestcaseResult) -> DbiResult<()>;
}

/// MongoDB-backed result store
pub struct MongoResultStore {
    collection: Collection<TestcaseResult>,
}

impl MongoResultStore {
    /// Connect to the configured database and bind the result collection
    pub async fn connect(config: &MongoConfig) -> DbiResult<Self> {
        let database = mongoc::connect(config).await?;
        let collection = database.collection::<TestcaseResult>(&config.collection);
        log::info!("Results will be written to collection '{}'", config.collection);
        Ok(Self { collection })
    }
}

#[async_trait]
impl ResultSink for MongoResultStore {
    async fn insert(&self, result: &TestcaseResult) -> DbiResult<()> {
        let inserted = self.collection.insert_one(result, None).await?;
        log::debug!(
            "Stored result for testcase {} (_id={})",
            result.test_case.id,
            inserted.inserted_id
        );
        Ok(())
    }
}

/// In-memory result store
#[derive(Debug, Default, Clone)]
pub struct MemoryResultStore {
    results: Arc<Mutex<Vec<TestcaseResult>>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything inserted so far
    pub async fn results(&self) -> Vec<TestcaseResult> {
        self.results.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.results.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.results.lock().await.is_empty()
    }
}

#[async_trait]
impl ResultSink for MemoryResultStore {
    async fn insert(&self, result: &TestcaseResult) -> DbiResult<()> {
        self.results.lock().await.push(result.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smc_testcase::Testcase;

    #[tokio::test]
    async fn test_memory_store_appends_in_order() {
        let store = MemoryResultStore::new();
        assert!(store.is_empty().await);

        store.insert(&TestcaseResult::new(9, Testcase::new(1, 5, true))).await.unwrap();
        store.insert(&TestcaseResult::new(0, Testcase::new(2, 5, false))).await.unwrap();

        let results = store.results().await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].response_type, 9);
        assert_eq!(results[1].test_case.id, 2);
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_results() {
        let store = MemoryResultStore::new();
        let sink: Arc<dyn ResultSink> = Arc::new(store.clone());
        sink.insert(&TestcaseResult::new(1, Testcase::new(3, 5, true))).await.unwrap();
        assert_eq!(store.len().await, 1);
    }
}
