use super::{location_for, AnalysisStore, PersistenceError};
use crate::model::{AnalysisResult, PersistOutcome, RepoIdentity};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Process-local store, shared by clones
#[derive(Clone, Default)]
pub struct InMemoryAnalysisStore {
    records: Arc<RwLock<HashMap<String, AnalysisResult>>>,
}

impl InMemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AnalysisStore for InMemoryAnalysisStore {
    async fn persist(&self, analyses: &[AnalysisResult]) -> PersistOutcome {
        let mut outcome = PersistOutcome {
            attempted: analyses.len(),
            ..Default::default()
        };
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        for analysis in analyses {
            let location = location_for(&analysis.identity);
            records.insert(location.clone(), analysis.clone());
            outcome.succeeded.push(location);
        }
        outcome
    }

    async fn load_by_identity(
        &self,
        identity: &RepoIdentity,
    ) -> Result<Option<AnalysisResult>, PersistenceError> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(&location_for(identity)).cloned())
    }

    async fn load_all(&self) -> Result<Vec<AnalysisResult>, PersistenceError> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fingerprint;
    use serde_json::json;

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = InMemoryAnalysisStore::new();
        let identity = RepoIdentity::new("o", "n", "u", "main");

        let first = AnalysisResult::new(identity.clone().with_sha("1"), vec![]);
        let second = AnalysisResult::new(
            identity.clone().with_sha("2"),
            vec![Fingerprint::new("t", "n", json!(1))],
        );
        store.persist_one(&first).await;
        store.persist_one(&second).await;

        assert_eq!(store.len(), 1);
        let loaded = store.load_by_identity(&identity).await.unwrap().unwrap();
        assert_eq!(loaded, second);
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let store = InMemoryAnalysisStore::new();
        let other = store.clone();
        store
            .persist_one(&AnalysisResult::new(RepoIdentity::new("o", "n", "u", "main"), vec![]))
            .await;
        assert_eq!(other.load_all().await.unwrap().len(), 1);
    }
}
