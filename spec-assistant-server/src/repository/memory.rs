//! In-memory `ExtractionRepository`. Everything is lost on restart.

use async_trait::async_trait;
use spec_assistant_core::{ExtractionRecord, NewExtractionRecord, RecordId};
use tokio::sync::RwLock;

use super::{ExtractionRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryRepository {
    records: RwLock<Vec<ExtractionRecord>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExtractionRepository for InMemoryRepository {
    async fn insert(
        &self,
        record: NewExtractionRecord,
        created_at: i64,
    ) -> Result<ExtractionRecord, RepositoryError> {
        let mut records = self.records.write().await;
        let id = RecordId(records.len() as i64 + 1);
        let stored = ExtractionRecord::from_new(id, record, created_at);
        records.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: RecordId) -> Result<Option<ExtractionRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<ExtractionRecord>, RepositoryError> {
        let records = self.records.read().await;
        let mut all = records.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all)
    }
}
