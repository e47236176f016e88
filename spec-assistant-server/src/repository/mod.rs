//! Repository abstraction for extraction history.
//!
//! `ExtractionRepository` hides where stored extraction runs live. The
//! in-memory backend is used by tests and as a fallback; the SQLite backend
//! persists across restarts.

mod memory;
mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

use async_trait::async_trait;
use spec_assistant_core::{ExtractionRecord, NewExtractionRecord, RecordId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage error during {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },
    #[error("corrupt {what} in database")]
    Corruption { what: &'static str },
}

impl RepositoryError {
    pub fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            message: message.into(),
        }
    }

    pub fn corruption(what: &'static str) -> Self {
        Self::Corruption { what }
    }
}

#[async_trait]
pub trait ExtractionRepository: Send + Sync {
    /// Store a run, assigning its id and creation time.
    async fn insert(
        &self,
        record: NewExtractionRecord,
        created_at: i64,
    ) -> Result<ExtractionRecord, RepositoryError>;

    async fn get(&self, id: RecordId) -> Result<Option<ExtractionRecord>, RepositoryError>;

    /// All stored runs, newest first.
    async fn list(&self) -> Result<Vec<ExtractionRecord>, RepositoryError>;
}
