//! SQLite implementation of `ExtractionRepository`.
//!
//! # Schema Versioning
//!
//! The `schema_version` table records which migrations have run. To change
//! the schema, increment `CURRENT_SCHEMA_VERSION` and add a step to
//! `run_migrations()`.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use spec_assistant_core::{ExtractionRecord, NewExtractionRecord, RecordId};

use super::{ExtractionRepository, RepositoryError};

const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed extraction history.
///
/// rusqlite is synchronous, so every query runs under
/// `tokio::task::spawn_blocking`.
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Open (or create) the database at `path` and bring its schema up to date.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();
        let is_in_memory = path_str == ":memory:";

        if !is_in_memory {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        RepositoryError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| RepositoryError::storage("open database", e.to_string()))?;

        if !is_in_memory {
            let _: String = conn
                .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
                .map_err(|e| RepositoryError::storage("set journal_mode", e.to_string()))?;
        }
        conn.execute_batch("PRAGMA busy_timeout = 5000;")
            .map_err(|e| RepositoryError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| RepositoryError::storage("create schema_version table", e.to_string()))?;

        let current_version: i64 = conn
            .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| RepositoryError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn new_in_memory() -> Result<Self, RepositoryError> {
        Self::new(":memory:")
    }

    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), RepositoryError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(RepositoryError::storage(
                "schema version",
                format!(
                    "Database schema version {} is newer than supported version {}. \
                     Please upgrade the application.",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS extraction_results (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    file_ids_json TEXT NOT NULL,
                    results_json TEXT NOT NULL,
                    language TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_extraction_results_created
                    ON extraction_results(created_at DESC);
                "#,
            )
            .map_err(|e| RepositoryError::storage("migration v1", e.to_string()))?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| RepositoryError::storage("update schema version", e.to_string()))?;

        Ok(())
    }
}

fn lock<'a>(
    conn: &'a Mutex<Connection>,
    operation: &'static str,
) -> Result<MutexGuard<'a, Connection>, RepositoryError> {
    conn.lock()
        .map_err(|_| RepositoryError::storage(operation, "connection mutex poisoned"))
}

type RawRecord = (i64, String, String, String, i64);

fn raw_record(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode(raw: RawRecord) -> Result<ExtractionRecord, RepositoryError> {
    let (id, file_ids_json, results_json, language, created_at) = raw;
    let file_ids = serde_json::from_str(&file_ids_json)
        .map_err(|_| RepositoryError::corruption("file_ids JSON"))?;
    let extraction_results = serde_json::from_str(&results_json)
        .map_err(|_| RepositoryError::corruption("extraction_results JSON"))?;
    Ok(ExtractionRecord {
        id: RecordId(id),
        file_ids,
        extraction_results,
        language,
        created_at,
    })
}

const SELECT_COLUMNS: &str =
    "SELECT id, file_ids_json, results_json, language, created_at FROM extraction_results";

#[async_trait]
impl ExtractionRepository for SqliteRepository {
    async fn insert(
        &self,
        record: NewExtractionRecord,
        created_at: i64,
    ) -> Result<ExtractionRecord, RepositoryError> {
        let conn = self.conn.clone();
        let file_ids_json = serde_json::to_string(&record.file_ids)
            .map_err(|e| RepositoryError::storage("serialize file_ids", e.to_string()))?;
        let results_json = serde_json::to_string(&record.extraction_results)
            .map_err(|e| RepositoryError::storage("serialize extraction_results", e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "insert")?;
            conn.execute(
                "INSERT INTO extraction_results (file_ids_json, results_json, language, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![file_ids_json, results_json, record.language, created_at],
            )
            .map_err(|e| RepositoryError::storage("insert", e.to_string()))?;
            let id = RecordId(conn.last_insert_rowid());
            Ok(ExtractionRecord::from_new(id, record, created_at))
        })
        .await
        .map_err(|e| RepositoryError::storage("insert", e.to_string()))?
    }

    async fn get(&self, id: RecordId) -> Result<Option<ExtractionRecord>, RepositoryError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "get")?;
            let raw = conn
                .query_row(
                    &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                    params![id.0],
                    raw_record,
                )
                .optional()
                .map_err(|e| RepositoryError::storage("get", e.to_string()))?;
            raw.map(decode).transpose()
        })
        .await
        .map_err(|e| RepositoryError::storage("get", e.to_string()))?
    }

    async fn list(&self) -> Result<Vec<ExtractionRecord>, RepositoryError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn, "list")?;
            let mut stmt = conn
                .prepare(&format!("{} ORDER BY created_at DESC, id DESC", SELECT_COLUMNS))
                .map_err(|e| RepositoryError::storage("list", e.to_string()))?;
            let rows = stmt
                .query_map([], raw_record)
                .map_err(|e| RepositoryError::storage("list", e.to_string()))?;

            let mut records = Vec::new();
            for row in rows {
                let raw = row.map_err(|e| RepositoryError::storage("list", e.to_string()))?;
                records.push(decode(raw)?);
            }
            Ok(records)
        })
        .await
        .map_err(|e| RepositoryError::storage("list", e.to_string()))?
    }
}
