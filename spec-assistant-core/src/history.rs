//! Stored extraction runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::review::ExportPayload;

/// Identifier of a stored extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_language() -> String {
    "en".to_string()
}

/// An extraction run to be stored. Values are flattened to text; `None`
/// marks a key whose extraction failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExtractionRecord {
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub extraction_results: BTreeMap<String, Option<String>>,
    #[serde(default = "default_language")]
    pub language: String,
}

impl NewExtractionRecord {
    /// Record for a reviewed export: each key maps to its reviewed value.
    pub fn from_export(file_ids: Vec<String>, payload: &ExportPayload, language: &str) -> Self {
        let extraction_results = payload
            .iter()
            .map(|(key, result)| (key.clone(), result.key_value.clone()))
            .collect();
        Self {
            file_ids,
            extraction_results,
            language: language.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub id: RecordId,
    pub file_ids: Vec<String>,
    pub extraction_results: BTreeMap<String, Option<String>>,
    pub language: String,
    /// Unix seconds.
    pub created_at: i64,
}

impl ExtractionRecord {
    pub fn from_new(id: RecordId, new: NewExtractionRecord, created_at: i64) -> Self {
        Self {
            id,
            file_ids: new.file_ids,
            extraction_results: new.extraction_results,
            language: new.language,
            created_at,
        }
    }

    /// Keys that have a value.
    pub fn found_count(&self) -> usize {
        self.extraction_results.values().flatten().count()
    }
}
