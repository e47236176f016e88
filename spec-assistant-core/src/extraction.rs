//! Extraction results as the backend returns them, and the normalized
//! per-key view the review workflow operates on.
//!
//! The backend answers `/extract-keys` with a JSON object mapping each
//! requested key to either `null` (extraction failed) or an object shaped like
//! [`KeyExtractionResult`]. Upstream output is not trusted: missing keys,
//! `null` entries and malformed fields all collapse to safe defaults so a
//! review session can always be opened.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Display value for a key the extraction could not locate.
pub const NOT_FOUND: &str = "Not found";

/// Where in the uploaded documents a value was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SourceLocation {
    #[serde(default, alias = "document_filename")]
    pub pdf_filename: String,
    #[serde(default)]
    pub page_numbers: Vec<u32>,
}

/// One key's extraction result in the backend's wire shape.
///
/// Fields the backend adds beyond the known ones are kept in `extra` so an
/// exported copy carries them through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct KeyExtractionResult {
    pub key_value: Option<String>,
    #[serde(default)]
    pub source_locations: Vec<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl KeyExtractionResult {
    /// Parse a single entry of an extraction response, field by field.
    ///
    /// Returns the parsed result and whether anything had to be replaced by a
    /// default. A `null` entry is a legitimate "extraction failed" answer and
    /// is not reported as malformed.
    pub fn from_value_lenient(value: &Value) -> (Self, bool) {
        let object = match value {
            Value::Null => return (Self::default(), false),
            Value::Object(object) => object,
            _ => return (Self::default(), true),
        };

        let mut malformed = false;
        let mut result = Self::default();

        for (field, field_value) in object {
            match field.as_str() {
                "key_value" => match field_value {
                    Value::String(s) => result.key_value = Some(s.clone()),
                    Value::Null => {}
                    Value::Number(n) => result.key_value = Some(n.to_string()),
                    Value::Bool(b) => result.key_value = Some(b.to_string()),
                    _ => malformed = true,
                },
                "source_locations" => match field_value {
                    Value::Array(items) => {
                        for item in items {
                            match serde_json::from_value::<SourceLocation>(item.clone()) {
                                Ok(location) => result.source_locations.push(location),
                                Err(_) => malformed = true,
                            }
                        }
                    }
                    Value::Null => {}
                    _ => malformed = true,
                },
                "description" => match field_value {
                    Value::String(s) => result.description = Some(s.clone()),
                    Value::Null => {}
                    _ => malformed = true,
                },
                _ => {
                    result.extra.insert(field.clone(), field_value.clone());
                }
            }
        }

        (result, malformed)
    }

    /// The value shown to a reviewer: the extracted text, or [`NOT_FOUND`].
    pub fn display_value(&self) -> String {
        match self.key_value.as_deref() {
            Some(v) if !v.trim().is_empty() => v.to_string(),
            _ => NOT_FOUND.to_string(),
        }
    }
}

/// A single place a value was read from, flattened to one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub source_document_id: String,
    pub page_number: u32,
    /// The backend's note on where and how the value was found.
    pub excerpt_text: String,
}

/// Normalized extraction result for one requested key.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub key: String,
    pub value: String,
    pub references: Vec<Reference>,
    /// The entry as received, used as the base of the exported copy.
    pub source: KeyExtractionResult,
}

impl ExtractionResult {
    pub fn from_wire(key: impl Into<String>, source: KeyExtractionResult) -> Self {
        let excerpt = source.description.clone().unwrap_or_default();
        let references = source
            .source_locations
            .iter()
            .flat_map(|location| {
                let excerpt = excerpt.clone();
                location
                    .page_numbers
                    .iter()
                    .map(move |&page_number| Reference {
                        source_document_id: location.pdf_filename.clone(),
                        page_number,
                        excerpt_text: excerpt.clone(),
                    })
            })
            .collect();

        Self {
            key: key.into(),
            value: source.display_value(),
            references,
            source,
        }
    }

    /// Result for a key the backend gave nothing usable for.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::from_wire(key, KeyExtractionResult::default())
    }
}

/// The extraction result store: one run's results for a batch of keys.
///
/// Immutable once built. A new extraction run replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractionRun {
    requested_keys: Vec<String>,
    results: BTreeMap<String, ExtractionResult>,
}

impl ExtractionRun {
    /// Build a run from the raw `/extract-keys` response.
    ///
    /// Every requested key gets a result, whatever the response contains.
    /// Duplicate key names keep their first position.
    pub fn from_response(requested_keys: Vec<String>, response: &Value) -> Self {
        let requested_keys = dedup_keys(requested_keys);
        let entries = match response {
            Value::Object(entries) => Some(entries),
            other => {
                warn!(
                    "Extraction response is not an object (got {}), treating all {} keys as not found",
                    json_kind(other),
                    requested_keys.len()
                );
                None
            }
        };

        let mut results = BTreeMap::new();
        for key in &requested_keys {
            let result = match entries.and_then(|e| e.get(key)) {
                Some(entry) => {
                    let (parsed, malformed) = KeyExtractionResult::from_value_lenient(entry);
                    if malformed {
                        warn!("Malformed extraction result for key '{}', using defaults", key);
                    } else if entry.is_null() {
                        debug!("Extraction failed for key '{}'", key);
                    }
                    ExtractionResult::from_wire(key.clone(), parsed)
                }
                None => {
                    warn!("Extraction response has no entry for key '{}'", key);
                    ExtractionResult::not_found(key.clone())
                }
            };
            results.insert(key.clone(), result);
        }

        Self {
            requested_keys,
            results,
        }
    }

    /// Build a run from a file written by [`SavedExtraction`].
    ///
    /// A bare response object is accepted too; its keys are taken as the
    /// requested keys, in alphabetical order.
    pub fn from_saved_response(saved: &Value) -> Self {
        if let Some(saved) = SavedExtraction::from_value(saved) {
            return Self::from_response(saved.requested_keys, &saved.results);
        }
        let keys = saved
            .as_object()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        Self::from_response(keys, saved)
    }

    /// Keys in the order they were requested.
    pub fn requested_keys(&self) -> &[String] {
        &self.requested_keys
    }

    pub fn get(&self, key: &str) -> Option<&ExtractionResult> {
        self.results.get(key)
    }

    /// Results in alphabetical key order.
    pub fn results(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.results.values()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// An `/extract-keys` response stored with the keys it was asked for.
///
/// JSON objects do not keep insertion order, so the requested order travels
/// alongside the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedExtraction {
    pub requested_keys: Vec<String>,
    pub results: Value,
}

impl SavedExtraction {
    pub fn new(requested_keys: &[String], results: Value) -> Self {
        Self {
            requested_keys: requested_keys.to_vec(),
            results,
        }
    }

    /// `None` unless `value` has both `requested_keys` and `results`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let entries = value.as_object()?;
        if entries.len() != 2 || !entries.contains_key("results") {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

fn dedup_keys(keys: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    keys.into_iter()
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_null_key_value_becomes_not_found() {
        let response = json!({
            "Vendor": {"key_value": "Acme", "source_locations": [], "description": "cover page"},
            "Model": {"key_value": null, "source_locations": [], "description": "absent"}
        });

        let run = ExtractionRun::from_response(keys(&["Vendor", "Model"]), &response);

        assert_eq!(run.get("Vendor").unwrap().value, "Acme");
        assert_eq!(run.get("Model").unwrap().value, NOT_FOUND);
    }

    #[test]
    fn test_null_entry_and_missing_key_become_not_found() {
        let response = json!({"Vendor": null});

        let run = ExtractionRun::from_response(keys(&["Vendor", "Voltage"]), &response);

        assert_eq!(run.len(), 2);
        assert_eq!(run.get("Vendor").unwrap().value, NOT_FOUND);
        assert_eq!(run.get("Voltage").unwrap().value, NOT_FOUND);
        assert!(run.get("Voltage").unwrap().references.is_empty());
    }

    #[test]
    fn test_saved_extraction_keeps_requested_order() {
        let response = json!({"Vendor": {"key_value": "Acme"}, "Model": null});
        let saved = SavedExtraction::new(&keys(&["Vendor", "Model"]), response);
        let text = serde_json::to_string(&saved).unwrap();

        let reloaded: Value = serde_json::from_str(&text).unwrap();
        let run = ExtractionRun::from_saved_response(&reloaded);

        assert_eq!(run.requested_keys(), keys(&["Vendor", "Model"]).as_slice());
        assert_eq!(run.get("Vendor").unwrap().value, "Acme");
        assert_eq!(run.get("Model").unwrap().value, NOT_FOUND);
    }

    #[test]
    fn test_bare_saved_response_falls_back_to_alphabetical() {
        let run = ExtractionRun::from_saved_response(&json!({
            "Vendor": {"key_value": "Acme"},
            "Model": null
        }));

        assert_eq!(run.requested_keys(), keys(&["Model", "Vendor"]).as_slice());
    }

    #[test]
    fn test_response_with_a_results_key_is_not_mistaken_for_saved() {
        let run = ExtractionRun::from_saved_response(&json!({
            "results": {"key_value": "3"},
            "Vendor": null,
            "Model": null
        }));

        assert_eq!(run.len(), 3);
        assert_eq!(run.get("results").unwrap().value, "3");
    }

    #[test]
    fn test_non_object_response_does_not_panic() {
        let run = ExtractionRun::from_response(keys(&["Vendor"]), &json!("oops"));
        assert_eq!(run.get("Vendor").unwrap().value, NOT_FOUND);
    }

    #[test]
    fn test_malformed_fields_fall_back_to_defaults() {
        let entry = json!({
            "key_value": "230 V",
            "source_locations": "page 3",
            "description": 17
        });

        let (parsed, malformed) = KeyExtractionResult::from_value_lenient(&entry);

        assert!(malformed);
        assert_eq!(parsed.key_value.as_deref(), Some("230 V"));
        assert!(parsed.source_locations.is_empty());
        assert_eq!(parsed.description, None);
    }

    #[test]
    fn test_bad_source_location_is_dropped_but_good_ones_kept() {
        let entry = json!({
            "key_value": "IP54",
            "source_locations": [
                {"pdf_filename": "a.pdf", "page_numbers": [2]},
                {"pdf_filename": "b.pdf", "page_numbers": "two"}
            ]
        });

        let (parsed, malformed) = KeyExtractionResult::from_value_lenient(&entry);

        assert!(malformed);
        assert_eq!(parsed.source_locations.len(), 1);
        assert_eq!(parsed.source_locations[0].pdf_filename, "a.pdf");
    }

    #[test]
    fn test_document_filename_alias_is_accepted() {
        let entry = json!({
            "key_value": "X",
            "source_locations": [{"document_filename": "spec.pdf", "page_numbers": [1, 4]}]
        });

        let (parsed, malformed) = KeyExtractionResult::from_value_lenient(&entry);

        assert!(!malformed);
        assert_eq!(parsed.source_locations[0].pdf_filename, "spec.pdf");
    }

    #[test]
    fn test_references_are_flattened_per_page() {
        let response = json!({
            "Rated Voltage": {
                "key_value": "400 V",
                "source_locations": [
                    {"pdf_filename": "datasheet.pdf", "page_numbers": [1, 3]},
                    {"pdf_filename": "manual.pdf", "page_numbers": [7]}
                ],
                "description": "nameplate table"
            }
        });

        let run = ExtractionRun::from_response(keys(&["Rated Voltage"]), &response);
        let refs = &run.get("Rated Voltage").unwrap().references;

        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].source_document_id, "datasheet.pdf");
        assert_eq!(refs[1].page_number, 3);
        assert_eq!(refs[2].source_document_id, "manual.pdf");
        assert_eq!(refs[2].excerpt_text, "nameplate table");
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let entry = json!({"key_value": "A", "source_locations": [], "confidence": 0.9});

        let (parsed, _) = KeyExtractionResult::from_value_lenient(&entry);
        let back = serde_json::to_value(&parsed).unwrap();

        assert_eq!(back["confidence"], json!(0.9));
    }

    #[test]
    fn test_requested_order_is_kept_and_duplicates_dropped() {
        let run = ExtractionRun::from_response(keys(&["Z", "A", "Z", "M"]), &json!({}));

        assert_eq!(run.requested_keys(), &keys(&["Z", "A", "M"])[..]);
        let alphabetical: Vec<_> = run.results().map(|r| r.key.as_str()).collect();
        assert_eq!(alphabetical, vec!["A", "M", "Z"]);
    }

    #[test]
    fn test_blank_key_value_displays_as_not_found() {
        let result = KeyExtractionResult {
            key_value: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(result.display_value(), NOT_FOUND);
    }
}
