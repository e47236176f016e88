//! Export reconciliation: reviewed values merged back into the backend's
//! result shape.

use std::collections::BTreeMap;

use super::tracker::ReviewTracker;
use crate::extraction::{ExtractionRun, KeyExtractionResult};

/// Key → result in the backend's wire shape, ready for the export transport.
pub type ExportPayload = BTreeMap<String, KeyExtractionResult>;

/// Copy each extraction result with `key_value` replaced by its reviewed value.
///
/// Keys without a review record are left out. Completion is not checked here;
/// callers only export once every key has been reviewed.
pub fn build_export_payload(run: &ExtractionRun, tracker: &ReviewTracker) -> ExportPayload {
    run.results()
        .filter_map(|result| {
            let record = tracker.get(&result.key)?;
            let reconciled = KeyExtractionResult {
                key_value: Some(record.value().to_string()),
                ..result.source.clone()
            };
            Some((result.key.clone(), reconciled))
        })
        .collect()
}
