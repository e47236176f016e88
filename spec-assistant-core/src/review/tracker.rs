//! Review state tracker: owns the key → [`ReviewRecord`] mapping and enforces
//! the per-key state machine.
//!
//! All operations are total. Actions that are not allowed leave the state
//! untouched and report a [`Rejection`] instead of failing.

use std::collections::HashMap;

use tracing::debug;

use super::state::{Outcome, Rejection, ReviewRecord, ReviewStatus};
use crate::extraction::{ExtractionResult, ExtractionRun, NOT_FOUND};

/// Tunable review rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewPolicy {
    /// Whether an edit that trims to the empty string is recorded.
    pub allow_empty_edits: bool,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            allow_empty_edits: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReviewTracker {
    records: HashMap<String, ReviewRecord>,
    policy: ReviewPolicy,
}

impl ReviewTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ReviewPolicy) -> Self {
        Self {
            records: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> ReviewPolicy {
        self.policy
    }

    /// Create pending records for every result whose key is not yet tracked.
    ///
    /// Already tracked keys are left alone, so calling this again after the
    /// reviewer has made progress is harmless. Returns how many records were
    /// created.
    pub fn initialize<'a>(&mut self, results: impl IntoIterator<Item = &'a ExtractionResult>) -> usize {
        let mut created = 0;
        for result in results {
            if !self.records.contains_key(&result.key) {
                self.records
                    .insert(result.key.clone(), ReviewRecord::pending(result.value.clone()));
                created += 1;
            }
        }
        if created > 0 {
            debug!("Initialized {} review record(s)", created);
        }
        created
    }

    /// Confirm a pending key's value as-is.
    pub fn accept(&mut self, key: &str) -> Outcome {
        let Some(record) = self.records.get_mut(key) else {
            return Outcome::Rejected(Rejection::UnknownKey {
                key: key.to_string(),
            });
        };

        if record.status != ReviewStatus::Pending {
            return Outcome::Rejected(Rejection::InvalidTransition {
                action: "accept",
                from: record.status,
            });
        }

        record.status = ReviewStatus::Accepted;
        Outcome::Applied
    }

    /// Replace a key's value. Allowed from any status.
    pub fn edit(&mut self, key: &str, new_value: &str) -> Outcome {
        let trimmed = new_value.trim();
        if trimmed.is_empty() && !self.policy.allow_empty_edits {
            return Outcome::Rejected(Rejection::EmptyValue);
        }

        let Some(record) = self.records.get_mut(key) else {
            return Outcome::Rejected(Rejection::UnknownKey {
                key: key.to_string(),
            });
        };

        record.value = trimmed.to_string();
        record.status = ReviewStatus::Edited;
        Outcome::Applied
    }

    /// Put a reviewed key back to pending, keeping its last reviewed value.
    pub fn reopen(&mut self, key: &str) -> Outcome {
        let Some(record) = self.records.get_mut(key) else {
            return Outcome::Rejected(Rejection::UnknownKey {
                key: key.to_string(),
            });
        };

        if record.status == ReviewStatus::Pending {
            return Outcome::Rejected(Rejection::InvalidTransition {
                action: "reopen",
                from: record.status,
            });
        }

        record.status = ReviewStatus::Pending;
        Outcome::Applied
    }

    pub fn get(&self, key: &str) -> Option<&ReviewRecord> {
        self.records.get(key)
    }

    /// The tracked record, or the pending record `initialize` would create.
    pub fn get_or_default(&self, key: &str, run: &ExtractionRun) -> ReviewRecord {
        match self.records.get(key) {
            Some(record) => record.clone(),
            None => {
                let original = run
                    .get(key)
                    .map(|result| result.value.clone())
                    .unwrap_or_else(|| NOT_FOUND.to_string());
                ReviewRecord::pending(original)
            }
        }
    }

    pub fn status(&self, key: &str) -> Option<ReviewStatus> {
        self.records.get(key).map(|record| record.status)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record, keeping the policy.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn run_with(values: &[(&str, Option<&str>)]) -> ExtractionRun {
        let keys = values.iter().map(|(k, _)| k.to_string()).collect();
        let mut response = serde_json::Map::new();
        for (key, value) in values {
            response.insert(
                key.to_string(),
                json!({"key_value": value, "source_locations": [], "description": ""}),
            );
        }
        ExtractionRun::from_response(keys, &serde_json::Value::Object(response))
    }

    fn tracker_for(run: &ExtractionRun) -> ReviewTracker {
        let mut tracker = ReviewTracker::new();
        tracker.initialize(run.results());
        tracker
    }

    #[test]
    fn test_initialize_creates_pending_records() {
        let run = run_with(&[("Vendor", Some("Acme")), ("Model", None)]);
        let tracker = tracker_for(&run);

        let model = tracker.get("Model").unwrap();
        assert_eq!(model.status(), ReviewStatus::Pending);
        assert_eq!(model.value(), NOT_FOUND);
        assert_eq!(model.original_value(), NOT_FOUND);
    }

    #[test]
    fn test_initialize_leaves_tracked_keys_untouched() {
        let run = run_with(&[("Vendor", Some("Acme"))]);
        let mut tracker = tracker_for(&run);
        tracker.edit("Vendor", "Acme Corp");

        let created = tracker.initialize(run.results());

        assert_eq!(created, 0);
        let vendor = tracker.get("Vendor").unwrap();
        assert_eq!(vendor.status(), ReviewStatus::Edited);
        assert_eq!(vendor.value(), "Acme Corp");
    }

    #[test]
    fn test_accept_only_from_pending() {
        let run = run_with(&[("Vendor", Some("Acme"))]);
        let mut tracker = tracker_for(&run);

        assert_eq!(tracker.accept("Vendor"), Outcome::Applied);
        assert_eq!(
            tracker.accept("Vendor"),
            Outcome::Rejected(Rejection::InvalidTransition {
                action: "accept",
                from: ReviewStatus::Accepted
            })
        );
        assert_eq!(tracker.status("Vendor"), Some(ReviewStatus::Accepted));
    }

    #[test]
    fn test_accept_after_edit_is_rejected() {
        let run = run_with(&[("Vendor", Some("Acme"))]);
        let mut tracker = tracker_for(&run);
        tracker.edit("Vendor", "Other");

        assert!(!tracker.accept("Vendor").is_applied());
        assert_eq!(tracker.status("Vendor"), Some(ReviewStatus::Edited));
        assert_eq!(tracker.get("Vendor").unwrap().value(), "Other");
    }

    #[test]
    fn test_edit_to_same_text_still_marks_edited() {
        let run = run_with(&[("Vendor", Some("Acme"))]);
        let mut tracker = tracker_for(&run);

        tracker.edit("Vendor", "Acme");

        let vendor = tracker.get("Vendor").unwrap();
        assert_eq!(vendor.status(), ReviewStatus::Edited);
        assert!(!vendor.is_modified());
    }

    #[test]
    fn test_empty_edit_is_permitted_by_default() {
        let run = run_with(&[("Vendor", Some("Acme"))]);
        let mut tracker = tracker_for(&run);

        assert_eq!(tracker.edit("Vendor", "   "), Outcome::Applied);
        assert_eq!(tracker.get("Vendor").unwrap().value(), "");
        assert_eq!(tracker.status("Vendor"), Some(ReviewStatus::Edited));
    }

    #[test]
    fn test_empty_edit_rejected_when_disallowed() {
        let run = run_with(&[("Vendor", Some("Acme"))]);
        let mut tracker = ReviewTracker::with_policy(ReviewPolicy {
            allow_empty_edits: false,
        });
        tracker.initialize(run.results());

        assert_eq!(
            tracker.edit("Vendor", " \n "),
            Outcome::Rejected(Rejection::EmptyValue)
        );
        assert_eq!(tracker.status("Vendor"), Some(ReviewStatus::Pending));
        assert_eq!(tracker.get("Vendor").unwrap().value(), "Acme");
    }

    #[test]
    fn test_reopen_keeps_reviewed_value() {
        let run = run_with(&[("Vendor", Some("Acme"))]);
        let mut tracker = tracker_for(&run);
        tracker.edit("Vendor", "Acme GmbH");

        assert_eq!(tracker.reopen("Vendor"), Outcome::Applied);

        let vendor = tracker.get("Vendor").unwrap();
        assert_eq!(vendor.status(), ReviewStatus::Pending);
        assert_eq!(vendor.value(), "Acme GmbH");
        assert_eq!(vendor.original_value(), "Acme");
    }

    #[test]
    fn test_reopen_pending_is_rejected() {
        let run = run_with(&[("Vendor", Some("Acme"))]);
        let mut tracker = tracker_for(&run);
        assert!(!tracker.reopen("Vendor").is_applied());
    }

    #[test]
    fn test_unknown_key_is_rejected_everywhere() {
        let mut tracker = ReviewTracker::new();
        let unknown = Outcome::Rejected(Rejection::UnknownKey {
            key: "Ghost".to_string(),
        });

        assert_eq!(tracker.accept("Ghost"), unknown);
        assert_eq!(tracker.edit("Ghost", "x"), unknown);
        assert_eq!(tracker.reopen("Ghost"), unknown);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_get_or_default_derives_from_run() {
        let run = run_with(&[("Vendor", Some("Acme"))]);
        let tracker = ReviewTracker::new();

        assert_eq!(tracker.get_or_default("Vendor", &run), ReviewRecord::pending("Acme"));
        assert_eq!(
            tracker.get_or_default("Ghost", &run),
            ReviewRecord::pending(NOT_FOUND)
        );
    }

    #[derive(Debug, Clone)]
    enum Action {
        Accept,
        Edit(String),
        Reopen,
    }

    fn arb_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            Just(Action::Accept),
            "[ a-zA-Z0-9]{0,12}".prop_map(Action::Edit),
            Just(Action::Reopen),
        ]
    }

    proptest! {
        /// Property: original_value never changes, and a key is pending with
        /// its original value only until an edit has happened.
        #[test]
        fn original_value_is_immutable(actions in proptest::collection::vec(arb_action(), 0..40)) {
            let run = run_with(&[("Key", Some("orig"))]);
            let mut tracker = tracker_for(&run);
            let mut ever_edited = false;

            for action in actions {
                match action {
                    Action::Accept => { tracker.accept("Key"); }
                    Action::Edit(v) => { tracker.edit("Key", &v); ever_edited = true; }
                    Action::Reopen => { tracker.reopen("Key"); }
                }

                let record = tracker.get("Key").unwrap();
                prop_assert_eq!(record.original_value(), "orig");
                if !ever_edited {
                    prop_assert_eq!(record.value(), "orig");
                }
            }
        }

        /// Property: edit always yields edited with the trimmed value.
        #[test]
        fn edit_always_yields_trimmed_edited(
            actions in proptest::collection::vec(arb_action(), 0..10),
            value in "[ \t]{0,3}[a-z0-9 ]{0,10}[ \t]{0,3}",
        ) {
            let run = run_with(&[("Key", Some("orig"))]);
            let mut tracker = tracker_for(&run);
            for action in actions {
                match action {
                    Action::Accept => { tracker.accept("Key"); }
                    Action::Edit(v) => { tracker.edit("Key", &v); }
                    Action::Reopen => { tracker.reopen("Key"); }
                }
            }

            prop_assert_eq!(tracker.edit("Key", &value), Outcome::Applied);
            let record = tracker.get("Key").unwrap();
            prop_assert_eq!(record.status(), ReviewStatus::Edited);
            prop_assert_eq!(record.value(), value.trim());
        }

        /// Property: accept succeeds exactly when the key is pending.
        #[test]
        fn accept_applies_iff_pending(actions in proptest::collection::vec(arb_action(), 0..20)) {
            let run = run_with(&[("Key", Some("orig"))]);
            let mut tracker = tracker_for(&run);
            for action in actions {
                match action {
                    Action::Accept => { tracker.accept("Key"); }
                    Action::Edit(v) => { tracker.edit("Key", &v); }
                    Action::Reopen => { tracker.reopen("Key"); }
                }
            }

            let before = tracker.get("Key").unwrap().clone();
            let outcome = tracker.accept("Key");
            let after = tracker.get("Key").unwrap();

            prop_assert_eq!(outcome.is_applied(), before.status() == ReviewStatus::Pending);
            prop_assert_eq!(after.value(), before.value());
            prop_assert!(after.status().is_reviewed());
        }
    }
}
