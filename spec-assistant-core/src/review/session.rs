//! A review session: one extraction run, its review records, and the
//! navigation state, owned by a single presentation layer.
//!
//! The tracker and navigator stay independently usable; the session only
//! composes them so that committing a review action also moves the reviewer
//! along.

use serde::Serialize;
use tracing::{debug, info};

use super::navigator::ReviewNavigator;
use super::reconcile::{build_export_payload, ExportPayload};
use super::state::{Outcome, Rejection, ReviewRecord, ReviewStatus};
use super::tracker::{ReviewPolicy, ReviewTracker};
use crate::extraction::{ExtractionResult, ExtractionRun};

/// One row of the completed-review summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub key: String,
    pub status: ReviewStatus,
    pub value: String,
    pub original_value: String,
    pub modified: bool,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    run: ExtractionRun,
    tracker: ReviewTracker,
    navigator: ReviewNavigator,
}

impl ReviewSession {
    /// Open a session over `run` with every key pending.
    pub fn start(run: ExtractionRun, policy: ReviewPolicy) -> Self {
        let mut tracker = ReviewTracker::with_policy(policy);
        tracker.initialize(run.results());
        let navigator = ReviewNavigator::new(run.requested_keys().to_vec());
        info!("Review session started with {} key(s)", navigator.ordered_keys().len());
        Self {
            run,
            tracker,
            navigator,
        }
    }

    /// Replace the extraction run. All previous review records are dropped.
    pub fn replace_run(&mut self, run: ExtractionRun) {
        let policy = self.tracker.policy();
        *self = Self::start(run, policy);
    }

    pub fn run(&self) -> &ExtractionRun {
        &self.run
    }

    pub fn tracker(&self) -> &ReviewTracker {
        &self.tracker
    }

    pub fn navigator(&self) -> &ReviewNavigator {
        &self.navigator
    }

    pub fn current_key(&self) -> Option<&str> {
        self.navigator.current_key()
    }

    pub fn current_result(&self) -> Option<&ExtractionResult> {
        self.current_key().and_then(|key| self.run.get(key))
    }

    /// Record for `key`, or the default pending one if it is not tracked.
    pub fn record(&self, key: &str) -> ReviewRecord {
        self.tracker.get_or_default(key, &self.run)
    }

    pub fn current_record(&self) -> Option<ReviewRecord> {
        self.current_key().map(|key| self.record(key))
    }

    /// Accept `key` and, on success, move to the next key.
    pub fn accept(&mut self, key: &str) -> Outcome {
        self.ensure_tracked(key);
        let outcome = self.tracker.accept(key);
        if outcome.is_applied() {
            debug!("Accepted '{}'", key);
            self.navigator.advance_after_commit();
        }
        outcome
    }

    pub fn accept_current(&mut self) -> Outcome {
        match self.current_key().map(str::to_string) {
            Some(key) => self.accept(&key),
            None => Outcome::Rejected(Rejection::UnknownKey { key: String::new() }),
        }
    }

    /// Edit `key` and, on success, move to the next key.
    pub fn edit(&mut self, key: &str, new_value: &str) -> Outcome {
        self.ensure_tracked(key);
        let outcome = self.tracker.edit(key, new_value);
        if outcome.is_applied() {
            debug!("Edited '{}'", key);
            self.navigator.advance_after_commit();
        }
        outcome
    }

    /// Open the edit form for the current key, pre-filled with its value.
    pub fn begin_edit(&mut self) -> bool {
        let Some(record) = self.current_record() else {
            return false;
        };
        self.navigator.begin_edit(record.value().to_string())
    }

    pub fn is_editing(&self) -> bool {
        self.navigator.is_editing()
    }

    pub fn edit_buffer(&self) -> Option<&str> {
        self.navigator.edit_buffer()
    }

    pub fn edit_buffer_mut(&mut self) -> Option<&mut String> {
        self.navigator.edit_buffer_mut()
    }

    /// Commit the open edit form to the current key.
    ///
    /// A rejected edit keeps the form open with its buffer intact.
    pub fn commit_edit(&mut self) -> Outcome {
        let Some(key) = self.current_key().map(str::to_string) else {
            return Outcome::Rejected(Rejection::UnknownKey { key: String::new() });
        };
        let Some(buffer) = self.navigator.take_edit() else {
            return Outcome::Rejected(Rejection::InvalidTransition {
                action: "commit an edit for",
                from: self.record(&key).status(),
            });
        };

        let outcome = self.edit(&key, &buffer);
        if !outcome.is_applied() {
            self.navigator.begin_edit(buffer);
        }
        outcome
    }

    /// Close the edit form, discarding the buffer.
    pub fn cancel_edit(&mut self) -> bool {
        self.navigator.take_edit().is_some()
    }

    pub fn next(&mut self) -> bool {
        self.navigator.next()
    }

    pub fn previous(&mut self) -> bool {
        self.navigator.previous()
    }

    pub fn go_to(&mut self, key: &str) -> bool {
        self.navigator.go_to(key)
    }

    /// Return to `key` from the summary: back to pending, then make it current.
    pub fn review_again(&mut self, key: &str) -> bool {
        if self.navigator.position(key).is_none() {
            return false;
        }
        self.ensure_tracked(key);
        self.tracker.reopen(key);
        self.navigator.go_to(key)
    }

    pub fn all_reviewed(&self) -> bool {
        self.navigator.all_reviewed(&self.tracker)
    }

    pub fn pending_count(&self) -> usize {
        self.navigator.pending_count(&self.tracker)
    }

    /// Reconciled payload for export. Callers gate this on [`all_reviewed`].
    ///
    /// [`all_reviewed`]: ReviewSession::all_reviewed
    pub fn export_payload(&self) -> ExportPayload {
        build_export_payload(&self.run, &self.tracker)
    }

    /// Per-key summary in alphabetical order.
    pub fn summary(&self) -> Vec<SummaryRow> {
        self.run
            .results()
            .map(|result| {
                let record = self.record(&result.key);
                SummaryRow {
                    key: result.key.clone(),
                    status: record.status(),
                    modified: record.is_modified(),
                    value: record.value().to_string(),
                    original_value: record.original_value().to_string(),
                }
            })
            .collect()
    }

    fn ensure_tracked(&mut self, key: &str) {
        if self.tracker.get(key).is_none() {
            if let Some(result) = self.run.get(key) {
                self.tracker.initialize(std::iter::once(result));
            }
        }
    }
}
