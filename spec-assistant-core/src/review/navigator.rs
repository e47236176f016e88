//! Review navigator: which key is current, whether its edit form is open,
//! and whether the session is complete.

use super::tracker::ReviewTracker;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewNavigator {
    ordered_keys: Vec<String>,
    current_index: usize,
    /// Edit buffer for the current key; `Some` while the edit form is open.
    editing: Option<String>,
}

impl ReviewNavigator {
    /// Navigator over `ordered_keys`, starting at the first key.
    ///
    /// The order is fixed for the lifetime of the navigator. Repeated key
    /// names keep their first position.
    pub fn new(ordered_keys: Vec<String>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let ordered_keys = ordered_keys
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect();
        Self {
            ordered_keys,
            current_index: 0,
            editing: None,
        }
    }

    pub fn ordered_keys(&self) -> &[String] {
        &self.ordered_keys
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_key(&self) -> Option<&str> {
        self.ordered_keys
            .get(self.current_index)
            .map(String::as_str)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.ordered_keys.iter().position(|k| k == key)
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 >= self.ordered_keys.len()
    }

    /// Move forward one key. Does not wrap. Returns whether it moved.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.current_index += 1;
        self.editing = None;
        true
    }

    /// Move back one key. Does not wrap. Returns whether it moved.
    pub fn previous(&mut self) -> bool {
        if self.current_index == 0 {
            return false;
        }
        self.current_index -= 1;
        self.editing = None;
        true
    }

    /// Jump to `key`. Unknown keys leave the position unchanged.
    pub fn go_to(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(index) => {
                if index != self.current_index {
                    self.editing = None;
                }
                self.current_index = index;
                true
            }
            None => false,
        }
    }

    /// Navigation after a successful accept or edit: forward unless the
    /// current key is the last one, in which case the card stays put.
    pub fn advance_after_commit(&mut self) {
        self.editing = None;
        self.next();
    }

    /// True iff no key in the navigation order is still pending.
    ///
    /// Recomputed from the tracker on every call.
    pub fn all_reviewed(&self, tracker: &ReviewTracker) -> bool {
        self.pending_count(tracker) == 0
    }

    /// Keys in the navigation order that are pending or untracked.
    pub fn pending_count(&self, tracker: &ReviewTracker) -> usize {
        self.ordered_keys
            .iter()
            .filter(|key| !tracker.status(key).is_some_and(|s| s.is_reviewed()))
            .count()
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Open the edit form for the current key with `initial` in the buffer.
    pub fn begin_edit(&mut self, initial: String) -> bool {
        if self.current_key().is_none() {
            return false;
        }
        self.editing = Some(initial);
        true
    }

    pub fn edit_buffer(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn edit_buffer_mut(&mut self) -> Option<&mut String> {
        self.editing.as_mut()
    }

    /// Close the edit form, handing back whatever was in the buffer.
    pub fn take_edit(&mut self) -> Option<String> {
        self.editing.take()
    }
}
