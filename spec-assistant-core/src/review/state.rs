//! Per-key review state.
//!
//! Each requested key has a [`ReviewRecord`] that moves between three states:
//!
//! ```text
//! pending --accept--> accepted
//! any     --edit----> edited
//! accepted|edited --reopen--> pending
//! ```
//!
//! There is no terminal state. Record fields are only writable from inside the
//! `review` module so every mutation goes through the tracker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Review status of a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Not yet reviewed.
    #[default]
    Pending,
    /// Reviewer confirmed the extracted value unmodified.
    Accepted,
    /// Reviewer supplied a replacement value (possibly identical text).
    Edited,
}

impl ReviewStatus {
    pub fn is_reviewed(self) -> bool {
        !matches!(self, ReviewStatus::Pending)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Edited => write!(f, "edited"),
        }
    }
}

/// Review bookkeeping for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    pub(super) status: ReviewStatus,
    pub(super) value: String,
    pub(super) original_value: String,
}

impl ReviewRecord {
    /// A fresh pending record whose value is the extracted value.
    pub fn pending(original_value: impl Into<String>) -> Self {
        let original_value = original_value.into();
        Self {
            status: ReviewStatus::Pending,
            value: original_value.clone(),
            original_value,
        }
    }

    pub fn status(&self) -> ReviewStatus {
        self.status
    }

    /// The value that will be exported.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The extracted value at the time the record was created.
    pub fn original_value(&self) -> &str {
        &self.original_value
    }

    /// True when the current value has drifted from the extracted one.
    pub fn is_modified(&self) -> bool {
        self.value != self.original_value
    }
}

/// Why a review action left the state untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The action is not allowed from the key's current status.
    InvalidTransition {
        action: &'static str,
        from: ReviewStatus,
    },
    /// The key is not part of the session.
    UnknownKey { key: String },
    /// An edit trimmed to nothing while empty edits are disallowed.
    EmptyValue,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { action, from } => {
                write!(f, "cannot {} a key that is {}", action, from)
            }
            Self::UnknownKey { key } => write!(f, "unknown key '{}'", key),
            Self::EmptyValue => write!(f, "empty values are not allowed"),
        }
    }
}

/// Result of a review action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_default_is_pending() {
        assert_eq!(ReviewStatus::default(), ReviewStatus::Pending);
        assert!(!ReviewStatus::Pending.is_reviewed());
        assert!(ReviewStatus::Accepted.is_reviewed());
        assert!(ReviewStatus::Edited.is_reviewed());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ReviewStatus::Edited).unwrap();
        assert_eq!(json, "\"edited\"");
    }

    #[test]
    fn test_pending_record_mirrors_original() {
        let record = ReviewRecord::pending("Acme");
        assert_eq!(record.status(), ReviewStatus::Pending);
        assert_eq!(record.value(), "Acme");
        assert_eq!(record.original_value(), "Acme");
        assert!(!record.is_modified());
    }

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection::InvalidTransition {
            action: "accept",
            from: ReviewStatus::Edited,
        };
        assert_eq!(rejection.to_string(), "cannot accept a key that is edited");
    }
}
