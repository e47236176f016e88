//! Human review of extracted key values.
//!
//! Every extracted key starts pending. The reviewer accepts it or edits it,
//! walking the keys in the order they were requested, and the export is only
//! offered once nothing is pending. Reviewed values are then merged back into
//! the extraction results for the spreadsheet export.

mod keys;
mod navigator;
mod reconcile;
mod session;
mod state;
mod tracker;

pub use keys::{handle_key, KeyEffect, KeyInput};
pub use navigator::ReviewNavigator;
pub use reconcile::{build_export_payload, ExportPayload};
pub use session::{ReviewSession, SummaryRow};
pub use state::{Outcome, Rejection, ReviewRecord, ReviewStatus};
pub use tracker::{ReviewPolicy, ReviewTracker};
