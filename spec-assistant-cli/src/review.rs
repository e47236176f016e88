//! The terminal review loop.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use spec_assistant_core::{
    handle_key, BackendClient, ExportError, ExportFormat, ExportPayload, ExtractionRecord,
    KeyEffect, KeyInput, NewExtractionRecord, ReviewSession,
};
use tracing::{info, warn};

use crate::input::{parse_line, Line, HELP};
use crate::render::{render_card, render_summary};

/// The backend calls made when the reviewer exports.
pub trait ExportBackend {
    fn download_export(
        &self,
        payload: &ExportPayload,
        format: ExportFormat,
    ) -> Result<Vec<u8>, ExportError>;
    fn save_extraction_result(&self, record: &NewExtractionRecord) -> Result<ExtractionRecord>;
}

impl ExportBackend for BackendClient {
    fn download_export(
        &self,
        payload: &ExportPayload,
        format: ExportFormat,
    ) -> Result<Vec<u8>, ExportError> {
        BackendClient::download_export(self, payload, format)
    }

    fn save_extraction_result(&self, record: &NewExtractionRecord) -> Result<ExtractionRecord> {
        BackendClient::save_extraction_result(self, record)
    }
}

pub struct ExportTarget {
    pub format: ExportFormat,
    pub output: PathBuf,
    pub file_ids: Vec<String>,
    pub language: String,
}

/// How the review loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewEnd {
    Closed,
    EndOfInput,
}

pub fn run_review<R: BufRead, W: Write>(
    session: &mut ReviewSession,
    backend: &dyn ExportBackend,
    target: &ExportTarget,
    input: R,
    out: &mut W,
) -> Result<ReviewEnd> {
    writeln!(out, "{}", render_card(session))?;
    // `again` only applies to the summary the reviewer is looking at.
    let mut summary_open = false;

    for line in input.lines() {
        let line = line.context("Failed to read review input")?;
        let parsed = parse_line(&line, session.is_editing());
        let showing_summary = matches!(parsed, Line::Summary);
        match parsed {
            Line::Key(key) => match handle_key(session, key) {
                KeyEffect::Render => writeln!(out, "{}", render_card(session))?,
                KeyEffect::Ignored => {}
                KeyEffect::Rejected(rejection) => writeln!(out, "Not applied: {}", rejection)?,
                KeyEffect::Close => {
                    writeln!(out, "Review closed.")?;
                    return Ok(ReviewEnd::Closed);
                }
                KeyEffect::Export => export(session, backend, target, out)?,
            },
            Line::Text(text) => {
                for c in text.chars() {
                    handle_key(session, KeyInput::Char(c));
                }
                writeln!(out, "{}", render_card(session))?;
            }
            Line::Clear => {
                if let Some(buffer) = session.edit_buffer_mut() {
                    buffer.clear();
                }
                writeln!(out, "{}", render_card(session))?;
            }
            Line::Summary => writeln!(out, "{}", render_summary(&session.summary()))?,
            Line::Again(_) if !summary_open => {
                writeln!(out, "Type summary first, then again <key>.")?
            }
            Line::Again(key) => {
                if session.review_again(&key) {
                    writeln!(out, "{}", render_card(session))?;
                } else {
                    writeln!(out, "No key named '{}'.", key)?;
                }
            }
            Line::Help => writeln!(out, "{}", HELP)?,
            Line::Unknown(text) => {
                writeln!(out, "Unrecognised input '{}'. Type help for keys.", text)?
            }
        }
        summary_open = showing_summary;
    }

    if session.cancel_edit() {
        info!("Input ended with the edit form open; discarding the edit");
    }
    Ok(ReviewEnd::EndOfInput)
}

/// Export the reconciled payload. Backend and file failures are reported to
/// the reviewer and leave the session as it was.
fn export<W: Write>(
    session: &ReviewSession,
    backend: &dyn ExportBackend,
    target: &ExportTarget,
    out: &mut W,
) -> Result<()> {
    let payload = session.export_payload();
    let bytes = match backend.download_export(&payload, target.format) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Export failed: {}", e);
            writeln!(out, "Export failed: {}. Press d to retry.", e)?;
            return Ok(());
        }
    };

    if let Err(e) = std::fs::write(&target.output, &bytes) {
        warn!("Failed to write {}: {}", target.output.display(), e);
        writeln!(
            out,
            "Export failed: could not write {}: {}. Press d to retry.",
            target.output.display(),
            e
        )?;
        return Ok(());
    }
    writeln!(out, "Exported {} key(s) to {}", payload.len(), target.output.display())?;

    let record =
        NewExtractionRecord::from_export(target.file_ids.clone(), &payload, &target.language);
    match backend.save_extraction_result(&record) {
        Ok(stored) => info!("Recorded extraction run #{}", stored.id),
        Err(e) => warn!("Could not record extraction run in history: {:#}", e),
    }
    Ok(())
}
