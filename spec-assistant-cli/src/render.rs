//! Plain-text rendering of the review card, summary and history.

use std::fmt::Write;

use spec_assistant_core::{ExtractionRecord, ReviewSession, SummaryRow};

fn one_line(value: &str) -> String {
    value.replace('\n', " / ")
}

/// The current key's card, or a completion note when nothing is left.
pub fn render_card(session: &ReviewSession) -> String {
    let mut out = String::new();
    let total = session.navigator().ordered_keys().len();

    let (Some(key), Some(record)) = (session.current_key(), session.current_record()) else {
        return "No keys to review.".to_string();
    };

    let _ = writeln!(
        out,
        "[{}/{}] {} ({})",
        session.navigator().current_index() + 1,
        total,
        key,
        record.status()
    );
    let _ = writeln!(out, "  Value: {}", one_line(record.value()));
    if record.is_modified() {
        let _ = writeln!(out, "  Extracted: {}", one_line(record.original_value()));
    }

    if let Some(result) = session.current_result() {
        let mut sources: Vec<(&str, Vec<String>)> = Vec::new();
        for reference in &result.references {
            let page = reference.page_number.to_string();
            match sources
                .iter_mut()
                .find(|(doc, _)| *doc == reference.source_document_id)
            {
                Some((_, pages)) => pages.push(page),
                None => sources.push((reference.source_document_id.as_str(), vec![page])),
            }
        }
        if !sources.is_empty() {
            let listed: Vec<String> = sources
                .iter()
                .map(|(doc, pages)| format!("{} (pages {})", doc, pages.join(", ")))
                .collect();
            let _ = writeln!(out, "  Source: {}", listed.join("; "));
        }
        if let Some(note) = result.references.first().map(|r| &r.excerpt_text) {
            if !note.is_empty() {
                let _ = writeln!(out, "  Note: {}", one_line(note));
            }
        }
    }

    if let Some(buffer) = session.edit_buffer() {
        let _ = writeln!(out, "  Editing: {}", one_line(buffer));
    }

    let pending = session.pending_count();
    if pending == 0 {
        out.push_str("All keys reviewed. d to export, esc to close, summary to list.");
    } else {
        let _ = write!(out, "{} of {} pending.", pending, total);
    }
    out
}

/// One line per key: key, status, value, and the extracted value if edited.
pub fn render_summary(rows: &[SummaryRow]) -> String {
    let key_width = rows
        .iter()
        .map(|r| r.key.chars().count())
        .max()
        .unwrap_or(0);

    rows.iter()
        .map(|row| {
            let mut line = format!(
                "{:<kw$}  {:<8}  {}",
                row.key,
                row.status.to_string(),
                one_line(&row.value),
                kw = key_width
            );
            if row.modified {
                let _ = write!(line, "  (edited from: {})", one_line(&row.original_value));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_history(records: &[ExtractionRecord]) -> String {
    if records.is_empty() {
        return "No stored extraction runs.".to_string();
    }
    records
        .iter()
        .map(|record| {
            let when = chrono::DateTime::from_timestamp(record.created_at, 0)
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| record.created_at.to_string());
            format!(
                "#{}  {}  {} key(s), {} found  [{}]  files: {}",
                record.id,
                when,
                record.extraction_results.len(),
                record.found_count(),
                record.language,
                record.file_ids.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
