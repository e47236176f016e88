//! Spreadsheet rendering of extraction results.

use std::collections::BTreeMap;

use rust_xlsxwriter::{Color, Format, Workbook, XlsxError};
use serde_json::Value;
use spec_assistant_core::{KeyExtractionResult, SourceLocation, NOT_FOUND};
use tracing::warn;

pub const HEADERS: [&str; 4] = ["Key", "Value", "Description", "Reference"];
pub const EXTRACTION_FAILED: &str = "Extraction failed";
pub const NO_DESCRIPTION: &str = "No description";
pub const NO_REFERENCE: &str = "No reference";

/// Excel's limit on characters per cell.
const MAX_CELL_CHARS: usize = 32_767;

const COLUMN_WIDTHS: [f64; 4] = [30.0, 40.0, 60.0, 50.0];

/// One worksheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub key: String,
    pub value: String,
    pub description: String,
    pub reference: String,
}

impl ExportRow {
    /// Row for a key whose extraction returned nothing.
    pub fn failed(key: &str) -> Self {
        Self {
            key: key.to_string(),
            value: EXTRACTION_FAILED.to_string(),
            description: EXTRACTION_FAILED.to_string(),
            reference: EXTRACTION_FAILED.to_string(),
        }
    }

    pub fn from_result(key: &str, result: &KeyExtractionResult) -> Self {
        Self {
            key: key.to_string(),
            value: result
                .key_value
                .clone()
                .unwrap_or_else(|| NOT_FOUND.to_string()),
            description: result
                .description
                .clone()
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            reference: format_references(&result.source_locations),
        }
    }

    /// Row for one entry of an export request, in whatever shape it arrived.
    pub fn from_entry(key: &str, entry: &Value) -> Self {
        if entry.is_null() {
            return Self::failed(key);
        }
        let (result, malformed) = KeyExtractionResult::from_value_lenient(entry);
        if malformed {
            warn!("Malformed export entry for key '{}', using defaults", key);
        }
        Self::from_result(key, &result)
    }

    fn cells(&self) -> [&str; 4] {
        [&self.key, &self.value, &self.description, &self.reference]
    }
}

/// `"a.pdf (Pages: 1, 2); b.pdf (Pages: 7)"`, or [`NO_REFERENCE`].
pub fn format_references(locations: &[SourceLocation]) -> String {
    if locations.is_empty() {
        return NO_REFERENCE.to_string();
    }
    locations
        .iter()
        .map(|location| {
            let pages = location
                .page_numbers
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} (Pages: {})", location.pdf_filename, pages)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn rows_from_request(entries: &BTreeMap<String, Value>) -> Vec<ExportRow> {
    entries
        .iter()
        .map(|(key, entry)| ExportRow::from_entry(key, entry))
        .collect()
}

/// Drop characters that are invalid in worksheet XML and clamp to the cell
/// size limit.
pub fn sanitize_cell(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            let u = c as u32;
            matches!(c, '\t' | '\n' | '\r') || !(u < 0x20 || u == 0x7F || u == 0xFFFE || u == 0xFFFF)
        })
        .take(MAX_CELL_CHARS)
        .collect()
}

/// Render `rows` as an `.xlsx` workbook with a single sheet.
pub fn build_workbook(rows: &[ExportRow], sheet_name: &str) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x2563EB))
        .set_font_color(Color::RGB(0xFFFFFF));
    let text_format = Format::new().set_text_wrap();

    for (col, (header, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        worksheet.set_column_width(col, width)?;
        worksheet.write_string_with_format(0, col, *header, &header_format)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let excel_row = index as u32 + 1;
        for (col, cell) in row.cells().into_iter().enumerate() {
            worksheet.write_string_with_format(excel_row, col as u16, sanitize_cell(cell), &text_format)?;
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_entry_is_extraction_failed() {
        let row = ExportRow::from_entry("Vendor", &Value::Null);

        assert_eq!(row.value, "Extraction failed");
        assert_eq!(row.description, "Extraction failed");
        assert_eq!(row.reference, "Extraction failed");
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let row = ExportRow::from_entry("Vendor", &json!({"key_value": null}));

        assert_eq!(row.value, "Not found");
        assert_eq!(row.description, "No description");
        assert_eq!(row.reference, "No reference");
    }

    #[test]
    fn test_blank_reviewed_value_is_kept() {
        let row = ExportRow::from_entry("Vendor", &json!({"key_value": ""}));
        assert_eq!(row.value, "");
    }

    #[test]
    fn test_references_are_joined() {
        let row = ExportRow::from_entry(
            "Voltage",
            &json!({
                "key_value": "400 V",
                "description": "rating plate",
                "source_locations": [
                    {"pdf_filename": "a.pdf", "page_numbers": [1, 2]},
                    {"pdf_filename": "b.pdf", "page_numbers": [7]}
                ]
            }),
        );

        assert_eq!(row.reference, "a.pdf (Pages: 1, 2); b.pdf (Pages: 7)");
        assert_eq!(row.description, "rating plate");
    }

    #[test]
    fn test_rows_are_ordered_by_key() {
        let entries = BTreeMap::from([
            ("Voltage".to_string(), Value::Null),
            ("Model".to_string(), json!({"key_value": "X200"})),
        ]);

        let rows = rows_from_request(&entries);

        assert_eq!(rows[0].key, "Model");
        assert_eq!(rows[1].key, "Voltage");
    }

    #[test]
    fn test_sanitize_cell_drops_control_characters() {
        assert_eq!(sanitize_cell("a\u{0}b\u{7}c\nd\te"), "abc\nd\te");
        assert_eq!(sanitize_cell("<&>"), "<&>");
        assert_eq!(sanitize_cell(&"x".repeat(40_000)).len(), MAX_CELL_CHARS);
    }

    #[test]
    fn test_workbook_is_a_zip_archive() {
        let rows = vec![ExportRow::failed("Vendor")];

        let bytes = build_workbook(&rows, "Extracted Keys").unwrap();

        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_empty_export_still_builds() {
        let bytes = build_workbook(&[], "Extracted Keys").unwrap();
        assert!(!bytes.is_empty());
    }
}
