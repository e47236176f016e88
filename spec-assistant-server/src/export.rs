//! `/download-extraction-excel` and `/download-extraction-pdf`: reviewed
//! results in, a document out.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::excel::{build_workbook, rows_from_request, ExportRow};
use crate::pdf::build_pdf;
use crate::AppState;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const EXPORT_FILENAME: &str = "extracted_keys.xlsx";
pub const PDF_EXPORT_FILENAME: &str = "extracted_keys.pdf";

#[derive(Debug, Deserialize)]
pub struct ExcelDownloadRequest {
    #[serde(default)]
    pub extraction_results: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Excel,
    Pdf,
}

impl DocumentKind {
    fn label(self) -> &'static str {
        match self {
            DocumentKind::Excel => "Excel",
            DocumentKind::Pdf => "PDF",
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            DocumentKind::Excel => XLSX_CONTENT_TYPE,
            DocumentKind::Pdf => PDF_CONTENT_TYPE,
        }
    }

    fn filename(self) -> &'static str {
        match self {
            DocumentKind::Excel => EXPORT_FILENAME,
            DocumentKind::Pdf => PDF_EXPORT_FILENAME,
        }
    }
}

#[derive(Debug, Error)]
enum RenderError {
    #[error("{0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
    #[error("{0}")]
    Pdf(#[from] lopdf::Error),
}

fn render(kind: DocumentKind, rows: &[ExportRow], sheet_name: &str) -> Result<Vec<u8>, RenderError> {
    Ok(match kind {
        DocumentKind::Excel => build_workbook(rows, sheet_name)?,
        DocumentKind::Pdf => build_pdf(rows)?,
    })
}

pub fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": detail.into() }))).into_response()
}

async fn export_document(
    state: &AppState,
    request: ExcelDownloadRequest,
    kind: DocumentKind,
) -> Response {
    let key_count = request.extraction_results.len();
    if key_count > state.config.max_export_keys {
        warn!(
            "Refusing export of {} keys (limit {})",
            key_count, state.config.max_export_keys
        );
        return error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "Export has {} keys; at most {} are allowed",
                key_count, state.config.max_export_keys
            ),
        );
    }

    let rows = rows_from_request(&request.extraction_results);
    let sheet_name = state.config.worksheet_name.clone();

    let built = tokio::task::spawn_blocking(move || render(kind, &rows, &sheet_name)).await;
    let bytes = match built {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            error!("Failed to build {} export: {}", kind.label(), e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error generating {} file: {}", kind.label(), e),
            );
        }
        Err(e) => {
            error!("{} export task failed: {}", kind.label(), e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error generating {} file", kind.label()),
            );
        }
    };

    info!(
        "Exported {} key(s) to {} ({} bytes)",
        key_count,
        kind.label(),
        bytes.len()
    );

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, kind.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", kind.filename()),
            ),
        ],
        bytes,
    )
        .into_response()
}

async fn download_extraction_excel(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExcelDownloadRequest>,
) -> Response {
    export_document(&state, request, DocumentKind::Excel).await
}

async fn download_extraction_pdf(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExcelDownloadRequest>,
) -> Response {
    export_document(&state, request, DocumentKind::Pdf).await
}

pub fn export_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/download-extraction-excel", post(download_extraction_excel))
        .route("/download-extraction-pdf", post(download_extraction_pdf))
}
