use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::history::{ExtractionRecord, NewExtractionRecord};
use crate::review::ExportPayload;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Extraction over many pages can take minutes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// The export request failed. Review state is unaffected and the export can
/// be retried.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not reach the export service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("export service returned {status}: {detail}")]
    Rejected { status: u16, detail: String },
}

/// Document formats the export service renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Pdf,
}

impl ExportFormat {
    fn endpoint(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "/download-extraction-excel",
            ExportFormat::Pdf => "/download-extraction-pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// `extracted_keys.xlsx` or `extracted_keys.pdf`.
    pub fn default_filename(self) -> String {
        format!("extracted_keys.{}", self.extension())
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(anyhow!("Unknown export format '{}' (expected xlsx or pdf)", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessedFile {
    pub file_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub processed: Vec<ProcessedFile>,
    #[serde(default)]
    pub failed: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct KeyExtractionRequest<'a> {
    pub file_ids: &'a [String],
    pub key_names: &'a [String],
    pub language: &'a str,
}

#[derive(Debug, Serialize)]
struct DownloadRequest<'a> {
    extraction_results: &'a ExportPayload,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Synchronous client for the Spec Assistant backend.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("spec-assistant/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn upload_pdfs(&self, paths: &[&Path]) -> Result<UploadResponse> {
        let mut form = reqwest::blocking::multipart::Form::new();
        for path in paths {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document.pdf".to_string());
            let part = reqwest::blocking::multipart::Part::bytes(bytes)
                .file_name(filename)
                .mime_str("application/pdf")?;
            form = form.part("files", part);
        }

        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .context("Failed to upload PDFs")?;
        let response = check_status(response, "Upload")?;

        let upload: UploadResponse = response
            .json()
            .context("Failed to parse upload response")?;
        info!(
            "Uploaded {} file(s), {} failed",
            upload.processed.len(),
            upload.failed.len()
        );
        Ok(upload)
    }

    /// Run an extraction. The response is returned raw; normalize it with
    /// [`crate::extraction::ExtractionRun::from_response`].
    pub fn extract_keys(
        &self,
        file_ids: &[String],
        key_names: &[String],
        language: &str,
    ) -> Result<serde_json::Value> {
        let request = KeyExtractionRequest {
            file_ids,
            key_names,
            language,
        };
        debug!("Extracting {} key(s) from {} file(s)", key_names.len(), file_ids.len());

        let response = self
            .client
            .post(self.url("/extract-keys"))
            .json(&request)
            .send()
            .context("Failed to request key extraction")?;
        let response = check_status(response, "Extraction")?;

        response
            .json()
            .context("Failed to parse extraction response")
    }

    /// Turn reviewed results into document bytes in `format`.
    pub fn download_export(
        &self,
        payload: &ExportPayload,
        format: ExportFormat,
    ) -> std::result::Result<Vec<u8>, ExportError> {
        debug!("Exporting {} key(s) as {}", payload.len(), format);
        let response = self
            .client
            .post(self.url(format.endpoint()))
            .json(&DownloadRequest {
                extraction_results: payload,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.detail)
                .unwrap_or(body);
            return Err(ExportError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response.bytes()?.to_vec())
    }

    pub fn download_extraction_excel(
        &self,
        payload: &ExportPayload,
    ) -> std::result::Result<Vec<u8>, ExportError> {
        self.download_export(payload, ExportFormat::Xlsx)
    }

    pub fn download_extraction_pdf(
        &self,
        payload: &ExportPayload,
    ) -> std::result::Result<Vec<u8>, ExportError> {
        self.download_export(payload, ExportFormat::Pdf)
    }

    pub fn save_extraction_result(&self, record: &NewExtractionRecord) -> Result<ExtractionRecord> {
        let response = self
            .client
            .post(self.url("/extraction-results"))
            .json(record)
            .send()
            .context("Failed to save extraction result")?;
        let response = check_status(response, "History")?;

        response
            .json()
            .context("Failed to parse stored extraction result")
    }

    pub fn list_extraction_results(&self) -> Result<Vec<ExtractionRecord>> {
        let response = self
            .client
            .get(self.url("/extraction-results"))
            .send()
            .context("Failed to list extraction results")?;
        let response = check_status(response, "History")?;

        response
            .json()
            .context("Failed to parse extraction history")
    }
}

fn check_status(
    response: reqwest::blocking::Response,
    what: &str,
) -> Result<reqwest::blocking::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response
        .text()
        .context("Failed to read error response body")?;
    Err(anyhow!("{} API error: {} - {}", what, status, error_text))
}
