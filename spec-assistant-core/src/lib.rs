pub mod backend;
pub mod extraction;
pub mod history;
pub mod review;

pub use backend::{
    BackendClient, ExportError, ExportFormat, UploadResponse, DEFAULT_BACKEND_URL,
};
pub use extraction::{
    ExtractionResult, ExtractionRun, KeyExtractionResult, Reference, SavedExtraction, SourceLocation,
    NOT_FOUND,
};
pub use history::{ExtractionRecord, NewExtractionRecord, RecordId};
pub use review::*;
