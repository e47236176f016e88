//! `/extraction-results`: stored extraction runs.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use spec_assistant_core::{NewExtractionRecord, RecordId};
use tracing::{error, info};

use crate::export::error_response;
use crate::repository::RepositoryError;
use crate::AppState;

fn storage_failure(e: RepositoryError) -> Response {
    error!("Extraction history storage failed: {}", e);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Extraction history unavailable")
}

async fn create_extraction_result(
    State(state): State<Arc<AppState>>,
    Json(record): Json<NewExtractionRecord>,
) -> Response {
    let created_at = chrono::Utc::now().timestamp();
    match state.repository.insert(record, created_at).await {
        Ok(stored) => {
            info!(
                "Stored extraction result {} ({} keys)",
                stored.id,
                stored.extraction_results.len()
            );
            (StatusCode::CREATED, Json(stored)).into_response()
        }
        Err(e) => storage_failure(e),
    }
}

async fn list_extraction_results(State(state): State<Arc<AppState>>) -> Response {
    match state.repository.list().await {
        Ok(records) => Json(records).into_response(),
        Err(e) => storage_failure(e),
    }
}

async fn get_extraction_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Response {
    match state.repository.get(RecordId(id)).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Extraction result {} not found", id),
        ),
        Err(e) => storage_failure(e),
    }
}

pub fn history_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/extraction-results",
            get(list_extraction_results).post(create_extraction_result),
        )
        .route("/extraction-results/:id", get(get_extraction_result))
}
