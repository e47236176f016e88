use anyhow::Result;
use axum::{
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

use spec_assistant_server::config::Config;
use spec_assistant_server::export::export_router;
use spec_assistant_server::history::history_router;
use spec_assistant_server::repository::SqliteRepository;
use spec_assistant_server::AppState;

async fn health_check() -> Result<Json<serde_json::Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "spec-assistant"
    })))
}

async fn help_handler(headers: HeaderMap) -> Response {
    let accept = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json");

    if accept.to_lowercase().contains("text/html") {
        return Html(generate_help_html()).into_response();
    }

    let version = spec_assistant_server::get_service_version();
    let json_data = json!({
        "service": "spec-assistant",
        "version": version,
        "description": "Spreadsheet export and history for reviewed key extractions",
        "endpoints": [
            {
                "path": "/health",
                "method": "GET",
                "description": "Health check endpoint",
                "response_format": "application/json"
            },
            {
                "path": "/help",
                "method": "GET",
                "description": "API documentation and service information",
                "response_format": "Supports content negotiation (JSON/HTML)"
            },
            {
                "path": "/download-extraction-excel",
                "method": "POST",
                "description": "Render extraction results as an .xlsx workbook",
                "response_format": "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            },
            {
                "path": "/download-extraction-pdf",
                "method": "POST",
                "description": "Render extraction results as a PDF key/value report",
                "response_format": "application/pdf"
            },
            {
                "path": "/extraction-results",
                "method": "GET, POST",
                "description": "List or store extraction runs",
                "response_format": "application/json"
            },
            {
                "path": "/extraction-results/{id}",
                "method": "GET",
                "description": "Fetch one stored extraction run",
                "response_format": "application/json"
            }
        ],
        "configuration": {
            "optional_env_vars": [
                "PORT (default: 8000)",
                "STATE_DIR (default: current directory)",
                "MAX_EXPORT_KEYS (default: 1000)",
                "WORKSHEET_NAME (default: Extracted Keys)"
            ]
        }
    });

    Json(json_data).into_response()
}

fn generate_help_html() -> String {
    const HELP_HTML_TEMPLATE: &str = include_str!("help.html");
    let version = spec_assistant_server::get_service_version();
    HELP_HTML_TEMPLATE.replace("{version}", &version)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!(
        "Starting Spec Assistant service {}",
        spec_assistant_server::get_service_version()
    );

    let config =
        Config::from_env().expect("Failed to load configuration from environment variables");

    let db_path = config.state_dir.join("spec-assistant-history.db");
    info!("Using history database: {}", db_path.display());
    let repository =
        SqliteRepository::new(&db_path).expect("Failed to initialize SQLite database");

    let port = config.port;
    let app_state = Arc::new(AppState::new(config, Arc::new(repository)));

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/help", get(help_handler))
        .merge(export_router())
        .merge(history_router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server listening on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
