// Snapshot Diff - Web Server
// REST API with Axum: upload two snapshots, get every comparison back as JSON

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use snapshot_diff::{
    detect_format, load_dataset_from_bytes, run_job, ConfigError, JobConfig, JobReport,
    ParseError, SchemaError,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
struct AppState {
    /// Used when a request carries no `config` field
    config: Arc<JobConfig>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "compare failed");
        } else {
            tracing::warn!(status = %self.status, error = %self.message, "compare rejected");
        }
        (self.status, Json(ApiResponse::err(self.message))).into_response()
    }
}

impl From<SchemaError> for ApiError {
    fn from(e: SchemaError) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: e.to_string(),
        }
    }
}

impl From<ParseError> for ApiError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Schema(schema) => schema.into(),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// POST /api/compare - multipart `old`, `new` files plus optional `config` TOML
async fn compare(State(state): State<AppState>, multipart: Multipart) -> Response {
    match run_compare(state, multipart).await {
        Ok(report) => (StatusCode::OK, Json(ApiResponse::ok(report))).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn run_compare(state: AppState, mut multipart: Multipart) -> Result<JobReport, ApiError> {
    let mut old = None;
    let mut new = None;
    let mut config_text = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "old" | "new" => {
                let file_name = field
                    .file_name()
                    .ok_or_else(|| ApiError::bad_request(format!("field '{name}' must be a file")))?
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?
                    .to_vec();
                let upload = Upload { file_name, bytes };
                if name == "old" {
                    old = Some(upload);
                } else {
                    new = Some(upload);
                }
            }
            "config" => {
                config_text = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?,
                );
            }
            other => tracing::debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let old = old.ok_or_else(|| ApiError::bad_request("missing 'old' file"))?;
    let new = new.ok_or_else(|| ApiError::bad_request("missing 'new' file"))?;
    let config = match config_text {
        Some(text) if !text.trim().is_empty() => Arc::new(JobConfig::from_toml(&text)?),
        _ => state.config.clone(),
    };

    tracing::info!(old = %old.file_name, new = %new.file_name, "comparing uploads");

    // Parsing and diffing are CPU-bound
    tokio::task::spawn_blocking(move || compare_uploads(&config, old, new))
        .await
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("comparison task failed: {e}"),
        })?
}

fn compare_uploads(config: &JobConfig, old: Upload, new: Upload) -> Result<JobReport, ApiError> {
    let old = load_dataset_from_bytes(old.bytes, detect_format(&old.file_name)?)?;
    let new = load_dataset_from_bytes(new.bytes, detect_format(&new.file_name)?)?;
    Ok(run_job(config, &old, &new)?)
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/compare", post(compare))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
}

// ============================================================================
// MAIN
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("SNAPSHOT_DIFF_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("snapshot_diff=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::var("SNAPSHOT_DIFF_CONFIG") {
        Ok(path) => JobConfig::from_file(&path)
            .map_err(|e| anyhow::anyhow!("failed to load config {path}: {e}"))?,
        Err(_) => JobConfig::default(),
    };
    tracing::info!(
        key_column = %config.key_column,
        comparisons = config.comparisons.len(),
        "job config loaded"
    );

    let state = AppState {
        config: Arc::new(config),
    };
    let app = router(state);

    let addr = std::env::var("SNAPSHOT_DIFF_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("🌐 Snapshot Diff - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🚀 Server running on http://{addr}");
    println!("   POST /api/compare  (multipart: old, new, config?)");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl+c");
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapshot_diff::Side;

    #[test]
    fn test_schema_errors_are_unprocessable() {
        let err: ApiError = SchemaError::MissingColumn {
            side: Some(Side::Old),
            column: "Request ID".into(),
        }
        .into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let err: ApiError = ParseError::Schema(SchemaError::DuplicateColumn("id".into())).into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_parse_errors_are_bad_requests() {
        let err: ApiError = ParseError::UnsupportedFormat("txt".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: ApiError = ConfigError::Validation("empty".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_compare_uploads_end_to_end() {
        let old = Upload {
            file_name: "old.csv".into(),
            bytes: b"Request ID,Delivery Date,Request Status\n1,2024-01-01,open\n".to_vec(),
        };
        let new = Upload {
            file_name: "new.csv".into(),
            bytes: b"Request ID,Delivery Date,Request Status\n1,2024-03-01,open\n".to_vec(),
        };

        let report = compare_uploads(&JobConfig::default(), old, new).unwrap();
        assert_eq!(report.get("delivery_dates").unwrap().result.len(), 1);
        assert!(report.get("request_status").unwrap().result.is_empty());
    }
}
