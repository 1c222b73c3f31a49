// Axum API Server Module
//
// Purpose: REST endpoint wrapping the relevé analysis pipeline
// POST /api/analyze runs one full analysis; reference data is cached by file mtime

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use std::sync::Arc;

use crate::data::ReferencePaths;
use crate::encoder::{JsonEncoder, ResponseEncoder};
use crate::error::AnalysisError;
use crate::pipeline::{run_analysis, AnalysisRequest};
use crate::reference_store::ReferenceStore;

/// Prefix of the message returned for unexpected failures
pub const INTERNAL_ERROR_PREFIX: &str = "Une erreur est survenue pendant l'analyse";

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub references: Arc<ReferenceStore>,
    pub encoder: Arc<dyn ResponseEncoder>,
}

impl AppState {
    /// Build state for a data directory and warm the reference cache
    ///
    /// A missing trait reference is not fatal here: each request reports it.
    pub async fn new(data_dir: &str) -> Self {
        let state = Self::with_encoder(ReferencePaths::in_dir(data_dir), Arc::new(JsonEncoder));

        tracing::info!("Warming reference cache...");
        match state.references.get().await {
            Ok(refs) => tracing::info!(
                "Reference data ready ({} species, {} syntaxons)",
                refs.traits.len(),
                refs.syntaxons.len()
            ),
            Err(e) => tracing::warn!("Reference data not loadable yet: {}", e),
        }

        state
    }

    pub fn with_encoder(paths: ReferencePaths, encoder: Arc<dyn ResponseEncoder>) -> Self {
        Self {
            references: Arc::new(ReferenceStore::new(paths)),
            encoder,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Relevé analysis
        .route("/api/analyze", post(analyze_releves))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new()) // gzip + brotli compression
        .layer(CorsLayer::permissive()) // Allow all origins (adjust for production)
        .layer(TraceLayer::new_for_http()) // Request logging
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn analyze_releves(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    // An absent body behaves like an empty request object
    let request: AnalysisRequest = if body.iter().all(|b| b.is_ascii_whitespace()) {
        AnalysisRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Requête invalide: {}", e)))?
    };

    tracing::debug!(
        "Analyze request: {} rows, plots {:?}",
        request.releves_data.len(),
        request.selected_indices
    );

    let refs = state.references.get().await?;
    let encoder = state.encoder.clone();

    // Numeric routines are blocking: keep them off the async workers
    let start = std::time::Instant::now();
    let value = tokio::task::spawn_blocking(move || {
        let outcome = run_analysis(&request, &refs)?;
        encoder.encode_outcome(&outcome).map_err(AnalysisError::Internal)
    })
    .await
    .map_err(AppError::from_join)??;

    tracing::debug!("Analysis served in {:?}", start.elapsed());

    Ok(Json(value))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Internal { message: String, trace: String },
}

impl AppError {
    fn from_join(e: tokio::task::JoinError) -> Self {
        if e.is_panic() {
            let payload = e.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "analysis task panicked".to_string());
            AppError::Internal {
                trace: format!("panic: {}", message),
                message,
            }
        } else {
            AppError::Internal {
                message: format!("Task join error: {}", e),
                trace: format!("{:?}", e),
            }
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        if e.is_input() {
            AppError::BadRequest(e.to_string())
        } else {
            AppError::Internal {
                message: e.to_string(),
                trace: e.trace(),
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": message }),
            ),
            AppError::Internal { message, trace } => {
                let message = format!("{}: {}", INTERNAL_ERROR_PREFIX, message);
                tracing::error!("{}\n{}", message, trace);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": message, "trace": trace }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
