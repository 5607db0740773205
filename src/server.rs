//! HTTP boundary for the notifier.
//!
//! `POST /notify` runs one full pass and `POST /notify/preview` stops after
//! filtering. `POST /upload-students` replaces the roster file. Failures map
//! to a status by error kind and carry a JSON `detail` describing the cause.

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::{
    config::Config,
    eligibility::{EligibilityCriteria, FilterOutcome},
    error::{NotifyError, Result},
    notify::{NotificationPipeline, SmtpMailer},
    roster::FileRoster,
    storage::{record_run, NotificationRun},
};

pub struct AppState {
    pub pipeline: NotificationPipeline,
    /// Run history is skipped when unset
    pub database_path: Option<String>,
    /// File replaced by uploads; uploads are refused when unset
    pub upload_target: Option<FileRoster>,
}

/// Largest accepted roster upload
const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub type SharedState = Arc<AppState>;

pub fn build_router(state: SharedState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/notify", post(notify_handler))
        .route("/notify/preview", post(preview_handler))
        .route(
            "/upload-students",
            post(upload_handler).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .layer(cors_layer(allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

/// Start the HTTP server and serve until shutdown
pub async fn start(config: Config) -> Result<()> {
    let mailer = SmtpMailer::new(config.smtp.clone())?;
    let roster = FileRoster::new(config.roster.path.clone(), config.roster.sheet.clone());
    let pipeline = NotificationPipeline::new(Arc::new(roster.clone()), Arc::new(mailer));

    let state = Arc::new(AppState {
        pipeline,
        database_path: Some(config.database.path.clone()),
        upload_target: Some(roster),
    });
    let app = build_router(state, &config.server.allowed_origins);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(
        "Serving on {} (roster: {})",
        addr,
        config.roster.path.display()
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Error wrapper rendered as `{"detail": ..., "kind": ...}`
pub struct ApiError(pub NotifyError);

impl From<NotifyError> for ApiError {
    fn from(e: NotifyError) -> Self {
        ApiError(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    kind: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            NotifyError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NotifyError::Dispatch(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            detail: self.0.to_string(),
            kind: self.0.kind(),
        };
        (status, Json(body)).into_response()
    }
}

fn criteria_from(
    payload: std::result::Result<Json<EligibilityCriteria>, JsonRejection>,
) -> std::result::Result<EligibilityCriteria, ApiError> {
    match payload {
        Ok(Json(criteria)) => Ok(criteria),
        Err(rejection) => Err(NotifyError::Validation(rejection.body_text()).into()),
    }
}

/// Write the run to history before the response goes out
async fn remember(state: &AppState, run: NotificationRun) {
    if let Some(path) = state.database_path.clone() {
        if let Err(e) = tokio::task::spawn_blocking(move || record_run(&path, &run)).await {
            warn!("History write did not complete: {}", e);
        }
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub message: String,
    pub notified_count: usize,
}

async fn notify_handler(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<EligibilityCriteria>, JsonRejection>,
) -> std::result::Result<Json<NotifyResponse>, ApiError> {
    let criteria = criteria_from(payload)?;

    info!(
        "Notify request for '{}' (min cgpa {}, {} required skills)",
        criteria.internship_name,
        criteria.min_cgpa,
        criteria.required_skills.len()
    );

    match state.pipeline.handle(&criteria).await {
        Ok(summary) => {
            remember(&state, NotificationRun::completed(&criteria, &summary)).await;
            Ok(Json(NotifyResponse {
                message: summary.message(),
                notified_count: summary.notified_count,
            }))
        }
        Err(failure) => {
            remember(&state, NotificationRun::failed(&criteria, &failure)).await;
            Err(ApiError(failure.error))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub internship_name: String,
    #[serde(flatten)]
    pub outcome: FilterOutcome,
}

async fn preview_handler(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<EligibilityCriteria>, JsonRejection>,
) -> std::result::Result<Json<PreviewResponse>, ApiError> {
    let criteria = criteria_from(payload)?;
    let outcome = state.pipeline.preview(&criteria).await?;

    Ok(Json(PreviewResponse {
        internship_name: criteria.internship_name,
        outcome,
    }))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub total_students: usize,
}

async fn upload_handler(
    State(state): State<SharedState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<UploadResponse>, ApiError> {
    let target = state
        .upload_target
        .clone()
        .ok_or_else(|| NotifyError::Config("Roster uploads are not configured".into()))?;
    let mut multipart = multipart.map_err(|r| NotifyError::Validation(r.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| NotifyError::Validation(e.body_text()))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().map(str::to_string);
            let contents = field
                .bytes()
                .await
                .map_err(|e| NotifyError::Validation(e.body_text()))?;
            upload = Some((file_name, contents));
            break;
        }
    }

    let (file_name, contents) = upload
        .ok_or_else(|| NotifyError::Validation("Form field 'file' is required".into()))?;
    info!(
        "Roster upload {:?} ({} bytes)",
        file_name.as_deref().unwrap_or("-"),
        contents.len()
    );

    let total_students =
        tokio::task::spawn_blocking(move || target.replace(file_name.as_deref(), &contents))
            .await
            .map_err(|e| NotifyError::Other(e.into()))??;

    Ok(Json(UploadResponse {
        message: format!("Uploaded roster with {} students.", total_students),
        total_students,
    }))
}
