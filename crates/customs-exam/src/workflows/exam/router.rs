use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{ExamHeader, Identity, ProductDetails, ProductId};
use super::error::ExamError;
use super::export::{ExportError, ExportFormat};
use super::persistence::DocumentStore;
use super::service::{ExamService, ExamServiceError, SessionId};
use crate::navigation::{NavigationTable, Role};

pub const IDENTITY_HEADER: &str = "x-user-id";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecoverRequest {
    pub(crate) tracking_number: String,
}

/// Product body; `id` is optional and a blank one is treated as absent.
#[derive(Debug, Deserialize)]
pub(crate) struct NewProductRequest {
    #[serde(default)]
    pub(crate) id: Option<ProductId>,
    #[serde(flatten)]
    pub(crate) details: ProductDetails,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SaveRequest {
    #[serde(default)]
    pub(crate) reset: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResetRequest {
    #[serde(default)]
    pub(crate) confirmed: bool,
}

/// Router builder exposing the exam workflow, lookups, dashboard and
/// navigation table over HTTP.
pub fn exam_router<S>(service: Arc<ExamService<S>>) -> Router
where
    S: DocumentStore + 'static,
{
    Router::new()
        .route("/api/v1/exam-sessions", post(create_handler::<S>))
        .route("/api/v1/exam-sessions/:session_id", get(snapshot_handler::<S>))
        .route(
            "/api/v1/exam-sessions/:session_id/header",
            post(header_handler::<S>),
        )
        .route(
            "/api/v1/exam-sessions/:session_id/recover",
            post(recover_handler::<S>),
        )
        .route(
            "/api/v1/exam-sessions/:session_id/products",
            post(add_product_handler::<S>),
        )
        .route(
            "/api/v1/exam-sessions/:session_id/products/:product_id",
            put(update_product_handler::<S>).delete(remove_product_handler::<S>),
        )
        .route(
            "/api/v1/exam-sessions/:session_id/preview",
            post(preview_handler::<S>),
        )
        .route(
            "/api/v1/exam-sessions/:session_id/back",
            post(back_handler::<S>),
        )
        .route(
            "/api/v1/exam-sessions/:session_id/confirm",
            post(confirm_handler::<S>),
        )
        .route(
            "/api/v1/exam-sessions/:session_id/review",
            post(review_handler::<S>),
        )
        .route(
            "/api/v1/exam-sessions/:session_id/save",
            post(save_handler::<S>),
        )
        .route(
            "/api/v1/exam-sessions/:session_id/draft",
            post(draft_handler::<S>),
        )
        .route(
            "/api/v1/exam-sessions/:session_id/reset",
            post(reset_handler::<S>),
        )
        .route(
            "/api/v1/exam-sessions/:session_id/export/:format",
            get(export_handler::<S>),
        )
        .route("/api/v1/exams/:tracking_number", get(lookup_handler::<S>))
        .route("/api/v1/dashboard", get(dashboard_handler::<S>))
        .route("/api/v1/navigation/:role", get(navigation_handler))
        .with_state(service)
}

fn identity_from(headers: &HeaderMap) -> Option<Identity> {
    headers
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(Identity::new)
}

fn error_body(message: String) -> Json<serde_json::Value> {
    Json(json!({ "error": message }))
}

pub(crate) fn error_response(error: ExamServiceError) -> Response {
    match error {
        ExamServiceError::Exam(ExamError::Validation(errors))
        | ExamServiceError::Export(ExportError::Validation(errors)) => {
            let payload = json!({
                "error": errors.to_string(),
                "fields": errors.fields(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        ExamServiceError::Exam(ExamError::NotFound { tracking_number }) => {
            let payload = json!({
                "error": format!("no exam found for tracking number {tracking_number}"),
                "tracking_number": tracking_number,
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        ExamServiceError::Exam(ExamError::IdentityMissing) => (
            StatusCode::UNAUTHORIZED,
            error_body(ExamError::IdentityMissing.to_string()),
        )
            .into_response(),
        ExamServiceError::Exam(
            err @ (ExamError::InvalidTransition { .. }
            | ExamError::ConfirmationRequired
            | ExamError::DuplicateProduct(_)),
        ) => (StatusCode::CONFLICT, error_body(err.to_string())).into_response(),
        ExamServiceError::Exam(err @ ExamError::ProductNotFound(_)) => {
            (StatusCode::NOT_FOUND, error_body(err.to_string())).into_response()
        }
        ExamServiceError::Exam(err @ ExamError::Persistence(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, error_body(err.to_string())).into_response()
        }
        err @ ExamServiceError::SessionNotFound(_) => {
            (StatusCode::NOT_FOUND, error_body(err.to_string())).into_response()
        }
        other => (StatusCode::INTERNAL_SERVER_ERROR, error_body(other.to_string())).into_response(),
    }
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, ExamServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_handler<S>(State(service): State<Arc<ExamService<S>>>) -> Response
where
    S: DocumentStore + 'static,
{
    match service.create_session() {
        Ok((session_id, snapshot)) => (
            StatusCode::CREATED,
            Json(json!({ "session_id": session_id, "workflow": snapshot })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn snapshot_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    respond(StatusCode::OK, service.snapshot(&SessionId(session_id)))
}

pub(crate) async fn header_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path(session_id): Path<String>,
    Json(header): Json<ExamHeader>,
) -> Response
where
    S: DocumentStore + 'static,
{
    respond(
        StatusCode::OK,
        service.submit_header(&SessionId(session_id), header),
    )
}

pub(crate) async fn recover_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path(session_id): Path<String>,
    Json(request): Json<RecoverRequest>,
) -> Response
where
    S: DocumentStore + 'static,
{
    respond(
        StatusCode::OK,
        service.recover(&SessionId(session_id), &request.tracking_number),
    )
}

pub(crate) async fn add_product_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path(session_id): Path<String>,
    Json(request): Json<NewProductRequest>,
) -> Response
where
    S: DocumentStore + 'static,
{
    let session = SessionId(session_id);
    let result = match request.id.filter(|id| !id.0.trim().is_empty()) {
        Some(product_id) => service.add_product_with_id(&session, product_id, request.details),
        None => service.add_product(&session, request.details),
    };
    match result {
        Ok(product_id) => {
            (StatusCode::CREATED, Json(json!({ "id": product_id }))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_product_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path((session_id, product_id)): Path<(String, String)>,
    Json(details): Json<ProductDetails>,
) -> Response
where
    S: DocumentStore + 'static,
{
    respond(
        StatusCode::OK,
        service.update_product(&SessionId(session_id), &ProductId(product_id), details),
    )
}

pub(crate) async fn remove_product_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path((session_id, product_id)): Path<(String, String)>,
) -> Response
where
    S: DocumentStore + 'static,
{
    respond(
        StatusCode::OK,
        service.remove_product(&SessionId(session_id), &ProductId(product_id)),
    )
}

pub(crate) async fn preview_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    respond(StatusCode::OK, service.open_preview(&SessionId(session_id)))
}

pub(crate) async fn back_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    respond(StatusCode::OK, service.back_to_products(&SessionId(session_id)))
}

pub(crate) async fn confirm_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    respond(StatusCode::OK, service.confirm(&SessionId(session_id)))
}

pub(crate) async fn review_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    respond(StatusCode::OK, service.review(&SessionId(session_id)))
}

pub(crate) async fn save_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    request: Option<Json<SaveRequest>>,
) -> Response
where
    S: DocumentStore + 'static,
{
    let identity = identity_from(&headers);
    let reset = request.map(|Json(body)| body.reset).unwrap_or(false);
    respond(
        StatusCode::OK,
        service.save(&SessionId(session_id), identity.as_ref(), reset, Utc::now()),
    )
}

pub(crate) async fn draft_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: DocumentStore + 'static,
{
    let identity = identity_from(&headers);
    respond(
        StatusCode::OK,
        service.save_draft(&SessionId(session_id), identity.as_ref(), Utc::now()),
    )
}

pub(crate) async fn reset_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path(session_id): Path<String>,
    request: Option<Json<ResetRequest>>,
) -> Response
where
    S: DocumentStore + 'static,
{
    let confirmed = request.map(|Json(body)| body.confirmed).unwrap_or(false);
    respond(
        StatusCode::OK,
        service.start_new(&SessionId(session_id), confirmed),
    )
}

pub(crate) async fn export_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path((session_id, format)): Path<(String, String)>,
) -> Response
where
    S: DocumentStore + 'static,
{
    let format = match format.as_str() {
        "text" => ExportFormat::Text,
        "spreadsheet" => ExportFormat::Spreadsheet,
        "csv" => ExportFormat::Csv,
        other => {
            return (
                StatusCode::NOT_FOUND,
                error_body(format!("unknown export format '{other}'")),
            )
                .into_response()
        }
    };

    match service.export(&SessionId(session_id), format, Utc::now()) {
        Ok(file) => {
            let disposition = format!("attachment; filename=\"{}\"", file.filename);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, file.content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                file.bytes,
            )
                .into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn lookup_handler<S>(
    State(service): State<Arc<ExamService<S>>>,
    Path(tracking_number): Path<String>,
) -> Response
where
    S: DocumentStore + 'static,
{
    respond(StatusCode::OK, service.lookup(&tracking_number))
}

pub(crate) async fn dashboard_handler<S>(State(service): State<Arc<ExamService<S>>>) -> Response
where
    S: DocumentStore + 'static,
{
    respond(StatusCode::OK, service.dashboard())
}

pub(crate) async fn navigation_handler(Path(role): Path<String>) -> Response {
    match role.parse::<Role>() {
        Ok(role) => (
            StatusCode::OK,
            Json(NavigationTable::global().for_role(role).clone()),
        )
            .into_response(),
        Err(err) => (StatusCode::NOT_FOUND, error_body(err.to_string())).into_response(),
    }
}
