use crate::infra::{export_saved_exam, parse_export_format, AppState};
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use customs_exam::error::AppError;
use customs_exam::navigation::{NavigationTable, RoleNavigation};
use customs_exam::workflows::exam::{exam_router, DocumentStore, ExamService, ExportSettings};
use serde_json::json;
use std::sync::Arc;

/// Exam API plus the operational endpoints and stored-exam downloads.
pub(crate) fn with_exam_routes<S>(
    service: Arc<ExamService<S>>,
    export: ExportSettings,
) -> axum::Router
where
    S: DocumentStore + 'static,
{
    let downloads = axum::Router::new()
        .route(
            "/api/v1/exams/:tracking_number/export/:format",
            axum::routing::get(saved_export_endpoint::<S>),
        )
        .layer(Extension(Arc::clone(&service)))
        .layer(Extension(Arc::new(export)));

    exam_router(service)
        .merge(downloads)
        .route("/api/v1/navigation", axum::routing::get(navigation_index))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn navigation_index() -> Json<Vec<RoleNavigation>> {
    Json(
        NavigationTable::global()
            .roles()
            .into_iter()
            .cloned()
            .collect(),
    )
}

pub(crate) async fn saved_export_endpoint<S>(
    Extension(service): Extension<Arc<ExamService<S>>>,
    Extension(export): Extension<Arc<ExportSettings>>,
    Path((tracking_number, format)): Path<(String, String)>,
) -> Result<Response, AppError>
where
    S: DocumentStore + 'static,
{
    let format = match parse_export_format(&format) {
        Ok(format) => format,
        Err(message) => {
            return Ok((StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response())
        }
    };

    let file = export_saved_exam(
        service.gateway(),
        &tracking_number,
        format,
        &export,
        Utc::now(),
    )?;
    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use customs_exam::workflows::exam::{
        ExamHeader, Identity, InMemoryDocumentStore, ProductDetails,
    };
    use tower::ServiceExt;

    fn service() -> Arc<ExamService<InMemoryDocumentStore>> {
        Arc::new(ExamService::new(
            Arc::new(InMemoryDocumentStore::new()),
            ExportSettings::default(),
        ))
    }

    async fn get(router: axum::Router, uri: &str) -> Response {
        router
            .oneshot(
                Request::get(uri)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn navigation_index_lists_every_role() {
        let router = with_exam_routes(service(), ExportSettings::default());
        let response = get(router, "/api/v1/navigation").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload.as_array().map(Vec::len), Some(5));
    }

    #[tokio::test]
    async fn saved_exam_downloads_as_spreadsheet() {
        let service = service();
        let (session, _) = service.create_session().expect("session");
        service
            .submit_header(
                &session,
                ExamHeader {
                    tracking_number: "ne-81".to_string(),
                    manager: "Ana".to_string(),
                    location: "Patio".to_string(),
                    ..ExamHeader::default()
                },
            )
            .expect("header");
        service
            .add_product(&session, ProductDetails::default())
            .expect("product");
        let identity = Identity::new("inspector-4").expect("identity");
        service
            .save_draft(&session, Some(&identity), Utc::now())
            .expect("draft");

        let router = with_exam_routes(Arc::clone(&service), ExportSettings::default());
        let response = get(router.clone(), "/api/v1/exams/ne-81/export/xlsx").await;
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .expect("disposition")
            .to_string();
        assert!(disposition.contains("ExamenPrevio_NE-81_"));

        let response = get(router.clone(), "/api/v1/exams/ne-82/export/text").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = get(router, "/api/v1/exams/ne-81/export/pdf").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
