use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::exam::router::{lookup_handler, navigation_handler, IDENTITY_HEADER};
use crate::workflows::exam::persistence::EXAM_COLLECTION;
use crate::workflows::exam::{DocumentStore, ExamService, ExportSettings, InMemoryDocumentStore};

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    identity: Option<&str>,
) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(identity) = identity {
        request = request.header(IDENTITY_HEADER, identity);
    }
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).expect("serialize body"))
        }
        None => Body::empty(),
    };
    router
        .clone()
        .oneshot(request.body(body).expect("request builds"))
        .await
        .expect("route executes")
}

async fn open_session(router: &Router) -> String {
    let response = send(router, Method::POST, "/api/v1/exam-sessions", None, None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["workflow"]["step"], json!("INITIAL_INFO"));
    payload["session_id"]
        .as_str()
        .expect("session id")
        .to_string()
}

/// Session already moved through header, one product, preview and confirm.
async fn confirmed_session(router: &Router) -> String {
    let id = open_session(router).await;
    let base = format!("/api/v1/exam-sessions/{id}");
    let header = serde_json::to_value(header()).expect("header json");
    let product = serde_json::to_value(conform_widgets()).expect("product json");

    let response = send(router, Method::POST, &format!("{base}/header"), Some(header), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(router, Method::POST, &format!("{base}/products"), Some(product), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = send(router, Method::POST, &format!("{base}/preview"), None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(router, Method::POST, &format!("{base}/confirm"), None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    id
}

#[tokio::test]
async fn missing_header_fields_return_unprocessable_with_field_list() {
    let (service, _) = build_service();
    let router = exam_router_with_service(service);
    let id = open_session(&router).await;

    let response = send(
        &router,
        Method::POST,
        &format!("/api/v1/exam-sessions/{id}/header"),
        Some(json!({ "trackingNumber": "NE-1", "manager": "" })),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    let fields: Vec<&str> = payload["fields"]
        .as_array()
        .expect("fields array")
        .iter()
        .filter_map(|entry| entry["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["manager", "location"]);
}

#[tokio::test]
async fn recovering_unknown_exam_returns_not_found() {
    let (service, _) = build_service();
    let router = exam_router_with_service(service);
    let id = open_session(&router).await;

    let response = send(
        &router,
        Method::POST,
        &format!("/api/v1/exam-sessions/{id}/recover"),
        Some(json!({ "trackingNumber": "ne-missing" })),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["tracking_number"], json!("NE-MISSING"));
}

#[tokio::test]
async fn save_without_identity_is_unauthorized() {
    let (service, store) = build_service();
    let router = exam_router_with_service(service);
    let id = confirmed_session(&router).await;

    let response = send(
        &router,
        Method::POST,
        &format!("/api/v1/exam-sessions/{id}/save"),
        None,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(store.list(EXAM_COLLECTION).expect("list").is_empty());
}

#[tokio::test]
async fn save_with_reset_persists_and_returns_to_initial_info() {
    let (service, _) = build_service();
    let router = exam_router_with_service(service);
    let id = confirmed_session(&router).await;

    let response = send(
        &router,
        Method::POST,
        &format!("/api/v1/exam-sessions/{id}/save"),
        Some(json!({ "reset": true })),
        Some("inspector-7"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let record = read_json_body(response).await;
    assert_eq!(record["status"], json!("complete"));
    assert_eq!(record["savedBy"], json!("inspector-7"));

    let snapshot = send(
        &router,
        Method::GET,
        &format!("/api/v1/exam-sessions/{id}"),
        None,
        None,
    )
    .await;
    let snapshot = read_json_body(snapshot).await;
    assert_eq!(snapshot["step"], json!("INITIAL_INFO"));

    let lookup = send(&router, Method::GET, "/api/v1/exams/ne-2025-0042", None, None).await;
    assert_eq!(lookup.status(), StatusCode::OK);
}

#[tokio::test]
async fn out_of_order_confirm_returns_conflict() {
    let (service, _) = build_service();
    let router = exam_router_with_service(service);
    let id = open_session(&router).await;

    let response = send(
        &router,
        Method::POST,
        &format!("/api/v1/exam-sessions/{id}/confirm"),
        None,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn reset_without_confirmation_returns_conflict() {
    let (service, _) = build_service();
    let router = exam_router_with_service(service);
    let id = confirmed_session(&router).await;

    let response = send(
        &router,
        Method::POST,
        &format!("/api/v1/exam-sessions/{id}/reset"),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &router,
        Method::POST,
        &format!("/api/v1/exam-sessions/{id}/reset"),
        Some(json!({ "confirmed": true })),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn store_outage_returns_service_unavailable() {
    let service = ExamService::new(Arc::new(ReadOnlyStore), ExportSettings::default());
    let router = exam_router_with_service(service);
    let id = confirmed_session(&router).await;

    let response = send(
        &router,
        Method::POST,
        &format!("/api/v1/exam-sessions/{id}/save"),
        None,
        Some("inspector-7"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let snapshot = send(
        &router,
        Method::GET,
        &format!("/api/v1/exam-sessions/{id}"),
        None,
        None,
    )
    .await;
    let snapshot = read_json_body(snapshot).await;
    assert_eq!(snapshot["step"], json!("SUCCESS"));
    assert_eq!(snapshot["products"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn export_route_sets_download_headers() {
    let (service, _) = build_service();
    let router = exam_router_with_service(service);
    let id = confirmed_session(&router).await;

    let response = send(
        &router,
        Method::GET,
        &format!("/api/v1/exam-sessions/{id}/export/text"),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .expect("content disposition")
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"ExamenPrevio_NE-2025-0042_"));
    assert!(disposition.ends_with(".txt\""));
    let body = String::from_utf8(read_bytes(response).await).expect("utf-8 text");
    assert!(body.contains("Estado: Conforme a factura"));

    let response = send(
        &router,
        Method::GET,
        &format!("/api/v1/exam-sessions/{id}/export/pdf"),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_before_header_returns_unprocessable_with_field_list() {
    let (service, _) = build_service();
    let router = exam_router_with_service(service);
    let id = open_session(&router).await;

    let response = send(
        &router,
        Method::GET,
        &format!("/api/v1/exam-sessions/{id}/export/text"),
        None,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    let fields: Vec<&str> = payload["fields"]
        .as_array()
        .expect("fields array")
        .iter()
        .filter_map(|entry| entry["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["trackingNumber"]);
}

#[tokio::test]
async fn product_posted_with_id_keeps_it_and_rejects_repeats() {
    let (service, _) = build_service();
    let router = exam_router_with_service(service);
    let id = open_session(&router).await;
    let base = format!("/api/v1/exam-sessions/{id}");
    let header = serde_json::to_value(header()).expect("header json");
    let response = send(&router, Method::POST, &format!("{base}/header"), Some(header), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut product = serde_json::to_value(conform_widgets()).expect("product json");
    product["id"] = json!("line-a");
    let response = send(
        &router,
        Method::POST,
        &format!("{base}/products"),
        Some(product.clone()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(read_json_body(response).await["id"], json!("line-a"));

    let response = send(&router, Method::POST, &format!("{base}/products"), Some(product), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let mut unnamed = serde_json::to_value(damaged_pallet()).expect("product json");
    unnamed["id"] = json!("  ");
    let response = send(&router, Method::POST, &format!("{base}/products"), Some(unnamed), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_ne!(read_json_body(response).await["id"], json!("line-a"));
}

#[tokio::test]
async fn unknown_session_returns_not_found() {
    let (service, _) = build_service();
    let router = exam_router_with_service(service);

    let response = send(
        &router,
        Method::GET,
        "/api/v1/exam-sessions/exam-999999",
        None,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lookup_handler_maps_store_outage_to_service_unavailable() {
    let service = Arc::new(ExamService::new(
        Arc::new(UnavailableStore),
        ExportSettings::default(),
    ));

    let response = lookup_handler::<UnavailableStore>(
        State(service),
        Path("ne-2025-0042".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn navigation_handler_serves_known_roles_only() {
    let response = navigation_handler(Path("Examinador".to_string())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["home_route"], json!("/examen-previo"));

    let response = navigation_handler(Path("visitante".to_string())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_route_summarizes_saved_exams() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let service = ExamService::new(store, ExportSettings::default());
    let router = exam_router_with_service(service);
    let id = confirmed_session(&router).await;
    let response = send(
        &router,
        Method::POST,
        &format!("/api/v1/exam-sessions/{id}/save"),
        None,
        Some("inspector-7"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&router, Method::GET, "/api/v1/dashboard", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total_exams"], json!(1));
    assert_eq!(payload["total_products"], json!(1));
}
