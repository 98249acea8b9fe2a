use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::exam::persistence::Document;
use crate::workflows::exam::{
    exam_router, DocumentStore, ExamGateway, ExamHeader, ExamService, ExamWorkflow,
    ExportSettings, Identity, InMemoryDocumentStore, ProductDetails, Quantity, StoreError,
};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn later() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 15, 16, 45, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn header() -> ExamHeader {
    ExamHeader {
        tracking_number: "ne-2025-0042".to_string(),
        reference: Some("REF-778".to_string()),
        manager: "Lucía Ramírez".to_string(),
        location: "Bodega 3".to_string(),
        consignee: Some("Importadora del Valle".to_string()),
    }
}

pub(super) fn conform_widgets() -> ProductDetails {
    ProductDetails {
        item_number: Some("001".to_string()),
        description: Some("Widget".to_string()),
        brand: Some("Acme".to_string()),
        origin: Some("MX".to_string()),
        quantity_packages: Quantity::from(2),
        quantity_units: Quantity::from(5),
        is_conform: true,
        ..ProductDetails::default()
    }
}

pub(super) fn damaged_pallet() -> ProductDetails {
    ProductDetails {
        item_number: Some("002".to_string()),
        description: Some("Tarima".to_string()),
        quantity_packages: Quantity::from(1),
        quantity_units: Quantity::Text("1 tarima".to_string()),
        is_fault: true,
        observation: Some("Esquina rota".to_string()),
        ..ProductDetails::default()
    }
}

pub(super) fn inspector() -> Identity {
    Identity::new("inspector-7").expect("non-blank identity")
}

pub(super) fn memory_gateway() -> ExamGateway<InMemoryDocumentStore> {
    ExamGateway::new(Arc::new(InMemoryDocumentStore::new()))
}

/// Workflow sitting on PRODUCT_LIST with the standard header.
pub(super) fn workflow_with_header() -> ExamWorkflow {
    let mut workflow = ExamWorkflow::new();
    workflow
        .submit_header(header())
        .expect("header accepted");
    workflow
}

pub(super) fn build_service() -> (
    ExamService<InMemoryDocumentStore>,
    Arc<InMemoryDocumentStore>,
) {
    let store = Arc::new(InMemoryDocumentStore::new());
    let service = ExamService::new(store.clone(), ExportSettings::default());
    (service, store)
}

pub(super) fn exam_router_with_service<S>(service: ExamService<S>) -> axum::Router
where
    S: DocumentStore + 'static,
{
    exam_router(Arc::new(service))
}

/// Reads succeed with nothing stored; every write is refused.
pub(super) struct ReadOnlyStore;

impl DocumentStore for ReadOnlyStore {
    fn fetch(&self, _collection: &str, _key: &str) -> Result<Option<Document>, StoreError> {
        Ok(None)
    }

    fn merge(&self, _collection: &str, _key: &str, _document: Document) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("read only".to_string()))
    }

    fn list(&self, _collection: &str) -> Result<Vec<Document>, StoreError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableStore;

impl DocumentStore for UnavailableStore {
    fn fetch(&self, _collection: &str, _key: &str) -> Result<Option<Document>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn merge(&self, _collection: &str, _key: &str, _document: Document) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _collection: &str) -> Result<Vec<Document>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}
