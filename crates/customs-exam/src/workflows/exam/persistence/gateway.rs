use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use super::store::{Document, DocumentStore, StoreError};
use crate::workflows::exam::domain::{ExamRecord, ExamStatus, TrackingKey};
use crate::workflows::exam::error::ExamError;

pub const EXAM_COLLECTION: &str = "previous_exams";

const NULLABLE_RECORD_FIELDS: [&str; 5] = [
    "reference",
    "consignee",
    "savedAt",
    "lastUpdated",
    "completedAt",
];

const NULLABLE_PRODUCT_FIELDS: [&str; 10] = [
    "itemNumber",
    "description",
    "brand",
    "model",
    "serial",
    "origin",
    "weight",
    "unitMeasure",
    "numberPackages",
    "observation",
];

/// Persistence boundary for exam records.
///
/// Reads and writes go through a [`DocumentStore`] keyed by the uppercased
/// tracking number. Serialization happens here and nowhere else: absent
/// optional fields become explicit nulls and `products` is always an array.
#[derive(Debug)]
pub struct ExamGateway<S> {
    store: Arc<S>,
}

impl<S> Clone for ExamGateway<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> ExamGateway<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Looks up a saved exam. The key is already case-normalized.
    pub fn recover(&self, key: &TrackingKey) -> Result<ExamRecord, ExamError> {
        let document = self
            .store
            .fetch(EXAM_COLLECTION, key.as_str())?
            .ok_or_else(|| {
                warn!(tracking_number = %key, "exam not found for recovery");
                ExamError::NotFound {
                    tracking_number: key.as_str().to_string(),
                }
            })?;

        let record = from_document(key, document)?;
        info!(
            tracking_number = %key,
            products = record.products.len(),
            "exam recovered"
        );
        Ok(record)
    }

    /// Final save: marks the record complete and stamps every timestamp.
    pub fn save(&self, record: ExamRecord, now: DateTime<Utc>) -> Result<ExamRecord, ExamError> {
        self.write(record, ExamStatus::Complete, now)
    }

    /// Progress save: the record stays incomplete and recoverable.
    pub fn save_draft(
        &self,
        record: ExamRecord,
        now: DateTime<Utc>,
    ) -> Result<ExamRecord, ExamError> {
        self.write(record, ExamStatus::Incomplete, now)
    }

    fn write(
        &self,
        mut record: ExamRecord,
        status: ExamStatus,
        now: DateTime<Utc>,
    ) -> Result<ExamRecord, ExamError> {
        let key = record.tracking_key()?;
        record.header.tracking_number = key.as_str().to_string();
        record.status = status;
        record.saved_at = Some(now);
        record.last_updated = Some(now);
        record.completed_at = match status {
            ExamStatus::Complete => Some(now),
            ExamStatus::Incomplete => None,
        };

        let document = to_document(&record)?;
        self.store.merge(EXAM_COLLECTION, key.as_str(), document)?;
        info!(
            tracking_number = %key,
            status = status.label(),
            saved_by = %record.saved_by,
            products = record.products.len(),
            "exam saved"
        );
        Ok(record)
    }

    /// Every stored exam, skipping documents that no longer deserialize.
    pub fn list(&self) -> Result<Vec<ExamRecord>, ExamError> {
        let documents = self.store.list(EXAM_COLLECTION)?;
        let records = documents
            .into_iter()
            .filter_map(|document| {
                match serde_json::from_value::<ExamRecord>(Value::Object(document)) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        warn!(error = %err, "skipping unreadable exam document");
                        None
                    }
                }
            })
            .collect();
        Ok(records)
    }
}

/// Serializes a record into the store representation.
pub fn to_document(record: &ExamRecord) -> Result<Document, StoreError> {
    let mut document = match serde_json::to_value(record)? {
        Value::Object(map) => map,
        other => {
            return Err(StoreError::Corrupt {
                key: record.header.tracking_number.clone(),
                reason: format!("record serialized to non-object {other}"),
            })
        }
    };

    for field in NULLABLE_RECORD_FIELDS {
        document.entry(field).or_insert(Value::Null);
    }

    let products = document
        .entry("products")
        .or_insert_with(|| Value::Array(Vec::new()));
    if products.is_null() {
        *products = Value::Array(Vec::new());
    }
    if let Value::Array(lines) = products {
        for line in lines.iter_mut() {
            if let Value::Object(fields) = line {
                for field in NULLABLE_PRODUCT_FIELDS {
                    fields.entry(field).or_insert(Value::Null);
                }
            }
        }
    }

    Ok(document)
}

fn from_document(key: &TrackingKey, document: Document) -> Result<ExamRecord, StoreError> {
    serde_json::from_value(Value::Object(document)).map_err(|err| StoreError::Corrupt {
        key: key.as_str().to_string(),
        reason: err.to_string(),
    })
}
