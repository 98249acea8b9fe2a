mod gateway;
mod store;

pub use gateway::{to_document, ExamGateway, EXAM_COLLECTION};
pub use store::{Document, DocumentStore, InMemoryDocumentStore, JsonFileDocumentStore, StoreError};
