//! Previous-exam ("examen previo") workflow: header capture, product line
//! editing, preview, and the final save, plus the exports and dashboard built
//! on top of saved records.

pub mod dashboard;
pub mod domain;
pub mod error;
pub mod export;
pub mod persistence;
pub mod registry;
pub mod router;
pub mod service;
pub mod stepper;

#[cfg(test)]
mod tests;

pub use domain::{
    ExamHeader, ExamRecord, ExamSession, ExamStatus, Identity, ProductDetails, ProductId,
    ProductLine, ProductStatus, Quantity, TrackingKey,
};
pub use error::{ExamError, FieldError, ValidationErrors};
pub use export::{
    build_export, export_filename, render_text, ExportError, ExportFile, ExportFormat,
    ExportSettings, SpreadsheetLayout,
};
pub use persistence::{
    DocumentStore, ExamGateway, InMemoryDocumentStore, JsonFileDocumentStore, StoreError,
};
pub use registry::ProductRegistry;
pub use router::exam_router;
pub use service::{ExamService, ExamServiceError, SessionId};
pub use stepper::{ExamPreview, ExamSnapshot, ExamStep, ExamWorkflow, EMPTY_PRODUCTS_MESSAGE};
