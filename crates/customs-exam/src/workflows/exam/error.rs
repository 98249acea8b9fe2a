use serde::Serialize;
use std::fmt;

use super::domain::ProductId;
use super::persistence::StoreError;
use super::stepper::ExamStep;

/// A single inline validation failure for a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    pub const fn required(field: &'static str) -> Self {
        Self {
            field,
            message: "campo requerido",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    fields: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn single(error: FieldError) -> Self {
        Self {
            fields: vec![error],
        }
    }

    pub fn push(&mut self, error: FieldError) {
        self.fields.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.fields
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(|error| error.field).collect();
        write!(f, "missing required fields: {}", names.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Failures surfaced by the exam workflow. None of them are fatal; the
/// session stays usable and the caller may retry or navigate away.
#[derive(Debug, thiserror::Error)]
pub enum ExamError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("no exam found for tracking number {tracking_number}")]
    NotFound { tracking_number: String },
    #[error(transparent)]
    Persistence(#[from] StoreError),
    #[error("an authenticated identity is required to save an exam")]
    IdentityMissing,
    #[error("cannot {action} from the {step} step")]
    InvalidTransition { step: ExamStep, action: &'static str },
    #[error("product {0} not found")]
    ProductNotFound(ProductId),
    #[error("product {0} already exists")]
    DuplicateProduct(ProductId),
    #[error("discarding unsaved exam data requires confirmation")]
    ConfirmationRequired,
}
