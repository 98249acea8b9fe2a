use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::exam::{ExamError, ExamServiceError, ExportError, StoreError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Process-level failures surfaced by the binaries and the CLI commands.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Exam(ExamError),
    Export(ExportError),
    Store(StoreError),
    Session(ExamServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {err}"),
            AppError::Telemetry(err) => write!(f, "telemetry error: {err}"),
            AppError::Io(err) => write!(f, "io error: {err}"),
            AppError::Server(err) => write!(f, "server error: {err}"),
            AppError::Exam(err) => write!(f, "exam error: {err}"),
            AppError::Export(err) => write!(f, "export error: {err}"),
            AppError::Store(err) => write!(f, "storage error: {err}"),
            AppError::Session(err) => write!(f, "session error: {err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Exam(err) => Some(err),
            AppError::Export(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Session(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Exam(ExamError::Validation(_)) | AppError::Export(ExportError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Exam(ExamError::NotFound { .. } | ExamError::ProductNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Exam(ExamError::IdentityMissing) => StatusCode::UNAUTHORIZED,
            AppError::Exam(ExamError::Persistence(_)) | AppError::Store(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Exam(_) => StatusCode::CONFLICT,
            AppError::Session(ExamServiceError::SessionNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Export(_)
            | AppError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ExamError> for AppError {
    fn from(value: ExamError) -> Self {
        Self::Exam(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Workflow and export failures keep their own variants; only session
/// bookkeeping errors stay wrapped.
impl From<ExamServiceError> for AppError {
    fn from(value: ExamServiceError) -> Self {
        match value {
            ExamServiceError::Exam(err) => Self::Exam(err),
            ExamServiceError::Export(err) => Self::Export(err),
            other => Self::Session(other),
        }
    }
}
