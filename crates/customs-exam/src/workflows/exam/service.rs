use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::dashboard::views::ExamDashboardSummary;
use super::dashboard::ExamDashboard;
use super::domain::{ExamHeader, ExamRecord, Identity, ProductDetails, ProductId, TrackingKey};
use super::error::ExamError;
use super::export::{build_export, ExportError, ExportFile, ExportFormat, ExportSettings};
use super::persistence::{DocumentStore, ExamGateway};
use super::stepper::{ExamPreview, ExamSnapshot, ExamWorkflow};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("exam-{id:06}"))
}

/// Hosts one [`ExamWorkflow`] per user flow plus the shared gateway.
///
/// Each workflow is owned by a single session id; the only state shared
/// between sessions is the document store behind the gateway.
pub struct ExamService<S> {
    gateway: ExamGateway<S>,
    export: ExportSettings,
    sessions: Mutex<HashMap<SessionId, ExamWorkflow>>,
}

impl<S> ExamService<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>, export: ExportSettings) -> Self {
        Self {
            gateway: ExamGateway::new(store),
            export,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn gateway(&self) -> &ExamGateway<S> {
        &self.gateway
    }

    pub fn create_session(&self) -> Result<(SessionId, ExamSnapshot), ExamServiceError> {
        let id = next_session_id();
        let workflow = ExamWorkflow::new();
        let snapshot = workflow.snapshot();
        self.sessions
            .lock()
            .map_err(|_| ExamServiceError::Unavailable)?
            .insert(id.clone(), workflow);
        info!(session_id = %id.0, "exam session created");
        Ok((id, snapshot))
    }

    fn with_session<T>(
        &self,
        id: &SessionId,
        apply: impl FnOnce(&mut ExamWorkflow, &ExamGateway<S>) -> Result<T, ExamError>,
    ) -> Result<T, ExamServiceError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|_| ExamServiceError::Unavailable)?;
        let workflow = guard
            .get_mut(id)
            .ok_or_else(|| ExamServiceError::SessionNotFound(id.0.clone()))?;
        Ok(apply(workflow, &self.gateway)?)
    }

    pub fn snapshot(&self, id: &SessionId) -> Result<ExamSnapshot, ExamServiceError> {
        self.with_session(id, |workflow, _| Ok(workflow.snapshot()))
    }

    pub fn submit_header(
        &self,
        id: &SessionId,
        header: ExamHeader,
    ) -> Result<ExamSnapshot, ExamServiceError> {
        self.with_session(id, |workflow, _| {
            workflow.submit_header(header)?;
            Ok(workflow.snapshot())
        })
    }

    pub fn recover(
        &self,
        id: &SessionId,
        tracking_number: &str,
    ) -> Result<ExamSnapshot, ExamServiceError> {
        self.with_session(id, |workflow, gateway| {
            workflow.recover(gateway, tracking_number)?;
            Ok(workflow.snapshot())
        })
    }

    pub fn add_product(
        &self,
        id: &SessionId,
        details: ProductDetails,
    ) -> Result<ProductId, ExamServiceError> {
        self.with_session(id, |workflow, _| workflow.add_product(details))
    }

    pub fn add_product_with_id(
        &self,
        id: &SessionId,
        product_id: ProductId,
        details: ProductDetails,
    ) -> Result<ProductId, ExamServiceError> {
        self.with_session(id, |workflow, _| {
            workflow.add_product_with_id(product_id, details)
        })
    }

    pub fn update_product(
        &self,
        id: &SessionId,
        product_id: &ProductId,
        details: ProductDetails,
    ) -> Result<ExamSnapshot, ExamServiceError> {
        self.with_session(id, |workflow, _| {
            workflow.update_product(product_id, details)?;
            Ok(workflow.snapshot())
        })
    }

    pub fn remove_product(
        &self,
        id: &SessionId,
        product_id: &ProductId,
    ) -> Result<ExamSnapshot, ExamServiceError> {
        self.with_session(id, |workflow, _| {
            workflow.remove_product(product_id)?;
            Ok(workflow.snapshot())
        })
    }

    pub fn open_preview(&self, id: &SessionId) -> Result<ExamPreview, ExamServiceError> {
        self.with_session(id, |workflow, _| {
            workflow.open_preview()?;
            workflow.preview()
        })
    }

    pub fn back_to_products(&self, id: &SessionId) -> Result<ExamSnapshot, ExamServiceError> {
        self.with_session(id, |workflow, _| {
            workflow.back_to_products()?;
            Ok(workflow.snapshot())
        })
    }

    pub fn confirm(&self, id: &SessionId) -> Result<ExamSnapshot, ExamServiceError> {
        self.with_session(id, |workflow, _| {
            workflow.confirm()?;
            Ok(workflow.snapshot())
        })
    }

    pub fn review(&self, id: &SessionId) -> Result<ExamPreview, ExamServiceError> {
        self.with_session(id, |workflow, _| {
            workflow.review()?;
            workflow.preview()
        })
    }

    pub fn save(
        &self,
        id: &SessionId,
        identity: Option<&Identity>,
        reset: bool,
        now: DateTime<Utc>,
    ) -> Result<ExamRecord, ExamServiceError> {
        self.with_session(id, |workflow, gateway| {
            if reset {
                workflow.save_and_reset(gateway, identity, now)
            } else {
                workflow.save(gateway, identity, now)
            }
        })
    }

    pub fn save_draft(
        &self,
        id: &SessionId,
        identity: Option<&Identity>,
        now: DateTime<Utc>,
    ) -> Result<ExamRecord, ExamServiceError> {
        self.with_session(id, |workflow, gateway| {
            workflow.save_draft(gateway, identity, now)
        })
    }

    pub fn start_new(
        &self,
        id: &SessionId,
        confirmed: bool,
    ) -> Result<ExamSnapshot, ExamServiceError> {
        self.with_session(id, |workflow, _| {
            workflow.start_new(confirmed)?;
            Ok(workflow.snapshot())
        })
    }

    pub fn export(
        &self,
        id: &SessionId,
        format: ExportFormat,
        now: DateTime<Utc>,
    ) -> Result<ExportFile, ExamServiceError> {
        let (session, products) = self.with_session(id, |workflow, _| {
            Ok((workflow.session().clone(), workflow.products().to_vec()))
        })?;
        Ok(build_export(
            format,
            &session,
            &products,
            &self.export,
            now,
        )?)
    }

    /// Direct lookup of a stored exam, outside any session.
    pub fn lookup(&self, tracking_number: &str) -> Result<ExamRecord, ExamServiceError> {
        let key = TrackingKey::parse(tracking_number).map_err(ExamError::from)?;
        Ok(self.gateway.recover(&key)?)
    }

    pub fn dashboard(&self) -> Result<ExamDashboardSummary, ExamServiceError> {
        let records = self.gateway.list()?;
        Ok(ExamDashboard::from_records(&records).summary())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExamServiceError {
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("exam session {0} not found")]
    SessionNotFound(String),
    #[error("exam session registry unavailable")]
    Unavailable,
}
