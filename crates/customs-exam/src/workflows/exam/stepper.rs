use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use super::domain::{
    ExamHeader, ExamRecord, ExamSession, ExamStatus, Identity, ProductDetails, ProductId,
    ProductLine, TrackingKey,
};
use super::error::ExamError;
use super::persistence::{DocumentStore, ExamGateway};
use super::registry::ProductRegistry;

pub const EMPTY_PRODUCTS_MESSAGE: &str = "No hay productos registrados";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamStep {
    InitialInfo,
    ProductList,
    Preview,
    Success,
}

impl ExamStep {
    pub const fn label(self) -> &'static str {
        match self {
            Self::InitialInfo => "Información inicial",
            Self::ProductList => "Lista de productos",
            Self::Preview => "Vista previa",
            Self::Success => "Finalizado",
        }
    }
}

impl fmt::Display for ExamStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InitialInfo => "INITIAL_INFO",
            Self::ProductList => "PRODUCT_LIST",
            Self::Preview => "PREVIEW",
            Self::Success => "SUCCESS",
        };
        f.write_str(name)
    }
}

/// Read-only projection shown on the preview and success screens.
#[derive(Debug, Clone, Serialize)]
pub struct ExamPreview {
    pub session: ExamSession,
    pub products: Vec<ProductLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<&'static str>,
}

/// Serializable snapshot of a workflow for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ExamSnapshot {
    pub step: ExamStep,
    pub step_label: &'static str,
    pub session: ExamSession,
    pub products: Vec<ProductLine>,
}

/// Owned state of one user's exam in progress: header, line items and the
/// current step. Navigation never touches storage; only `recover`, `save`
/// and `save_draft` reach the gateway, and a failed call leaves every field
/// exactly as it was.
#[derive(Debug, Clone)]
pub struct ExamWorkflow {
    step: ExamStep,
    session: ExamSession,
    registry: ProductRegistry,
    /// Set by a successful save or recovery, cleared by any edit.
    persisted: bool,
}

impl Default for ExamWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamWorkflow {
    pub fn new() -> Self {
        Self {
            step: ExamStep::InitialInfo,
            session: ExamSession::default(),
            registry: ProductRegistry::new(),
            persisted: false,
        }
    }

    pub fn step(&self) -> ExamStep {
        self.step
    }

    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    pub fn products(&self) -> &[ProductLine] {
        self.registry.lines()
    }

    pub fn snapshot(&self) -> ExamSnapshot {
        ExamSnapshot {
            step: self.step,
            step_label: self.step.label(),
            session: self.session.clone(),
            products: self.registry.lines().to_vec(),
        }
    }

    fn require(&self, allowed: &[ExamStep], action: &'static str) -> Result<(), ExamError> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            warn!(step = %self.step, action, "rejected workflow transition");
            Err(ExamError::InvalidTransition {
                step: self.step,
                action,
            })
        }
    }

    /// INITIAL_INFO -> PRODUCT_LIST once the required header fields are present.
    pub fn submit_header(&mut self, header: ExamHeader) -> Result<(), ExamError> {
        self.require(&[ExamStep::InitialInfo], "submit the exam header")?;
        header.validate()?;
        self.session = ExamSession {
            header,
            is_recovered: false,
        };
        self.persisted = false;
        self.step = ExamStep::ProductList;
        Ok(())
    }

    /// Loads a saved exam and jumps straight to PRODUCT_LIST.
    pub fn recover<S: DocumentStore>(
        &mut self,
        gateway: &ExamGateway<S>,
        tracking_number: &str,
    ) -> Result<(), ExamError> {
        self.require(&[ExamStep::InitialInfo], "recover an exam")?;
        let key = TrackingKey::parse(tracking_number)?;
        let record = gateway.recover(&key)?;

        let mut header = record.header;
        header.tracking_number = key.as_str().to_string();
        self.session = ExamSession {
            header,
            is_recovered: true,
        };
        self.registry.replace_all(record.products);
        self.persisted = true;
        self.step = ExamStep::ProductList;
        Ok(())
    }

    pub fn add_product(&mut self, details: ProductDetails) -> Result<ProductId, ExamError> {
        self.require(&[ExamStep::ProductList], "add a product")?;
        let id = self.registry.add(details);
        self.persisted = false;
        Ok(id)
    }

    /// Adds a line that already carries its id. An id present in the list
    /// is rejected and nothing changes.
    pub fn add_product_with_id(
        &mut self,
        id: ProductId,
        details: ProductDetails,
    ) -> Result<ProductId, ExamError> {
        self.require(&[ExamStep::ProductList], "add a product")?;
        self.registry.add_with_id(id.clone(), details)?;
        self.persisted = false;
        Ok(id)
    }

    pub fn update_product(
        &mut self,
        id: &ProductId,
        details: ProductDetails,
    ) -> Result<(), ExamError> {
        self.require(&[ExamStep::ProductList], "edit a product")?;
        self.registry.update(id, details)?;
        self.persisted = false;
        Ok(())
    }

    /// The caller is expected to have confirmed the deletion with the user.
    pub fn remove_product(&mut self, id: &ProductId) -> Result<ProductLine, ExamError> {
        self.require(&[ExamStep::ProductList], "delete a product")?;
        let line = self.registry.remove(id)?;
        self.persisted = false;
        Ok(line)
    }

    /// PRODUCT_LIST -> PREVIEW. An empty product list is allowed.
    pub fn open_preview(&mut self) -> Result<(), ExamError> {
        self.require(&[ExamStep::ProductList], "open the preview")?;
        self.step = ExamStep::Preview;
        Ok(())
    }

    /// PREVIEW -> PRODUCT_LIST, keeping all data.
    pub fn back_to_products(&mut self) -> Result<(), ExamError> {
        self.require(&[ExamStep::Preview], "return to the product list")?;
        self.step = ExamStep::ProductList;
        Ok(())
    }

    /// PREVIEW -> SUCCESS. Does not persist anything.
    pub fn confirm(&mut self) -> Result<(), ExamError> {
        self.require(&[ExamStep::Preview], "confirm the exam")?;
        self.step = ExamStep::Success;
        Ok(())
    }

    /// SUCCESS -> PREVIEW, keeping all data.
    pub fn review(&mut self) -> Result<(), ExamError> {
        self.require(&[ExamStep::Success], "review the exam")?;
        self.step = ExamStep::Preview;
        Ok(())
    }

    pub fn preview(&self) -> Result<ExamPreview, ExamError> {
        self.require(&[ExamStep::Preview, ExamStep::Success], "view the preview")?;
        Ok(ExamPreview {
            session: self.session.clone(),
            products: self.registry.lines().to_vec(),
            empty_message: self.registry.is_empty().then_some(EMPTY_PRODUCTS_MESSAGE),
        })
    }

    /// True when the session holds edits that no save has stored yet.
    pub fn has_unsaved_data(&self) -> bool {
        let has_data = !self.session.header.is_blank() || !self.registry.is_empty();
        has_data && !self.persisted
    }

    /// Explicit "start new": discarding data needs the user's confirmation.
    pub fn start_new(&mut self, confirmed: bool) -> Result<(), ExamError> {
        if self.has_unsaved_data() && !confirmed {
            return Err(ExamError::ConfirmationRequired);
        }
        self.reset();
        Ok(())
    }

    /// Returns the workflow to its initial, empty state.
    pub fn reset(&mut self) {
        self.step = ExamStep::InitialInfo;
        self.session = ExamSession::default();
        self.registry.clear();
        self.persisted = false;
    }

    fn build_record(
        &self,
        identity: Option<&Identity>,
        status: ExamStatus,
    ) -> Result<ExamRecord, ExamError> {
        let identity = identity.ok_or(ExamError::IdentityMissing)?;
        let key = TrackingKey::parse(&self.session.header.tracking_number)?;
        Ok(ExamRecord::from_session(
            &self.session,
            &key,
            self.registry.lines().to_vec(),
            identity,
            status,
        ))
    }

    /// Final save from SUCCESS. The identity check happens before any store
    /// call, and a failure leaves the step and data untouched.
    pub fn save<S: DocumentStore>(
        &mut self,
        gateway: &ExamGateway<S>,
        identity: Option<&Identity>,
        now: DateTime<Utc>,
    ) -> Result<ExamRecord, ExamError> {
        self.require(&[ExamStep::Success], "save the exam")?;
        let record = self.build_record(identity, ExamStatus::Complete)?;
        let record = gateway.save(record, now)?;
        self.persisted = true;
        Ok(record)
    }

    /// Saves, then resets only if the write succeeded.
    pub fn save_and_reset<S: DocumentStore>(
        &mut self,
        gateway: &ExamGateway<S>,
        identity: Option<&Identity>,
        now: DateTime<Utc>,
    ) -> Result<ExamRecord, ExamError> {
        let record = self.save(gateway, identity, now)?;
        info!(tracking_number = %record.header.tracking_number, "exam saved, starting over");
        self.reset();
        Ok(record)
    }

    /// Stores progress as an incomplete record so it can be recovered later.
    pub fn save_draft<S: DocumentStore>(
        &mut self,
        gateway: &ExamGateway<S>,
        identity: Option<&Identity>,
        now: DateTime<Utc>,
    ) -> Result<ExamRecord, ExamError> {
        self.require(&[ExamStep::ProductList, ExamStep::Preview], "save a draft")?;
        let record = self.build_record(identity, ExamStatus::Incomplete)?;
        let record = gateway.save_draft(record, now)?;
        self.persisted = true;
        Ok(record)
    }
}
