use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use customs_exam::config::StorageConfig;
use customs_exam::error::AppError;
use customs_exam::workflows::exam::persistence::Document;
use customs_exam::workflows::exam::{
    build_export, DocumentStore, ExamError, ExamGateway, ExamSession, ExportFile, ExportFormat,
    ExportSettings, InMemoryDocumentStore, JsonFileDocumentStore, StoreError, TrackingKey,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Backend picked at startup from `APP_STORE_PATH`.
pub(crate) enum ConfiguredStore {
    Memory(InMemoryDocumentStore),
    File(JsonFileDocumentStore),
}

impl ConfiguredStore {
    pub(crate) fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        match &config.path {
            Some(path) => {
                info!(path = %path.display(), "using json file exam store");
                Ok(Self::File(JsonFileDocumentStore::open(path)?))
            }
            None => {
                info!("using in-memory exam store");
                Ok(Self::Memory(InMemoryDocumentStore::new()))
            }
        }
    }

    pub(crate) fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::File(_) => "json-file",
        }
    }
}

impl DocumentStore for ConfiguredStore {
    fn fetch(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        match self {
            Self::Memory(store) => store.fetch(collection, key),
            Self::File(store) => store.fetch(collection, key),
        }
    }

    fn merge(&self, collection: &str, key: &str, document: Document) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.merge(collection, key, document),
            Self::File(store) => store.merge(collection, key, document),
        }
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        match self {
            Self::Memory(store) => store.list(collection),
            Self::File(store) => store.list(collection),
        }
    }
}

/// Renders a stored exam, outside any editing session.
pub(crate) fn export_saved_exam<S: DocumentStore>(
    gateway: &ExamGateway<S>,
    tracking_number: &str,
    format: ExportFormat,
    settings: &ExportSettings,
    generated_at: DateTime<Utc>,
) -> Result<ExportFile, AppError> {
    let key = TrackingKey::parse(tracking_number).map_err(ExamError::from)?;
    let record = gateway.recover(&key)?;
    let session = ExamSession {
        header: record.header,
        is_recovered: record.is_recovered,
    };
    Ok(build_export(
        format,
        &session,
        &record.products,
        settings,
        generated_at,
    )?)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_export_format(raw: &str) -> Result<ExportFormat, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "text" | "txt" => Ok(ExportFormat::Text),
        "spreadsheet" | "xlsx" => Ok(ExportFormat::Spreadsheet),
        "csv" => Ok(ExportFormat::Csv),
        other => Err(format!(
            "unknown export format '{other}' (expected text, spreadsheet or csv)"
        )),
    }
}

/// Midnight UTC of the given day, or now when no date was requested.
pub(crate) fn generation_time(date: Option<NaiveDate>) -> DateTime<Utc> {
    date.and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_else(Utc::now)
}
