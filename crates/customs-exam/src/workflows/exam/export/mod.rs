//! Downloadable renderings of an exam: plain text, `.xlsx`, and `.csv`.

mod spreadsheet;
mod text;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ExamSession, ProductLine, TrackingKey};
use super::error::ValidationErrors;

pub use spreadsheet::{sheet_title, SpreadsheetLayout, HEADER_PADDING, TABLE_COLUMNS};
pub use text::render_text;

pub const DEFAULT_FILE_PREFIX: &str = "ExamenPrevio";

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("spreadsheet generation failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
    #[error("csv generation failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("export io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Text,
    Spreadsheet,
    Csv,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Spreadsheet => "xlsx",
            Self::Csv => "csv",
        }
    }

    pub fn content_type(self) -> String {
        match self {
            Self::Text => mime::TEXT_PLAIN_UTF_8.to_string(),
            Self::Spreadsheet => XLSX_CONTENT_TYPE.to_string(),
            Self::Csv => mime::TEXT_CSV_UTF_8.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub file_prefix: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// `<prefix>_<TRACKING>_<YYYY-MM-DD>.<ext>`
pub fn export_filename(
    prefix: &str,
    key: &TrackingKey,
    date: NaiveDate,
    format: ExportFormat,
) -> String {
    let tracking: String = key
        .as_str()
        .chars()
        .map(|ch| if ch == '/' || ch == '\\' { '-' } else { ch })
        .collect();
    format!(
        "{prefix}_{tracking}_{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Renders the exam in the requested format. `generated_at` names the file
/// and is the only timestamp embedded in the spreadsheet header.
pub fn build_export(
    format: ExportFormat,
    session: &ExamSession,
    products: &[ProductLine],
    settings: &ExportSettings,
    generated_at: DateTime<Utc>,
) -> Result<ExportFile, ExportError> {
    let key = TrackingKey::parse(&session.header.tracking_number)?;
    let bytes = match format {
        ExportFormat::Text => render_text(session, products).into_bytes(),
        ExportFormat::Spreadsheet => {
            SpreadsheetLayout::build(session, products, generated_at).to_xlsx()?
        }
        ExportFormat::Csv => SpreadsheetLayout::build(session, products, generated_at).to_csv()?,
    };

    Ok(ExportFile {
        filename: export_filename(
            &settings.file_prefix,
            &key,
            generated_at.date_naive(),
            format,
        ),
        content_type: format.content_type(),
        bytes,
    })
}
