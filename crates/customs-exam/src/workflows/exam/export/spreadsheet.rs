use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook};

use super::ExportError;
use crate::workflows::exam::domain::{ExamSession, ProductLine};

/// Extra width given to cells of the header block.
pub const HEADER_PADDING: usize = 2;

const SHEET_NAME_LIMIT: usize = 31;

pub const TABLE_COLUMNS: [&str; 13] = [
    "Item",
    "Descripción",
    "Marca",
    "Modelo",
    "Serie",
    "Origen",
    "Peso",
    "Unidad de Medida",
    "N° Bultos",
    "Cant. Bultos",
    "Cant. Unidades",
    "Estado",
    "Observación",
];

/// Sheet title for an exam, clipped to what spreadsheet apps accept. Sheet
/// names cannot end with an apostrophe.
pub fn sheet_title(tracking_number: &str) -> String {
    let mut title: String = format!("Examen {}", tracking_number.to_uppercase())
        .chars()
        .map(|ch| match ch {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '-',
            other => other,
        })
        .take(SHEET_NAME_LIMIT)
        .collect();
    if title.ends_with('\'') {
        title.pop();
        title.push('-');
    }
    title
}

fn text_width(value: &str) -> usize {
    value.chars().count()
}

/// Cell grid of the spreadsheet export: four header rows, a blank spacer
/// row, then the product table with a fixed column set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetLayout {
    pub sheet_name: String,
    pub header_rows: Vec<Vec<String>>,
    pub table_header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub column_widths: Vec<usize>,
}

impl SpreadsheetLayout {
    pub fn build(
        session: &ExamSession,
        products: &[ProductLine],
        generated_at: DateTime<Utc>,
    ) -> Self {
        let header = &session.header;
        let tracking_number = header.tracking_number.to_uppercase();
        let header_rows = vec![
            vec!["EXAMEN PREVIO".to_string()],
            vec![
                "NE".to_string(),
                tracking_number.clone(),
                "Referencia".to_string(),
                header.reference.clone().unwrap_or_default(),
            ],
            vec![
                "Gestor".to_string(),
                header.manager.clone(),
                "Ubicación".to_string(),
                header.location.clone(),
            ],
            vec![
                "Consignatario".to_string(),
                header.consignee.clone().unwrap_or_default(),
                "Generado".to_string(),
                generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ],
        ];

        let rows: Vec<Vec<String>> = products
            .iter()
            .map(|product| {
                let details = &product.details;
                vec![
                    details.item_number.clone().unwrap_or_default(),
                    details.description.clone().unwrap_or_default(),
                    details.brand.clone().unwrap_or_default(),
                    details.model.clone().unwrap_or_default(),
                    details.serial.clone().unwrap_or_default(),
                    details.origin.clone().unwrap_or_default(),
                    details.weight.clone().unwrap_or_default(),
                    details.unit_measure.clone().unwrap_or_default(),
                    details.number_packages.clone().unwrap_or_default(),
                    details.quantity_packages.to_string(),
                    details.quantity_units.to_string(),
                    details.status_summary(),
                    details.observation.clone().unwrap_or_default(),
                ]
            })
            .collect();

        let column_widths = column_widths(&header_rows, &rows);

        Self {
            sheet_name: sheet_title(&tracking_number),
            header_rows,
            table_header: TABLE_COLUMNS.iter().map(|label| label.to_string()).collect(),
            rows,
            column_widths,
        }
    }

    /// Zero-based row index of the table header.
    pub fn table_start_row(&self) -> usize {
        self.header_rows.len() + 1
    }

    pub fn to_xlsx(&self) -> Result<Vec<u8>, ExportError> {
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&self.sheet_name)?;

            for (row, cells) in self.header_rows.iter().enumerate() {
                for (col, value) in cells.iter().enumerate() {
                    if col % 2 == 0 {
                        worksheet.write_string_with_format(row as u32, col as u16, value, &bold)?;
                    } else {
                        worksheet.write_string(row as u32, col as u16, value)?;
                    }
                }
            }

            let start = self.table_start_row();
            for (col, label) in self.table_header.iter().enumerate() {
                worksheet.write_string_with_format(start as u32, col as u16, label, &bold)?;
            }
            for (offset, cells) in self.rows.iter().enumerate() {
                let row = (start + 1 + offset) as u32;
                for (col, value) in cells.iter().enumerate() {
                    worksheet.write_string(row, col as u16, value)?;
                }
            }

            for (col, width) in self.column_widths.iter().enumerate() {
                worksheet.set_column_width(col as u16, *width as f64)?;
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for cells in &self.header_rows {
            writer.write_record(cells)?;
        }
        writer.write_record([""])?;
        writer.write_record(&self.table_header)?;
        for cells in &self.rows {
            writer.write_record(cells)?;
        }
        writer
            .into_inner()
            .map_err(|err| ExportError::Io(err.into_error()))
    }
}

/// Widest cell per table column across the label and every data row; the
/// header block cells that land in a column count with extra padding.
fn column_widths(header_rows: &[Vec<String>], rows: &[Vec<String>]) -> Vec<usize> {
    TABLE_COLUMNS
        .iter()
        .enumerate()
        .map(|(col, label)| {
            let data = rows
                .iter()
                .filter_map(|cells| cells.get(col))
                .map(|value| text_width(value));
            let header = header_rows
                .iter()
                .filter_map(|cells| cells.get(col))
                .map(|value| text_width(value) + HEADER_PADDING);
            data.chain(header)
                .fold(text_width(label), usize::max)
        })
        .collect()
}
