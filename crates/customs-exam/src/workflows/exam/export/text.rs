use crate::workflows::exam::domain::{ExamSession, ProductLine};
use crate::workflows::exam::stepper::EMPTY_PRODUCTS_MESSAGE;

const MISSING: &str = "N/A";

fn or_missing(value: Option<&String>) -> &str {
    value
        .map(String::as_str)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(MISSING)
}

fn field_or_missing(value: &str) -> &str {
    if value.trim().is_empty() {
        MISSING
    } else {
        value
    }
}

/// Plain-text report: header block, then one block per product line.
/// Output depends only on its inputs.
pub fn render_text(session: &ExamSession, products: &[ProductLine]) -> String {
    let header = &session.header;
    let mut lines = vec![
        "EXAMEN PREVIO".to_string(),
        "=============".to_string(),
        format!(
            "Número de seguimiento (NE): {}",
            header.tracking_number.to_uppercase()
        ),
        format!("Referencia: {}", or_missing(header.reference.as_ref())),
        format!("Gestor: {}", field_or_missing(&header.manager)),
        format!("Ubicación: {}", field_or_missing(&header.location)),
        format!("Consignatario: {}", or_missing(header.consignee.as_ref())),
        format!("Total de productos: {}", products.len()),
    ];

    if products.is_empty() {
        lines.push(String::new());
        lines.push(EMPTY_PRODUCTS_MESSAGE.to_string());
    }

    for (index, product) in products.iter().enumerate() {
        let details = &product.details;
        lines.push(String::new());
        lines.push(format!("--- Producto {} ---", index + 1));
        lines.push(format!("Item: {}", or_missing(details.item_number.as_ref())));
        lines.push(format!(
            "Descripción: {}",
            or_missing(details.description.as_ref())
        ));
        lines.push(format!("Marca: {}", or_missing(details.brand.as_ref())));
        lines.push(format!("Modelo: {}", or_missing(details.model.as_ref())));
        lines.push(format!("Serie: {}", or_missing(details.serial.as_ref())));
        lines.push(format!("Origen: {}", or_missing(details.origin.as_ref())));
        lines.push(format!("Peso: {}", or_missing(details.weight.as_ref())));
        lines.push(format!(
            "Unidad de Medida: {}",
            or_missing(details.unit_measure.as_ref())
        ));
        lines.push(format!(
            "Número de Bultos: {}",
            or_missing(details.number_packages.as_ref())
        ));
        lines.push(format!(
            "Cantidad de Bultos: {}",
            details.quantity_packages
        ));
        lines.push(format!("Cantidad de Unidades: {}", details.quantity_units));
        lines.push(format!("Estado: {}", details.status_summary()));
        lines.push(format!(
            "Observación: {}",
            or_missing(details.observation.as_ref())
        ));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}
