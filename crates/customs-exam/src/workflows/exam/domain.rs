use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;
use std::fmt;

use super::error::{FieldError, ValidationErrors};

pub(crate) const FIELD_TRACKING_NUMBER: &str = "trackingNumber";
pub(crate) const FIELD_MANAGER: &str = "manager";
pub(crate) const FIELD_LOCATION: &str = "location";

/// Case-normalized tracking number (NE) used as the storage key for an exam.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TrackingKey(String);

impl TrackingKey {
    /// Uppercases the raw input. Blank input never reaches the store.
    pub fn parse(raw: &str) -> Result<Self, ValidationErrors> {
        if raw.trim().is_empty() {
            return Err(ValidationErrors::single(FieldError::required(
                FIELD_TRACKING_NUMBER,
            )));
        }
        Ok(Self(raw.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated staff identity attached to saved records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Header fields captured on the initial info screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExamHeader {
    pub tracking_number: String,
    pub reference: Option<String>,
    pub manager: String,
    pub location: String,
    pub consignee: Option<String>,
}

impl ExamHeader {
    /// Checks every required field and reports all missing ones at once.
    pub fn validate(&self) -> Result<TrackingKey, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for (field, value) in [
            (FIELD_TRACKING_NUMBER, &self.tracking_number),
            (FIELD_MANAGER, &self.manager),
            (FIELD_LOCATION, &self.location),
        ] {
            if value.trim().is_empty() {
                errors.push(FieldError::required(field));
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        TrackingKey::parse(&self.tracking_number)
    }

    pub fn is_blank(&self) -> bool {
        self == &Self::default()
    }
}

/// In-progress exam header plus the recovery marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSession {
    #[serde(flatten)]
    pub header: ExamHeader,
    #[serde(default)]
    pub is_recovered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quantity as entered on the form: usually numeric, sometimes free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(Number),
    Text(String),
}

impl Default for Quantity {
    fn default() -> Self {
        Self::Number(Number::from(0))
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Number(number) => write!(f, "{number}"),
            Quantity::Text(text) => f.write_str(text),
        }
    }
}

fn quantity_or_default<'de, D>(deserializer: D) -> Result<Quantity, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Quantity>::deserialize(deserializer)?.unwrap_or_default())
}

fn flag_or_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Inspection outcome for a product line, ordered by display precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Conform,
    Excess,
    Missing,
    Fault,
    #[serde(rename = "none")]
    NoStatus,
}

impl ProductStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Conform,
            Self::Excess,
            Self::Missing,
            Self::Fault,
            Self::NoStatus,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Conform => "Conforme a factura",
            Self::Excess => "Excedente",
            Self::Missing => "Faltante",
            Self::Fault => "Avería",
            Self::NoStatus => "Sin estado",
        }
    }
}

/// Editable fields of a line item. Every descriptive field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    #[serde(default)]
    pub item_number: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub unit_measure: Option<String>,
    #[serde(default)]
    pub number_packages: Option<String>,
    #[serde(default)]
    pub observation: Option<String>,
    #[serde(default, deserialize_with = "quantity_or_default")]
    pub quantity_packages: Quantity,
    #[serde(default, deserialize_with = "quantity_or_default")]
    pub quantity_units: Quantity,
    #[serde(default, deserialize_with = "flag_or_false")]
    pub is_conform: bool,
    #[serde(default, deserialize_with = "flag_or_false")]
    pub is_excess: bool,
    #[serde(default, deserialize_with = "flag_or_false")]
    pub is_missing: bool,
    #[serde(default, deserialize_with = "flag_or_false")]
    pub is_fault: bool,
}

impl ProductDetails {
    fn flag(&self, status: ProductStatus) -> bool {
        match status {
            ProductStatus::Conform => self.is_conform,
            ProductStatus::Excess => self.is_excess,
            ProductStatus::Missing => self.is_missing,
            ProductStatus::Fault => self.is_fault,
            ProductStatus::NoStatus => false,
        }
    }

    /// Every set flag, in precedence order. Flags are not mutually exclusive.
    pub fn active_statuses(&self) -> Vec<ProductStatus> {
        ProductStatus::ordered()
            .into_iter()
            .filter(|status| self.flag(*status))
            .collect()
    }

    /// First set flag by precedence, used for single-label displays.
    pub fn primary_status(&self) -> ProductStatus {
        self.active_statuses()
            .into_iter()
            .next()
            .unwrap_or(ProductStatus::NoStatus)
    }

    pub fn status_summary(&self) -> String {
        let labels: Vec<&str> = self
            .active_statuses()
            .into_iter()
            .map(ProductStatus::label)
            .collect();
        if labels.is_empty() {
            ProductStatus::NoStatus.label().to_string()
        } else {
            labels.join(", ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLine {
    pub id: ProductId,
    #[serde(flatten)]
    pub details: ProductDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    Incomplete,
    Complete,
}

impl ExamStatus {
    pub const fn ordered() -> [Self; 2] {
        [Self::Incomplete, Self::Complete]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Incomplete => "Incompleto",
            Self::Complete => "Completo",
        }
    }
}

fn products_or_empty<'de, D>(deserializer: D) -> Result<Vec<ProductLine>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ProductLine>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Persisted form of an exam, keyed by its uppercased tracking number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
    #[serde(flatten)]
    pub header: ExamHeader,
    #[serde(default)]
    pub is_recovered: bool,
    #[serde(default, deserialize_with = "products_or_empty")]
    pub products: Vec<ProductLine>,
    pub saved_by: String,
    pub status: ExamStatus,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExamRecord {
    pub fn from_session(
        session: &ExamSession,
        key: &TrackingKey,
        products: Vec<ProductLine>,
        saved_by: &Identity,
        status: ExamStatus,
    ) -> Self {
        let mut header = session.header.clone();
        header.tracking_number = key.as_str().to_string();
        Self {
            header,
            is_recovered: session.is_recovered,
            products,
            saved_by: saved_by.as_str().to_string(),
            status,
            saved_at: None,
            last_updated: None,
            completed_at: None,
        }
    }

    pub fn tracking_key(&self) -> Result<TrackingKey, ValidationErrors> {
        TrackingKey::parse(&self.header.tracking_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_key_uppercases_without_trimming_inner_text() {
        let key = TrackingKey::parse("ne-2024-001").expect("valid key");
        assert_eq!(key.as_str(), "NE-2024-001");
    }

    #[test]
    fn tracking_key_rejects_whitespace_only() {
        let errors = TrackingKey::parse("   ").expect_err("blank rejected");
        assert_eq!(errors.fields()[0].field, FIELD_TRACKING_NUMBER);
    }

    #[test]
    fn header_validation_reports_every_missing_field() {
        let header = ExamHeader {
            tracking_number: String::new(),
            reference: None,
            manager: " ".to_string(),
            location: "Bodega 3".to_string(),
            consignee: None,
        };
        let errors = header.validate().expect_err("missing fields");
        let fields: Vec<&str> = errors.fields().iter().map(|error| error.field).collect();
        assert_eq!(fields, vec![FIELD_TRACKING_NUMBER, FIELD_MANAGER]);
    }

    #[test]
    fn primary_status_follows_precedence() {
        let details = ProductDetails {
            is_fault: true,
            is_excess: true,
            ..ProductDetails::default()
        };
        assert_eq!(details.primary_status(), ProductStatus::Excess);
        assert_eq!(details.status_summary(), "Excedente, Avería");
        assert_eq!(
            ProductDetails::default().primary_status(),
            ProductStatus::NoStatus
        );
    }

    #[test]
    fn quantities_accept_numbers_text_and_null() {
        let details: ProductDetails = serde_json::from_value(serde_json::json!({
            "quantityPackages": "3 cajas",
            "quantityUnits": null,
        }))
        .expect("details parse");
        assert_eq!(details.quantity_packages, Quantity::Text("3 cajas".to_string()));
        assert_eq!(details.quantity_units, Quantity::default());
        assert_eq!(Quantity::from(5).to_string(), "5");
    }
}
