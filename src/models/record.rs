use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::models::category::{RecordTable, Unit, MERCHANDISE};
use crate::normalization::{normalize, ValidationError};

/// Numeric form field: clients may send either a JSON number or free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Number(Decimal),
    Text(String),
}

impl FieldValue {
    /// True for empty or whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Number(_) => false,
            FieldValue::Text(text) => text.trim().is_empty(),
        }
    }

    /// Parse to a decimal, accepting plain and scientific notation
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::Text(text) => {
                let text = text.trim();
                Decimal::from_str(text)
                    .or_else(|_| Decimal::from_scientific(text))
                    .ok()
            }
        }
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Number(value)
    }
}

/// Record as submitted by a client form or edited table row.
///
/// Every field is optional so that validation can report all missing fields at
/// once. Fields not listed here are ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
#[schema(example = json!({
    "date": "2024-03-02",
    "category": "Mercancía",
    "product": "Tomate",
    "amount": 120.50,
    "quantity": 12.5,
    "unit": "kg",
    "supplier": "Central de abastos"
}))]
pub struct RawRecord {
    /// Present for rows read from storage, absent for new rows
    pub id: Option<i64>,
    pub date: Option<String>,
    pub category: Option<String>,
    pub product: Option<String>,
    pub amount: Option<FieldValue>,
    pub quantity: Option<FieldValue>,
    pub unit: Option<String>,
    pub supplier: Option<String>,
    pub description: Option<String>,
}

/// A validated purchase or expense line.
///
/// Serialized in the flat `RawRecord` shape; deserializing validates and normalizes,
/// so a pending list sent back by a client can never hold an invalid record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawRecord", try_from = "RawRecord")]
pub enum Record {
    /// Merchandise purchase; always stored in the purchases table
    Merchandise {
        date: NaiveDate,
        product: String,
        amount: Decimal,
        quantity: Decimal,
        unit: Unit,
        supplier: Option<String>,
        description: Option<String>,
    },
    /// Any other category; stored in the expenses table
    Expense {
        date: NaiveDate,
        category: String,
        product: String,
        amount: Decimal,
        supplier: Option<String>,
        description: Option<String>,
    },
}

impl Record {
    pub fn date(&self) -> NaiveDate {
        match self {
            Record::Merchandise { date, .. } | Record::Expense { date, .. } => *date,
        }
    }

    pub fn category(&self) -> &str {
        match self {
            Record::Merchandise { .. } => MERCHANDISE,
            Record::Expense { category, .. } => category,
        }
    }

    pub fn product(&self) -> &str {
        match self {
            Record::Merchandise { product, .. } | Record::Expense { product, .. } => product,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            Record::Merchandise { amount, .. } | Record::Expense { amount, .. } => *amount,
        }
    }

    pub fn quantity(&self) -> Option<Decimal> {
        match self {
            Record::Merchandise { quantity, .. } => Some(*quantity),
            Record::Expense { .. } => None,
        }
    }

    pub fn unit(&self) -> Option<Unit> {
        match self {
            Record::Merchandise { unit, .. } => Some(*unit),
            Record::Expense { .. } => None,
        }
    }

    pub fn supplier(&self) -> Option<&str> {
        match self {
            Record::Merchandise { supplier, .. } | Record::Expense { supplier, .. } => {
                supplier.as_deref()
            }
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Record::Merchandise { description, .. } | Record::Expense { description, .. } => {
                description.as_deref()
            }
        }
    }

    pub fn table(&self) -> RecordTable {
        match self {
            Record::Merchandise { .. } => RecordTable::Purchases,
            Record::Expense { .. } => RecordTable::Expenses,
        }
    }
}

impl TryFrom<RawRecord> for Record {
    type Error = ValidationError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        normalize(&raw)
    }
}

impl From<Record> for RawRecord {
    fn from(record: Record) -> Self {
        RawRecord::from(&record)
    }
}

impl From<&Record> for RawRecord {
    fn from(record: &Record) -> Self {
        RawRecord {
            id: None,
            date: Some(record.date().format("%Y-%m-%d").to_string()),
            category: Some(record.category().to_string()),
            product: Some(record.product().to_string()),
            amount: Some(record.amount().into()),
            quantity: record.quantity().map(FieldValue::from),
            unit: record.unit().map(|unit| unit.as_str().to_string()),
            supplier: record.supplier().map(str::to_string),
            description: record.description().map(str::to_string),
        }
    }
}

/// Flat storage row, shared by both tables. Expense rows have no quantity or unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[schema(example = json!({
    "id": 42,
    "date": "2024-03-02",
    "category": "mercancía",
    "product": "Tomate",
    "quantity": "12.500",
    "unit": "kg",
    "amount": "120.50",
    "supplier": "Central de abastos",
    "description": null,
    "created_at": "2024-03-02T18:30:00Z"
}))]
pub struct RecordRow {
    pub id: i64,
    #[schema(format = "date", example = "2024-03-02")]
    pub date: NaiveDate,
    pub category: String,
    pub product: String,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub amount: Decimal,
    pub supplier: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&RecordRow> for RawRecord {
    fn from(row: &RecordRow) -> Self {
        RawRecord {
            id: Some(row.id),
            date: Some(row.date.format("%Y-%m-%d").to_string()),
            category: Some(row.category.clone()),
            product: Some(row.product.clone()),
            amount: Some(row.amount.into()),
            quantity: row.quantity.map(FieldValue::from),
            unit: row.unit.clone(),
            supplier: row.supplier.clone(),
            description: row.description.clone(),
        }
    }
}

/// Typed view of a persisted row
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: i64,
    pub record: Record,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<&RecordRow> for StoredRecord {
    type Error = ValidationError;

    fn try_from(row: &RecordRow) -> Result<Self, Self::Error> {
        Ok(StoredRecord {
            id: row.id,
            record: normalize(&RawRecord::from(row))?,
            created_at: row.created_at,
        })
    }
}

impl From<&StoredRecord> for RecordRow {
    fn from(stored: &StoredRecord) -> Self {
        let record = &stored.record;
        RecordRow {
            id: stored.id,
            date: record.date(),
            category: record.category().to_string(),
            product: record.product().to_string(),
            quantity: record.quantity(),
            unit: record.unit().map(|unit| unit.as_str().to_string()),
            amount: record.amount(),
            supplier: record.supplier().map(str::to_string),
            description: record.description().map(str::to_string),
            created_at: stored.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tomato_row() -> RecordRow {
        RecordRow {
            id: 7,
            date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            category: "mercancía".to_string(),
            product: "Tomate".to_string(),
            quantity: Some(Decimal::from_str("12.500").unwrap()),
            unit: Some("kg".to_string()),
            amount: Decimal::from_str("120.50").unwrap(),
            supplier: None,
            description: None,
            created_at: None,
        }
    }

    #[test]
    fn test_field_value_accepts_numbers_and_text() {
        let number: FieldValue = serde_json::from_str("12.5").unwrap();
        assert_eq!(number.to_decimal(), Some(Decimal::from_str("12.5").unwrap()));

        let text: FieldValue = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(text, FieldValue::Text("abc".to_string()));
        assert_eq!(text.to_decimal(), None);

        let blank: FieldValue = serde_json::from_str("\"  \"").unwrap();
        assert!(blank.is_blank());
    }

    #[test]
    fn test_raw_record_ignores_unknown_fields() {
        let raw: RawRecord = serde_json::from_str(
            r#"{"id": 3, "product": "Gas", "created_at": "2024-01-01T00:00:00Z", "extra": true}"#,
        )
        .unwrap();
        assert_eq!(raw.id, Some(3));
        assert_eq!(raw.product.as_deref(), Some("Gas"));
        assert!(raw.amount.is_none());
    }

    #[test]
    fn test_stored_record_from_purchase_row() {
        let stored = StoredRecord::try_from(&tomato_row()).unwrap();
        assert_eq!(stored.id, 7);
        assert_eq!(stored.record.table(), RecordTable::Purchases);
        assert_eq!(stored.record.unit(), Some(Unit::Kg));

        let row = RecordRow::from(&stored);
        assert_eq!(row, tomato_row());
    }

    #[test]
    fn test_stored_record_rejects_incomplete_purchase_row() {
        let mut row = tomato_row();
        row.quantity = None;
        assert!(StoredRecord::try_from(&row).is_err());
    }

    #[test]
    fn test_record_serializes_flat_with_category() {
        let stored = StoredRecord::try_from(&tomato_row()).unwrap();
        let json = serde_json::to_value(&stored.record).unwrap();
        assert_eq!(json["category"], "mercancía");
        assert_eq!(json["unit"], "kg");

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, stored.record);
    }

    #[test]
    fn test_record_deserialization_validates() {
        let result: Result<Record, _> = serde_json::from_value(serde_json::json!({
            "date": "2024-03-02",
            "category": "mercancía",
            "product": "Tomate",
            "amount": 10
        }));
        assert!(result.unwrap_err().to_string().contains("quantity is required"));
    }
}
