use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::models::category::{RecordTable, Unit};
use crate::models::filters::RecordFilters;
use crate::models::record::{RawRecord, Record, RecordRow, StoredRecord};

/// Fields of a stored record that changed during an edit.
/// Only these fields are ever compared or written by an update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecordChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(format = "date")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl RecordChanges {
    /// Field-by-field difference between two records bound for the same table
    pub fn between(original: &Record, edited: &Record) -> Self {
        let mut changes = Self::default();

        if original.date() != edited.date() {
            changes.date = Some(edited.date());
        }
        if original.category() != edited.category() {
            changes.category = Some(edited.category().to_string());
        }
        if original.product() != edited.product() {
            changes.product = Some(edited.product().to_string());
        }
        if original.amount() != edited.amount() {
            changes.amount = Some(edited.amount());
        }
        if original.quantity() != edited.quantity() {
            changes.quantity = edited.quantity();
        }
        if original.unit() != edited.unit() {
            changes.unit = edited.unit();
        }

        changes
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.category.is_none()
            && self.product.is_none()
            && self.amount.is_none()
            && self.quantity.is_none()
            && self.unit.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlannedDelete {
    pub table: RecordTable,
    pub id: i64,
}

impl From<&StoredRecord> for PlannedDelete {
    fn from(stored: &StoredRecord) -> Self {
        Self {
            table: stored.record.table(),
            id: stored.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlannedUpdate {
    pub table: RecordTable,
    pub id: i64,
    pub changes: RecordChanges,
}

/// Operations needed to turn a snapshot into the edited buffer.
/// Applied in field order: deletes, then updates, then inserts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReconciliationPlan {
    pub deletes: Vec<PlannedDelete>,
    pub updates: Vec<PlannedUpdate>,
    #[schema(value_type = Vec<RawRecord>)]
    pub inserts: Vec<Record>,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.updates.is_empty() && self.inserts.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.deletes.len() + self.updates.len() + self.inserts.len()
    }
}

/// A row that failed validation, with enough context for the client to point at it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "row": 2,
    "id": 14,
    "context": "product: 'Tomate' | date: 2024-03-02 | category: mercancía",
    "errors": ["quantity is required", "unit is required"]
}))]
pub struct Rejection {
    /// 1-based position of the row in the submitted list
    pub row: usize,
    pub id: Option<i64>,
    pub context: String,
    pub errors: Vec<String>,
}

impl Rejection {
    pub fn new(row: usize, raw: &RawRecord, errors: Vec<String>) -> Self {
        let context = format!(
            "product: '{}' | date: {} | category: {}",
            raw.product.as_deref().unwrap_or("N/A"),
            raw.date.as_deref().unwrap_or("N/A"),
            raw.category.as_deref().unwrap_or("N/A"),
        );

        Self {
            row,
            id: raw.id,
            context,
            errors,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Insert => f.write_str("insert"),
            Operation::Update => f.write_str("update"),
            Operation::Delete => f.write_str("delete"),
        }
    }
}

/// An operation that reached storage successfully
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppliedOperation {
    pub operation: Operation,
    pub table: RecordTable,
    pub id: i64,
}

impl fmt::Display for AppliedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}#{}", self.operation, self.table, self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchSummary {
    pub deleted: usize,
    pub updated: usize,
    pub inserted: usize,
    pub operations: Vec<AppliedOperation>,
}

impl BatchSummary {
    pub fn from_operations(operations: Vec<AppliedOperation>) -> Self {
        let count = |kind: Operation| operations.iter().filter(|op| op.operation == kind).count();

        Self {
            deleted: count(Operation::Delete),
            updated: count(Operation::Update),
            inserted: count(Operation::Insert),
            operations,
        }
    }
}

/// Request payload for previewing the operations an edit would produce
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconcileRequest {
    /// Snapshot as last returned by the query endpoint
    pub original: Vec<RecordRow>,
    /// Edited rows; rows without `id` are new
    pub edited: Vec<RawRecord>,
}

/// Request payload for applying an edit
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmEditsRequest {
    /// Filters that produced the snapshot; used to re-query after applying
    pub filters: RecordFilters,
    pub original: Vec<RecordRow>,
    pub edited: Vec<RawRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmEditsResponse {
    pub summary: BatchSummary,
    /// Fresh snapshot read back from storage
    pub records: Vec<RecordRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn expense(category: &str, amount: &str) -> Record {
        Record::Expense {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            category: category.to_string(),
            product: "Gas".to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            supplier: None,
            description: None,
        }
    }

    #[test]
    fn test_changes_between_identical_records_is_empty() {
        let record = expense("servicios", "80");
        assert!(RecordChanges::between(&record, &record).is_empty());
    }

    #[test]
    fn test_changes_compare_decimals_by_value() {
        let changes =
            RecordChanges::between(&expense("servicios", "80"), &expense("servicios", "80.00"));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_changes_only_carry_modified_fields() {
        let changes =
            RecordChanges::between(&expense("servicios", "80"), &expense("otros", "95.5"));
        assert_eq!(changes.category.as_deref(), Some("otros"));
        assert_eq!(changes.amount, Some(Decimal::from_str("95.5").unwrap()));
        assert!(changes.date.is_none());
        assert!(changes.product.is_none());

        let json = serde_json::to_value(&changes).unwrap();
        assert!(json.get("date").is_none());
    }

    #[test]
    fn test_rejection_context_defaults_missing_fields() {
        let raw = RawRecord {
            product: Some("Pan".to_string()),
            ..RawRecord::default()
        };
        let rejection = Rejection::new(3, &raw, vec!["amount is required".to_string()]);
        assert_eq!(rejection.context, "product: 'Pan' | date: N/A | category: N/A");
        assert_eq!(rejection.row, 3);
    }

    #[test]
    fn test_summary_counts_operations() {
        let summary = BatchSummary::from_operations(vec![
            AppliedOperation {
                operation: Operation::Delete,
                table: RecordTable::Expenses,
                id: 1,
            },
            AppliedOperation {
                operation: Operation::Insert,
                table: RecordTable::Purchases,
                id: 9,
            },
            AppliedOperation {
                operation: Operation::Insert,
                table: RecordTable::Expenses,
                id: 10,
            },
        ]);
        assert_eq!((summary.deleted, summary.updated, summary.inserted), (1, 0, 2));
    }
}
