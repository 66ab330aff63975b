use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::models::category::RecordTable;
use crate::models::filters::RecordFilters;
use crate::models::reconciliation::{
    AppliedOperation, BatchSummary, ConfirmEditsResponse, Operation, ReconciliationPlan,
    Rejection,
};
use crate::models::record::{RawRecord, RecordRow, StoredRecord};
use crate::models::registration::{ConfirmRegistrationsResponse, RegistrationList};
use crate::repositories::record_repository::{RecordRepository, RepositoryError};
use crate::services::reconciler::{reconcile, ReconcileError};

/// The operation that failed part-way through a batch, with everything already committed
#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceFault {
    pub operation: Operation,
    pub table: RecordTable,
    /// Row id for updates and deletes; inserts have none yet
    pub id: Option<i64>,
    pub message: String,
    pub committed: Vec<AppliedOperation>,
}

impl fmt::Display for PersistenceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(
                f,
                "{} failed on {} id {}: {}",
                self.operation, self.table, id, self.message
            ),
            None => write!(f, "{} failed on {}: {}", self.operation, self.table, self.message),
        }
    }
}

/// Record service errors
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("{} record(s) failed validation", .0.len())]
    Validation(Vec<Rejection>),

    #[error("There are no records to save")]
    EmptyBatch,

    #[error("Reconciliation fault: {0}")]
    Reconciliation(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Persistence error: {0}")]
    Persistence(PersistenceFault),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<ReconcileError> for RecordError {
    fn from(error: ReconcileError) -> Self {
        match error {
            ReconcileError::Rejected(rejections) => RecordError::Validation(rejections),
            ReconcileError::Fault(message) => RecordError::Reconciliation(message),
        }
    }
}

fn map_repository_error(error: RepositoryError) -> RecordError {
    match error {
        RepositoryError::NotFound => RecordError::DatabaseError("record not found".to_string()),
        RepositoryError::DatabaseError(msg) => RecordError::DatabaseError(msg),
        RepositoryError::ConstraintViolation(msg) => RecordError::DatabaseError(msg),
    }
}

/// Log a failed batch together with everything it already committed
fn persistence_fault(
    operation: Operation,
    table: RecordTable,
    id: Option<i64>,
    error: RepositoryError,
    committed: &[AppliedOperation],
) -> RecordError {
    let fault = PersistenceFault {
        operation,
        table,
        id,
        message: error.to_string(),
        committed: committed.to_vec(),
    };
    tracing::error!(
        fault = %fault,
        committed = ?committed.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "Batch stopped; committed operations were not rolled back"
    );
    RecordError::Persistence(fault)
}

/// Trait defining record service operations
#[async_trait]
pub trait RecordService: Send + Sync {
    /// Query one table with the given filters, sorted by date ascending
    async fn query_records(&self, filters: &RecordFilters) -> Result<Vec<RecordRow>, RecordError>;

    /// Compute the operations an edit would apply, without touching storage
    async fn preview_edits(
        &self,
        original: &[RecordRow],
        edited: &[RawRecord],
    ) -> Result<ReconciliationPlan, RecordError>;

    /// Apply an edit and return the re-queried snapshot
    async fn confirm_edits(
        &self,
        filters: &RecordFilters,
        original: &[RecordRow],
        edited: &[RawRecord],
    ) -> Result<ConfirmEditsResponse, RecordError>;

    /// Persist every pending registration
    async fn confirm_registrations(
        &self,
        pending: &[RawRecord],
    ) -> Result<ConfirmRegistrationsResponse, RecordError>;
}

/// Implementation of RecordService
pub struct RecordServiceImpl {
    repository: Arc<dyn RecordRepository>,
}

impl RecordServiceImpl {
    pub fn new(repository: Arc<dyn RecordRepository>) -> Self {
        Self { repository }
    }

    fn snapshot(original: &[RecordRow]) -> Result<Vec<StoredRecord>, RecordError> {
        original
            .iter()
            .map(|row| {
                StoredRecord::try_from(row).map_err(|err| {
                    RecordError::InvalidSnapshot(format!("row {}: {}", row.id, err))
                })
            })
            .collect()
    }

    /// Apply deletes, then updates, then inserts. Stops at the first failure;
    /// operations already applied stay committed.
    async fn apply_plan(
        &self,
        plan: ReconciliationPlan,
    ) -> Result<(Vec<AppliedOperation>, Vec<RecordRow>), RecordError> {
        let mut committed = Vec::with_capacity(plan.operation_count());
        let mut inserted = Vec::with_capacity(plan.inserts.len());

        for delete in plan.deletes {
            if let Err(error) = self.repository.delete(delete.table, delete.id).await {
                return Err(persistence_fault(
                    Operation::Delete,
                    delete.table,
                    Some(delete.id),
                    error,
                    &committed,
                ));
            }
            tracing::info!(table = %delete.table, id = delete.id, "Deleted record");
            committed.push(AppliedOperation {
                operation: Operation::Delete,
                table: delete.table,
                id: delete.id,
            });
        }

        for update in plan.updates {
            if let Err(error) = self
                .repository
                .update(update.table, update.id, &update.changes)
                .await
            {
                return Err(persistence_fault(
                    Operation::Update,
                    update.table,
                    Some(update.id),
                    error,
                    &committed,
                ));
            }
            tracing::info!(table = %update.table, id = update.id, "Updated record");
            committed.push(AppliedOperation {
                operation: Operation::Update,
                table: update.table,
                id: update.id,
            });
        }

        for record in plan.inserts {
            let table = record.table();
            match self.repository.insert(table, &record).await {
                Ok(row) => {
                    tracing::info!(
                        table = %table,
                        id = row.id,
                        product = %row.product,
                        "Inserted record"
                    );
                    committed.push(AppliedOperation {
                        operation: Operation::Insert,
                        table,
                        id: row.id,
                    });
                    inserted.push(row);
                }
                Err(error) => {
                    return Err(persistence_fault(
                        Operation::Insert,
                        table,
                        None,
                        error,
                        &committed,
                    ));
                }
            }
        }

        Ok((committed, inserted))
    }
}

#[async_trait]
impl RecordService for RecordServiceImpl {
    async fn query_records(&self, filters: &RecordFilters) -> Result<Vec<RecordRow>, RecordError> {
        self.repository
            .find(filters)
            .await
            .map_err(map_repository_error)
    }

    async fn preview_edits(
        &self,
        original: &[RecordRow],
        edited: &[RawRecord],
    ) -> Result<ReconciliationPlan, RecordError> {
        let snapshot = Self::snapshot(original)?;
        Ok(reconcile(&snapshot, edited)?)
    }

    async fn confirm_edits(
        &self,
        filters: &RecordFilters,
        original: &[RecordRow],
        edited: &[RawRecord],
    ) -> Result<ConfirmEditsResponse, RecordError> {
        let snapshot = Self::snapshot(original)?;

        let plan = reconcile(&snapshot, edited).map_err(|err| {
            if let ReconcileError::Rejected(rejections) = &err {
                tracing::warn!(rejected = rejections.len(), "Edit batch rejected by validation");
            }
            RecordError::from(err)
        })?;

        let (operations, _) = self.apply_plan(plan).await?;
        let summary = BatchSummary::from_operations(operations);
        tracing::info!(
            deleted = summary.deleted,
            updated = summary.updated,
            inserted = summary.inserted,
            "Edit batch applied"
        );

        let records = self.query_records(filters).await?;

        Ok(ConfirmEditsResponse { summary, records })
    }

    async fn confirm_registrations(
        &self,
        pending: &[RawRecord],
    ) -> Result<ConfirmRegistrationsResponse, RecordError> {
        if pending.is_empty() {
            return Err(RecordError::EmptyBatch);
        }

        let list = RegistrationList::from_raw(pending).map_err(|rejections| {
            tracing::warn!(
                rejected = rejections.len(),
                "Registration batch rejected by validation"
            );
            RecordError::Validation(rejections)
        })?;

        let plan = ReconciliationPlan {
            inserts: list.pending,
            ..ReconciliationPlan::default()
        };

        let (operations, records) = self.apply_plan(plan).await?;
        let summary = BatchSummary::from_operations(operations);
        tracing::info!(inserted = summary.inserted, "Registrations saved");

        Ok(ConfirmRegistrationsResponse { summary, records })
    }
}
