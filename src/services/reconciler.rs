use std::collections::{HashMap, HashSet};

use crate::models::reconciliation::{
    PlannedDelete, PlannedUpdate, ReconciliationPlan, RecordChanges, Rejection,
};
use crate::models::record::{RawRecord, Record, StoredRecord};
use crate::normalization::normalize;

/// Reasons a reconciliation produces no plan
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    /// At least one row failed validation; nothing in the batch may be applied
    #[error("{} record(s) failed validation", .0.len())]
    Rejected(Vec<Rejection>),

    /// The edit buffer does not correspond to the snapshot it claims to edit
    #[error("Reconciliation fault: {0}")]
    Fault(String),
}

/// Compute the operations that turn `original` into `edited`.
///
/// Rows with an id must refer to a row of the snapshot; rows without one are
/// inserts. Snapshot rows missing from the buffer are deleted. Rows that stay in
/// the same table produce an update carrying only the changed fields, while a
/// category change across tables becomes a delete plus an insert.
pub fn reconcile(
    original: &[StoredRecord],
    edited: &[RawRecord],
) -> Result<ReconciliationPlan, ReconcileError> {
    // A wiped buffer removes the whole snapshot
    if edited.is_empty() {
        return Ok(ReconciliationPlan {
            deletes: original.iter().map(PlannedDelete::from).collect(),
            ..ReconciliationPlan::default()
        });
    }

    let originals: HashMap<i64, &StoredRecord> =
        original.iter().map(|stored| (stored.id, stored)).collect();

    let mut kept_ids = HashSet::new();
    let mut rejections = Vec::new();
    let mut normalized: Vec<(Option<&StoredRecord>, Record)> = Vec::with_capacity(edited.len());

    for (index, row) in edited.iter().enumerate() {
        let counterpart = match row.id {
            Some(id) => {
                let Some(stored) = originals.get(&id) else {
                    return Err(ReconcileError::Fault(format!(
                        "record {} is not part of the original snapshot",
                        id
                    )));
                };
                if !kept_ids.insert(id) {
                    return Err(ReconcileError::Fault(format!(
                        "record {} appears more than once in the edited rows",
                        id
                    )));
                }
                Some(*stored)
            }
            None => None,
        };

        match normalize(row) {
            Ok(record) => normalized.push((counterpart, record)),
            Err(err) => rejections.push(Rejection::new(index + 1, row, err.messages)),
        }
    }

    if !rejections.is_empty() {
        return Err(ReconcileError::Rejected(rejections));
    }

    let mut plan = ReconciliationPlan {
        deletes: original
            .iter()
            .filter(|stored| !kept_ids.contains(&stored.id))
            .map(PlannedDelete::from)
            .collect(),
        ..ReconciliationPlan::default()
    };

    for (counterpart, record) in normalized {
        match counterpart {
            None => plan.inserts.push(record),
            Some(stored) if stored.record.table() != record.table() => {
                plan.deletes.push(PlannedDelete::from(stored));
                plan.inserts.push(record);
            }
            Some(stored) => {
                let changes = RecordChanges::between(&stored.record, &record);
                if !changes.is_empty() {
                    plan.updates.push(PlannedUpdate {
                        table: record.table(),
                        id: stored.id,
                        changes,
                    });
                }
            }
        }
    }

    Ok(plan)
}
