use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::reconciliation::{BatchSummary, Rejection};
use crate::models::record::{RawRecord, Record, RecordRow};
use crate::normalization::{normalize, ValidationError};

/// Records entered through the form but not yet persisted.
///
/// Each record is validated when added; the list is discarded by the client once
/// a confirm succeeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RegistrationList {
    #[schema(value_type = Vec<RawRecord>)]
    pub pending: Vec<Record>,
}

impl RegistrationList {
    pub fn new(pending: Vec<Record>) -> Self {
        Self { pending }
    }

    /// Validate every raw row, collecting a rejection for each invalid one
    pub fn from_raw(rows: &[RawRecord]) -> Result<Self, Vec<Rejection>> {
        let mut pending = Vec::with_capacity(rows.len());
        let mut rejections = Vec::new();

        for (index, raw) in rows.iter().enumerate() {
            match normalize(raw) {
                Ok(record) => pending.push(record),
                Err(err) => rejections.push(Rejection::new(index + 1, raw, err.messages)),
            }
        }

        if rejections.is_empty() {
            Ok(Self { pending })
        } else {
            Err(rejections)
        }
    }

    /// Normalize and append one record
    pub fn add(&mut self, raw: &RawRecord) -> Result<&Record, ValidationError> {
        let record = normalize(raw)?;
        self.pending.push(record);
        Ok(&self.pending[self.pending.len() - 1])
    }

    /// Drop the records at the given positions; out-of-range indices are ignored.
    /// Returns how many records were removed.
    pub fn remove(&mut self, indices: &[usize]) -> usize {
        let before = self.pending.len();
        let mut index = 0;
        self.pending.retain(|_| {
            let keep = !indices.contains(&index);
            index += 1;
            keep
        });
        before - self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Request payload for adding a form submission to the pending list
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddRegistrationRequest {
    #[serde(default)]
    #[schema(value_type = Vec<RawRecord>)]
    pub pending: Vec<Record>,
    pub record: RawRecord,
}

/// Request payload for removing pending records by position
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RemoveRegistrationsRequest {
    #[schema(value_type = Vec<RawRecord>)]
    pub pending: Vec<Record>,
    pub indices: Vec<usize>,
}

/// Request payload for persisting the pending list; rows may have been edited
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmRegistrationsRequest {
    pub pending: Vec<RawRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmRegistrationsResponse {
    pub summary: BatchSummary,
    pub records: Vec<RecordRow>,
}
