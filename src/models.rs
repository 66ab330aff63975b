pub mod auth;
pub mod category;
pub mod filters;
pub mod reconciliation;
pub mod record;
pub mod registration;
pub mod report;

pub use auth::{AuthToken, LoginRequest};
pub use category::{CategoryCatalog, RecordTable, Unit, MERCHANDISE, PREDEFINED_CATEGORIES};
pub use filters::{DatePreset, DateRange, RecordFilters, WeightedPriceQuery};
pub use reconciliation::{
    AppliedOperation, BatchSummary, ConfirmEditsRequest, ConfirmEditsResponse, Operation,
    PlannedDelete, PlannedUpdate, ReconcileRequest, ReconciliationPlan, RecordChanges, Rejection,
};
pub use record::{FieldValue, RawRecord, Record, RecordRow, StoredRecord};
pub use registration::{
    AddRegistrationRequest, ConfirmRegistrationsRequest, ConfirmRegistrationsResponse,
    RegistrationList, RemoveRegistrationsRequest,
};
pub use report::{PricePoint, WeightedPriceReport};
