use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::handlers::error_response::{validation_error_response, ErrorResponse};
use crate::models::category::CategoryCatalog;
use crate::models::filters::RecordFilters;
use crate::models::reconciliation::{
    ConfirmEditsRequest, ConfirmEditsResponse, ReconcileRequest, ReconciliationPlan,
};
use crate::models::record::RecordRow;
use crate::services::record_service::{RecordError, RecordService};

/// Convert RecordError to HTTP response
impl IntoResponse for RecordError {
    fn into_response(self) -> Response {
        match self {
            RecordError::Validation(rejections) => ErrorResponse::new(
                "validation_error",
                &format!(
                    "{} record(s) failed validation; nothing was saved. {}",
                    rejections.len(),
                    "Correct the listed rows and confirm again."
                ),
            )
            .with_rejections(rejections)
            .into_response_with(StatusCode::BAD_REQUEST),
            RecordError::EmptyBatch => {
                ErrorResponse::new("empty_batch", "There are no records to save")
                    .into_response_with(StatusCode::BAD_REQUEST)
            }
            RecordError::Reconciliation(msg) | RecordError::InvalidSnapshot(msg) => {
                ErrorResponse::new(
                    "reconciliation_fault",
                    &format!("{}. Reload the records and try again.", msg),
                )
                .into_response_with(StatusCode::CONFLICT)
            }
            RecordError::Persistence(fault) => ErrorResponse::new(
                "persistence_error",
                &format!(
                    "{}. {} operation(s) were already applied and kept. {}",
                    fault,
                    fault.committed.len(),
                    "Contact support if the problem persists."
                ),
            )
            .with_committed(fault.committed)
            .into_response_with(StatusCode::INTERNAL_SERVER_ERROR),
            RecordError::DatabaseError(msg) => ErrorResponse::new("database_error", &msg)
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

/// Handler for listing categories and units
///
/// Returns the predefined categories, the merchandise category and the allowed units.
#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Category catalog", body = CategoryCatalog)
    ),
    tag = "records"
)]
pub async fn categories_handler() -> Json<CategoryCatalog> {
    Json(CategoryCatalog::default())
}

/// Handler for querying records
///
/// Searches the purchases table when the category is merchandise and the expenses
/// table otherwise. Results are sorted by date ascending.
#[utoipa::path(
    get,
    path = "/api/records",
    params(RecordFilters),
    responses(
        (status = 200, description = "Matching records", body = Vec<RecordRow>),
        (status = 400, description = "Invalid filters", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "records"
)]
pub async fn query_records_handler(
    State(record_service): State<Arc<dyn RecordService>>,
    Query(filters): Query<RecordFilters>,
) -> Result<Json<Vec<RecordRow>>, Response> {
    if let Err(validation_errors) = filters.validate() {
        return Err(validation_error_response(&validation_errors));
    }

    match record_service.query_records(&filters).await {
        Ok(records) => Ok(Json(records)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for previewing an edit
///
/// Computes the deletes, updates and inserts that confirming the edited rows would
/// apply. Nothing is written.
#[utoipa::path(
    post,
    path = "/api/records/reconcile",
    request_body = ReconcileRequest,
    responses(
        (status = 200, description = "Planned operations", body = ReconciliationPlan),
        (status = 400, description = "One or more rows failed validation", body = ErrorResponse),
        (status = 409, description = "Edited rows do not match the snapshot", body = ErrorResponse)
    ),
    tag = "records"
)]
pub async fn reconcile_handler(
    State(record_service): State<Arc<dyn RecordService>>,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ReconciliationPlan>, Response> {
    match record_service
        .preview_edits(&request.original, &request.edited)
        .await
    {
        Ok(plan) => Ok(Json(plan)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for confirming an edit
///
/// Applies the edit against the snapshot the client holds and returns the records
/// read back with the same filters.
#[utoipa::path(
    post,
    path = "/api/records/confirm",
    request_body = ConfirmEditsRequest,
    responses(
        (status = 200, description = "Edit applied", body = ConfirmEditsResponse),
        (status = 400, description = "Rows failed validation; nothing was saved",
            body = ErrorResponse),
        (status = 409, description = "Edited rows do not match the snapshot", body = ErrorResponse),
        (status = 500, description = "Storage failed part-way; committed operations are listed",
            body = ErrorResponse)
    ),
    tag = "records"
)]
pub async fn confirm_edits_handler(
    State(record_service): State<Arc<dyn RecordService>>,
    Json(request): Json<ConfirmEditsRequest>,
) -> Result<(StatusCode, Json<ConfirmEditsResponse>), Response> {
    if let Err(validation_errors) = request.filters.validate() {
        return Err(validation_error_response(&validation_errors));
    }

    match record_service
        .confirm_edits(&request.filters, &request.original, &request.edited)
        .await
    {
        Ok(response) => Ok((StatusCode::OK, Json(response))),
        Err(e) => Err(e.into_response()),
    }
}
