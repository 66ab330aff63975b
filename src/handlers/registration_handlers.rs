use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::handlers::error_response::ErrorResponse;
use crate::models::reconciliation::Rejection;
use crate::models::registration::{
    AddRegistrationRequest, ConfirmRegistrationsRequest, ConfirmRegistrationsResponse,
    RegistrationList, RemoveRegistrationsRequest,
};
use crate::services::record_service::{RecordError, RecordService};

/// Handler for adding a form submission to the pending list
///
/// Validates the submitted record and returns the pending list with the normalized
/// record appended. Nothing is persisted.
#[utoipa::path(
    post,
    path = "/api/registrations",
    request_body = AddRegistrationRequest,
    responses(
        (status = 200, description = "Updated pending list", body = RegistrationList),
        (status = 400, description = "The record failed validation", body = ErrorResponse)
    ),
    tag = "registrations"
)]
pub async fn add_registration_handler(
    Json(request): Json<AddRegistrationRequest>,
) -> Result<Json<RegistrationList>, Response> {
    let mut list = RegistrationList::new(request.pending);
    let row = list.len() + 1;

    match list.add(&request.record) {
        Ok(record) => {
            tracing::debug!(
                product = %record.product(),
                table = %record.table(),
                "Registration added"
            );
        }
        Err(err) => {
            let rejection = Rejection::new(row, &request.record, err.messages);
            return Err(RecordError::Validation(vec![rejection]).into_response());
        }
    }

    Ok(Json(list))
}

/// Handler for removing pending records
///
/// Drops the records at the given positions; positions outside the list are ignored.
#[utoipa::path(
    post,
    path = "/api/registrations/remove",
    request_body = RemoveRegistrationsRequest,
    responses(
        (status = 200, description = "Updated pending list", body = RegistrationList)
    ),
    tag = "registrations"
)]
pub async fn remove_registrations_handler(
    Json(request): Json<RemoveRegistrationsRequest>,
) -> Json<RegistrationList> {
    let mut list = RegistrationList::new(request.pending);
    let removed = list.remove(&request.indices);
    tracing::debug!(removed, remaining = list.len(), "Registrations removed");
    Json(list)
}

/// Handler for saving the pending list
///
/// Validates every pending record (they may have been edited since they were added)
/// and inserts them. Any invalid record rejects the whole batch.
#[utoipa::path(
    post,
    path = "/api/registrations/confirm",
    request_body = ConfirmRegistrationsRequest,
    responses(
        (status = 201, description = "Records saved", body = ConfirmRegistrationsResponse),
        (status = 400, description = "Empty list or a record failed validation",
            body = ErrorResponse),
        (status = 500, description = "Storage failed part-way; committed operations are listed",
            body = ErrorResponse)
    ),
    tag = "registrations"
)]
pub async fn confirm_registrations_handler(
    State(record_service): State<Arc<dyn RecordService>>,
    Json(request): Json<ConfirmRegistrationsRequest>,
) -> Result<(StatusCode, Json<ConfirmRegistrationsResponse>), Response> {
    match record_service.confirm_registrations(&request.pending).await {
        Ok(response) => Ok((StatusCode::CREATED, Json(response))),
        Err(e) => Err(e.into_response()),
    }
}
