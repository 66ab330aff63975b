use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::models::reconciliation::{AppliedOperation, Rejection};

/// Error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "validation_error",
    "message": "1 record(s) failed validation; nothing was saved. Correct the listed rows.",
    "rejections": [{
        "row": 2,
        "id": 14,
        "context": "product: 'Tomate' | date: 2024-03-02 | category: mercancía",
        "errors": ["quantity is required"]
    }]
}))]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Rows that failed validation, one entry per row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejections: Option<Vec<Rejection>>,
    /// Operations that reached storage before a persistence failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed: Option<Vec<AppliedOperation>>,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            rejections: None,
            committed: None,
        }
    }

    pub fn with_rejections(mut self, rejections: Vec<Rejection>) -> Self {
        self.rejections = Some(rejections);
        self
    }

    pub fn with_committed(mut self, committed: Vec<AppliedOperation>) -> Self {
        self.committed = Some(committed);
        self
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Flatten validator errors into a single `field: message` line per field
pub fn validation_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            if *field == "__all__" {
                messages.join(", ")
            } else {
                format!("{}: {}", field, messages.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// 400 response for a request that failed `validator` checks
pub fn validation_error_response(errors: &ValidationErrors) -> Response {
    ErrorResponse::new("validation_error", &validation_message(errors))
        .into_response_with(StatusCode::BAD_REQUEST)
}
