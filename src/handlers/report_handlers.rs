use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use std::sync::Arc;
use validator::Validate;

use crate::handlers::error_response::{validation_error_response, ErrorResponse};
use crate::models::filters::WeightedPriceQuery;
use crate::models::report::WeightedPriceReport;
use crate::services::report_service::{ReportError, ReportService};

/// Convert ReportError to HTTP response
impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ReportError::InvalidRange => (
                StatusCode::BAD_REQUEST,
                "invalid_range",
                "Start date must not be after end date".to_string(),
            ),
            ReportError::DatabaseError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", msg)
            }
        };

        ErrorResponse::new(error_type, &message).into_response_with(status)
    }
}

/// Handler for listing purchased products
///
/// Returns the distinct product names found in purchases, sorted alphabetically.
#[utoipa::path(
    get,
    path = "/api/reports/products",
    responses(
        (status = 200, description = "Purchased products", body = Vec<String>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn list_products_handler(
    State(report_service): State<Arc<dyn ReportService>>,
) -> Result<Json<Vec<String>>, Response> {
    match report_service.list_products().await {
        Ok(products) => Ok(Json(products)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for the weighted price report
///
/// Resolves the period from explicit dates or a preset ending today, then returns the
/// unit-price series and the quantity-weighted average price of the product.
#[utoipa::path(
    get,
    path = "/api/reports/weighted-price",
    params(WeightedPriceQuery),
    responses(
        (status = 200, description = "Weighted price report", body = WeightedPriceReport),
        (status = 400, description = "Missing product or reversed dates", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn weighted_price_handler(
    State(report_service): State<Arc<dyn ReportService>>,
    Query(query): Query<WeightedPriceQuery>,
) -> Result<Json<WeightedPriceReport>, Response> {
    if let Err(validation_errors) = query.validate() {
        return Err(validation_error_response(&validation_errors));
    }

    let range = query.date_range(Local::now().date_naive());

    match report_service
        .weighted_price_report(&query.product, range)
        .await
    {
        Ok(report) => Ok(Json(report)),
        Err(e) => Err(e.into_response()),
    }
}
