use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::auth_handlers::login_handler;
use crate::handlers::record_handlers::{
    categories_handler, confirm_edits_handler, query_records_handler, reconcile_handler,
};
use crate::handlers::registration_handlers::{
    add_registration_handler, confirm_registrations_handler, remove_registrations_handler,
};
use crate::handlers::report_handlers::{list_products_handler, weighted_price_handler};
use crate::middleware::auth_middleware;
use crate::services::auth_service::AuthService;
use crate::services::record_service::RecordService;
use crate::services::report_service::ReportService;

/// Build the API router. Swagger UI is merged in by the binary.
///
/// Routes that read or write stored records require a bearer token from
/// `/api/auth/login`. The pending-list routes only echo the request body back.
pub fn build_router(
    record_service: Arc<dyn RecordService>,
    report_service: Arc<dyn ReportService>,
    auth_service: Arc<dyn AuthService>,
) -> Router {
    let require_auth = middleware::from_fn_with_state(auth_service.clone(), auth_middleware);

    let record_routes = Router::new()
        .route("/api/records", get(query_records_handler))
        .route("/api/records/reconcile", post(reconcile_handler))
        .route("/api/records/confirm", post(confirm_edits_handler))
        .route("/api/registrations/confirm", post(confirm_registrations_handler))
        .route_layer(require_auth.clone())
        .with_state(record_service);

    let report_routes = Router::new()
        .route("/api/reports/products", get(list_products_handler))
        .route("/api/reports/weighted-price", get(weighted_price_handler))
        .route_layer(require_auth)
        .with_state(report_service);

    let auth_routes = Router::new()
        .route("/api/auth/login", post(login_handler))
        .with_state(auth_service);

    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/api/categories", get(categories_handler))
        .route("/api/registrations", post(add_registration_handler))
        .route("/api/registrations/remove", post(remove_registrations_handler))
        .merge(auth_routes)
        .merge(record_routes)
        .merge(report_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
