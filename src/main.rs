use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use restaurant_books::config::AppConfig;
use restaurant_books::handlers::ErrorResponse;
use restaurant_books::models::{
    AddRegistrationRequest, AppliedOperation, AuthToken, BatchSummary, CategoryCatalog,
    ConfirmEditsRequest, ConfirmEditsResponse, ConfirmRegistrationsRequest,
    ConfirmRegistrationsResponse, DatePreset, DateRange, FieldValue, LoginRequest, Operation,
    PlannedDelete, PlannedUpdate, PricePoint, RawRecord, ReconcileRequest, ReconciliationPlan,
    RecordChanges, RecordFilters, RecordRow, RecordTable, RegistrationList, Rejection,
    RemoveRegistrationsRequest, Unit, WeightedPriceQuery, WeightedPriceReport,
};
use restaurant_books::repositories::PostgresRecordRepository;
use restaurant_books::services::{
    AuthService, AuthServiceImpl, RecordService, RecordServiceImpl, ReportService,
    ReportServiceImpl,
};
use restaurant_books::{build_router, telemetry};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        restaurant_books::handlers::auth_handlers::login_handler,
        restaurant_books::handlers::record_handlers::categories_handler,
        restaurant_books::handlers::record_handlers::query_records_handler,
        restaurant_books::handlers::record_handlers::reconcile_handler,
        restaurant_books::handlers::record_handlers::confirm_edits_handler,
        restaurant_books::handlers::registration_handlers::add_registration_handler,
        restaurant_books::handlers::registration_handlers::remove_registrations_handler,
        restaurant_books::handlers::registration_handlers::confirm_registrations_handler,
        restaurant_books::handlers::report_handlers::list_products_handler,
        restaurant_books::handlers::report_handlers::weighted_price_handler,
    ),
    components(
        schemas(
            CategoryCatalog, Unit, RecordTable, FieldValue, RawRecord, RecordRow,
            RecordFilters, RecordChanges, PlannedDelete, PlannedUpdate, ReconciliationPlan,
            Rejection, Operation, AppliedOperation, BatchSummary, ReconcileRequest,
            ConfirmEditsRequest, ConfirmEditsResponse, RegistrationList,
            AddRegistrationRequest, RemoveRegistrationsRequest, ConfirmRegistrationsRequest,
            ConfirmRegistrationsResponse, DatePreset, DateRange, WeightedPriceQuery,
            PricePoint, WeightedPriceReport, LoginRequest, AuthToken, ErrorResponse
        )
    ),
    tags(
        (name = "auth", description = "Operator login"),
        (name = "records", description = "Query and edit stored purchases and expenses"),
        (name = "registrations", description = "Enter new purchases and expenses"),
        (name = "reports", description = "Price analysis of purchased merchandise")
    ),
    info(
        title = "Restaurant Books API",
        version = "0.1.0",
        description = "REST API for recording restaurant purchases and expenses",
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    telemetry::init_tracing();

    let config = AppConfig::from_env()?;

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations completed");

    // Initialize repositories
    let record_repository = Arc::new(PostgresRecordRepository::new(pool));

    // Initialize services
    let record_service: Arc<dyn RecordService> =
        Arc::new(RecordServiceImpl::new(record_repository.clone()));
    let report_service: Arc<dyn ReportService> =
        Arc::new(ReportServiceImpl::new(record_repository));
    let auth_service: Arc<dyn AuthService> = Arc::new(AuthServiceImpl::new(
        config.auth_username.clone(),
        config.auth_password_hash.clone(),
        config.jwt_secret.clone(),
    ));

    let app = build_router(record_service, report_service, auth_service)
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()));

    // Start server
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, "Server running");
    tracing::info!("API docs: http://{}/api/docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
