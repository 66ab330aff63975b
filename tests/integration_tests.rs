use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use restaurant_books::build_router;
use restaurant_books::models::{
    FieldValue, RawRecord, Record, RecordChanges, RecordFilters, RecordRow, RecordTable,
    StoredRecord,
};
use restaurant_books::repositories::{PostgresRecordRepository, RecordRepository, RepositoryError};
use restaurant_books::services::{AuthServiceImpl, RecordServiceImpl, ReportServiceImpl};

/// In-memory stand-in for the two tables
#[derive(Default)]
struct InMemoryRecordRepository {
    rows: Mutex<Vec<(RecordTable, RecordRow)>>,
    next_id: Mutex<i64>,
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn insert(
        &self,
        table: RecordTable,
        record: &Record,
    ) -> Result<RecordRow, RepositoryError> {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let row = RecordRow::from(&StoredRecord {
            id: *next_id,
            record: record.clone(),
            created_at: None,
        });
        self.rows.lock().unwrap().push((table, row.clone()));
        Ok(row)
    }

    async fn update(
        &self,
        table: RecordTable,
        id: i64,
        changes: &RecordChanges,
    ) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let (_, row) = rows
            .iter_mut()
            .find(|(t, row)| *t == table && row.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if let Some(date) = changes.date {
            row.date = date;
        }
        if let Some(category) = &changes.category {
            row.category = category.clone();
        }
        if let Some(product) = &changes.product {
            row.product = product.clone();
        }
        if let Some(amount) = changes.amount {
            row.amount = amount;
        }
        if let Some(quantity) = changes.quantity {
            row.quantity = Some(quantity);
        }
        if let Some(unit) = changes.unit {
            row.unit = Some(unit.as_str().to_string());
        }
        Ok(())
    }

    async fn delete(&self, table: RecordTable, id: i64) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|(t, row)| !(*t == table && row.id == id));
        if rows.len() == before {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }

    async fn find(&self, filters: &RecordFilters) -> Result<Vec<RecordRow>, RepositoryError> {
        let table = filters.table();
        let product = filters.product_filter().map(str::to_lowercase);
        let mut rows: Vec<RecordRow> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == table)
            .map(|(_, row)| row)
            .filter(|row| filters.start_date.map_or(true, |start| row.date >= start))
            .filter(|row| filters.end_date.map_or(true, |end| row.date <= end))
            .filter(|row| {
                product
                    .as_deref()
                    .map_or(true, |p| row.product.to_lowercase().contains(p))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn list_products(&self) -> Result<Vec<String>, RepositoryError> {
        let mut products: Vec<String> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == RecordTable::Purchases)
            .map(|(_, row)| row.product.clone())
            .collect();
        products.sort();
        products.dedup();
        Ok(products)
    }
}

const OPERATOR: &str = "encargado";
const PASSWORD: &str = "password123";

/// Router plus a bearer token for the operator account
struct TestApp {
    router: Router,
    token: String,
}

impl TestApp {
    /// Build an app backed by the given repository and log the operator in
    async fn with_repository(repository: Arc<dyn RecordRepository>) -> Self {
        // Minimum bcrypt cost keeps the tests fast
        let password_hash = bcrypt::hash(PASSWORD, 4).unwrap();
        let router = build_router(
            Arc::new(RecordServiceImpl::new(repository.clone())),
            Arc::new(ReportServiceImpl::new(repository)),
            Arc::new(AuthServiceImpl::new(
                OPERATOR.to_string(),
                password_hash,
                "test_secret".to_string(),
            )),
        );

        let (status, body) = send(
            &router,
            None,
            "POST",
            "/api/auth/login",
            Some(json!({ "username": OPERATOR, "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        let token = body["token"].as_str().unwrap().to_string();

        Self { router, token }
    }

    async fn new() -> Self {
        Self::with_repository(Arc::new(InMemoryRecordRepository::default())).await
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(&self.router, Some(&self.token), "POST", uri, Some(body)).await
    }

    async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.router, Some(&self.token), "GET", uri, None).await
    }
}

/// Helper function to parse JSON response body
async fn parse_json_body(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

async fn send(
    router: &Router,
    token: Option<&str>,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, parse_json_body(response.into_body()).await)
}

fn purchase(date: &str, product: &str, amount: f64, quantity: f64) -> Value {
    json!({
        "date": date,
        "category": "Mercancía",
        "product": product,
        "amount": amount,
        "quantity": quantity,
        "unit": "kg"
    })
}

fn expense(date: &str, category: &str, product: &str, amount: &str) -> Value {
    json!({
        "date": date,
        "category": category,
        "product": product,
        "amount": amount
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_categories_catalog() {
    let app = TestApp::new().await;

    let (status, body) = app.get_json("/api/categories").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["merchandise_category"], "mercancía");
    assert_eq!(body["units"], json!(["unidad", "kg", "litros", "paquete"]));
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = TestApp::new().await;

    let (status, body) = send(
        &app.router,
        None,
        "POST",
        "/api/auth/login",
        Some(json!({ "username": OPERATOR, "password": "wrong" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_storage_routes_require_token() {
    let app = TestApp::new().await;

    let requests = [
        ("GET", "/api/records?category=servicios", None),
        (
            "POST",
            "/api/records/reconcile",
            Some(json!({ "original": [], "edited": [] })),
        ),
        (
            "POST",
            "/api/records/confirm",
            Some(json!({ "filters": { "category": "servicios" }, "original": [], "edited": [] })),
        ),
        (
            "POST",
            "/api/registrations/confirm",
            Some(json!({ "pending": [expense("2024-03-01", "servicios", "Luz", "100")] })),
        ),
        ("GET", "/api/reports/products", None),
        ("GET", "/api/reports/weighted-price?product=tomate", None),
    ];

    for (method, uri, body) in requests {
        let (status, response) = send(&app.router, None, method, uri, body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(response["error"], "missing_token");

        let (status, response) = send(&app.router, Some("forged"), method, uri, body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(response["error"], "invalid_token");
    }
}

#[tokio::test]
async fn test_unauthenticated_delete_all_leaves_records() {
    let app = TestApp::new().await;
    app.post_json(
        "/api/registrations/confirm",
        json!({ "pending": [expense("2024-03-01", "servicios", "Luz", "100")] }),
    )
    .await;
    let (_, original) = app.get_json("/api/records?category=servicios").await;

    // An empty edit buffer would delete the whole snapshot
    let (status, _) = send(
        &app.router,
        None,
        "POST",
        "/api/records/confirm",
        Some(json!({
            "filters": { "category": "servicios" },
            "original": original,
            "edited": []
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, after) = app.get_json("/api/records?category=servicios").await;
    assert_eq!(after, original);
}

#[tokio::test]
async fn test_pending_list_routes_do_not_require_token() {
    let app = TestApp::new().await;

    let (status, list) = send(
        &app.router,
        None,
        "POST",
        "/api/registrations",
        Some(json!({ "record": expense("2024-03-01", "servicios", "Luz", "100") })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, list) = send(
        &app.router,
        None,
        "POST",
        "/api/registrations/remove",
        Some(json!({ "pending": list["pending"], "indices": [0] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["pending"], json!([]));
}

#[tokio::test]
async fn test_registration_flow_routes_by_category() {
    let app = TestApp::new().await;

    // Build the pending list one record at a time
    let (status, list) = app.post_json(
        "/api/registrations",
        json!({ "record": purchase("2024-02-03", "Tomate", 100.0, 10.0) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, list) = app.post_json(
        "/api/registrations",
        json!({
            "pending": list["pending"],
            "record": expense("2024-02-04", "Servicios", "Luz", "300")
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["pending"].as_array().unwrap().len(), 2);
    assert_eq!(list["pending"][1]["category"], "servicios");

    let (status, saved) = app.post_json(
        "/api/registrations/confirm",
        json!({ "pending": list["pending"] }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(saved["summary"]["inserted"], 2);

    let (_, purchases) = app.get_json("/api/records?category=mercanc%C3%ADa").await;
    let (_, expenses) = app.get_json("/api/records?category=servicios").await;

    assert_eq!(purchases.as_array().unwrap().len(), 1);
    assert_eq!(purchases[0]["unit"], "kg");
    assert_eq!(expenses.as_array().unwrap().len(), 1);
    assert!(expenses[0]["quantity"].is_null());
}

#[tokio::test]
async fn test_invalid_registration_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app.post_json(
        "/api/registrations",
        json!({
            "record": {
                "date": "2024-02-03",
                "category": "mercancía",
                "product": "Papa",
                "amount": 0
            }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(
        body["rejections"][0]["errors"],
        json!(["amount must be > 0", "quantity is required", "unit is required"])
    );
}

#[tokio::test]
async fn test_edit_flow_updates_deletes_and_inserts() {
    let app = TestApp::new().await;
    app.post_json(
        "/api/registrations/confirm",
        json!({ "pending": [
            expense("2024-03-01", "servicios", "Luz", "100"),
            expense("2024-03-02", "servicios", "Agua", "50"),
        ] }),
    )
    .await;

    let (_, original) = app.get_json("/api/records?category=servicios").await;
    assert_eq!(original.as_array().unwrap().len(), 2);

    let mut edited = original[0].clone();
    edited["amount"] = json!("120");
    let new_row = expense("2024-03-05", "servicios", "Internet", "80");

    let (status, plan) = app.post_json(
        "/api/records/reconcile",
        json!({ "original": original, "edited": [edited.clone(), new_row.clone()] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["deletes"][0]["id"], original[1]["id"]);
    assert_eq!(plan["updates"][0]["changes"], json!({ "amount": "120" }));
    assert_eq!(plan["inserts"].as_array().unwrap().len(), 1);

    let (status, confirmed) = app.post_json(
        "/api/records/confirm",
        json!({
            "filters": { "category": "servicios" },
            "original": original,
            "edited": [edited, new_row]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["summary"]["deleted"], 1);
    assert_eq!(confirmed["summary"]["updated"], 1);
    assert_eq!(confirmed["summary"]["inserted"], 1);

    let products: Vec<&str> = confirmed["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["product"].as_str().unwrap())
        .collect();
    assert_eq!(products, vec!["Luz", "Internet"]);
}

#[tokio::test]
async fn test_edit_with_invalid_row_changes_nothing() {
    let app = TestApp::new().await;
    app.post_json(
        "/api/registrations/confirm",
        json!({ "pending": [expense("2024-03-01", "equipos", "Horno", "9000")] }),
    )
    .await;
    let (_, original) = app.get_json("/api/records?category=equipos").await;

    let mut edited = original[0].clone();
    edited["date"] = json!("01/03/2024");

    let (status, body) = app.post_json(
        "/api/records/confirm",
        json!({ "filters": { "category": "equipos" }, "original": original, "edited": [edited] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["rejections"][0]["errors"], json!(["invalid date format"]));

    let (_, after) = app.get_json("/api/records?category=equipos").await;
    assert_eq!(after, original);
}

#[tokio::test]
async fn test_edit_with_foreign_id_is_a_conflict() {
    let app = TestApp::new().await;

    let mut stray = expense("2024-03-01", "otros", "Propina", "10");
    stray["id"] = json!(404);

    let (status, body) = app.post_json(
        "/api/records/reconcile",
        json!({ "original": [], "edited": [stray] }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "reconciliation_fault");
}

#[tokio::test]
async fn test_weighted_price_report() {
    let app = TestApp::new().await;
    app.post_json(
        "/api/registrations/confirm",
        json!({ "pending": [
            purchase("2024-02-17", "Tomate", 50.0, 5.0),
            purchase("2024-02-03", "Tomate", 100.0, 10.0),
            purchase("2024-02-10", "Cebolla", 30.0, 1.0),
            purchase("2023-12-31", "Tomate", 999.0, 1.0),
        ] }),
    )
    .await;

    let (status, products) = app.get_json("/api/reports/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products, json!(["Cebolla", "Tomate"]));

    let (status, report) = app.get_json(
        "/api/reports/weighted-price?product=tomate&start=2024-02-01&end=2024-02-29",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let weighted: Decimal = report["weighted_price"].as_str().unwrap().parse().unwrap();
    assert_eq!(weighted, Decimal::from(10));
    assert_eq!(report["points"][0]["date"], "2024-02-03");
    assert_eq!(report["points"][1]["date"], "2024-02-17");
}

#[tokio::test]
async fn test_weighted_price_report_rejects_reversed_range() {
    let app = TestApp::new().await;

    let (status, body) = app.get_json(
        "/api/reports/weighted-price?product=tomate&start=2024-03-01&end=2024-02-01",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

/// Round trip against a real database; set DATABASE_URL and run with `--ignored`
#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_postgres_repository_round_trip() {
    dotenv::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgresql://localhost/restaurant_books".to_string());
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let repository = PostgresRecordRepository::new(pool);
    let product = format!("Prueba {}", std::process::id());
    let raw = RawRecord {
        date: Some("2024-05-01".to_string()),
        category: Some("mercancía".to_string()),
        product: Some(product.clone()),
        amount: Some(FieldValue::Text("42.50".to_string())),
        quantity: Some(FieldValue::Text("2.5".to_string())),
        unit: Some("kg".to_string()),
        ..RawRecord::default()
    };
    let record = restaurant_books::normalization::normalize(&raw).unwrap();

    let row = repository
        .insert(RecordTable::Purchases, &record)
        .await
        .unwrap();
    assert_eq!(row.unit.as_deref(), Some("kg"));

    let changes = RecordChanges {
        amount: Some(Decimal::from(45)),
        ..RecordChanges::default()
    };
    repository
        .update(RecordTable::Purchases, row.id, &changes)
        .await
        .unwrap();

    let filters = RecordFilters {
        category: "mercancía".to_string(),
        product: Some(product.to_lowercase()),
        ..RecordFilters::default()
    };
    let found = repository.find(&filters).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].amount, Decimal::from(45));

    repository
        .delete(RecordTable::Purchases, row.id)
        .await
        .unwrap();
    assert!(matches!(
        repository.delete(RecordTable::Purchases, row.id).await,
        Err(RepositoryError::NotFound)
    ));
}
