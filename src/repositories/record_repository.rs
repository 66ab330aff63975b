use async_trait::async_trait;
use sqlx::error::ErrorKind;
use sqlx::PgPool;

use crate::models::category::{RecordTable, MERCHANDISE};
use crate::models::filters::RecordFilters;
use crate::models::reconciliation::RecordChanges;
use crate::models::record::{Record, RecordRow};

/// Repository errors for database operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Resource not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Trait defining the persistence gateway for purchases and expenses
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Insert a record into the given table and return the stored row
    async fn insert(
        &self,
        table: RecordTable,
        record: &Record,
    ) -> Result<RecordRow, RepositoryError>;

    /// Write the changed fields of an existing row
    async fn update(
        &self,
        table: RecordTable,
        id: i64,
        changes: &RecordChanges,
    ) -> Result<(), RepositoryError>;

    /// Delete a row by ID
    async fn delete(&self, table: RecordTable, id: i64) -> Result<(), RepositoryError>;

    /// Find rows of the table selected by the filter category, sorted by date ascending
    async fn find(&self, filters: &RecordFilters) -> Result<Vec<RecordRow>, RepositoryError>;

    /// Distinct product names ever purchased, sorted alphabetically
    async fn list_products(&self) -> Result<Vec<String>, RepositoryError>;
}

const PURCHASE_COLUMNS: &str =
    "id, date, category, product, quantity, unit, amount, supplier, description, created_at";

const EXPENSE_COLUMNS: &str = "id, date, category, product, NULL::NUMERIC AS quantity, \
     NULL::VARCHAR AS unit, amount, supplier, description, created_at";

fn columns(table: RecordTable) -> &'static str {
    match table {
        RecordTable::Purchases => PURCHASE_COLUMNS,
        RecordTable::Expenses => EXPENSE_COLUMNS,
    }
}

/// Escape LIKE wildcards so the product filter matches literally
fn like_pattern(product: &str) -> String {
    let escaped = product
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn map_sqlx_error(error: sqlx::Error) -> RepositoryError {
    match error {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db_err) => match db_err.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => RepositoryError::ConstraintViolation(db_err.to_string()),
            _ => RepositoryError::DatabaseError(db_err.to_string()),
        },
        other => RepositoryError::DatabaseError(other.to_string()),
    }
}

/// PostgreSQL implementation of RecordRepository
pub struct PostgresRecordRepository {
    pool: PgPool,
}

impl PostgresRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordRepository for PostgresRecordRepository {
    async fn insert(
        &self,
        table: RecordTable,
        record: &Record,
    ) -> Result<RecordRow, RepositoryError> {
        if record.table() != table {
            return Err(RepositoryError::ConstraintViolation(format!(
                "a '{}' record cannot be stored in {}",
                record.category(),
                table
            )));
        }

        let result = match record {
            Record::Merchandise {
                date,
                product,
                amount,
                quantity,
                unit,
                supplier,
                description,
            } => {
                let query = format!(
                    r#"
                    INSERT INTO purchases (
                        date, category, product, quantity, unit,
                        amount, supplier, description
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING {}
                    "#,
                    PURCHASE_COLUMNS
                );

                sqlx::query_as::<_, RecordRow>(&query)
                    .bind(*date)
                    .bind(MERCHANDISE)
                    .bind(product.as_str())
                    .bind(*quantity)
                    .bind(unit.as_str())
                    .bind(*amount)
                    .bind(supplier.as_deref())
                    .bind(description.as_deref())
                    .fetch_one(&self.pool)
                    .await
            }
            Record::Expense {
                date,
                category,
                product,
                amount,
                supplier,
                description,
            } => {
                let query = format!(
                    r#"
                    INSERT INTO expenses (
                        date, category, product, amount, supplier, description
                    )
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING {}
                    "#,
                    EXPENSE_COLUMNS
                );

                sqlx::query_as::<_, RecordRow>(&query)
                    .bind(*date)
                    .bind(category.as_str())
                    .bind(product.as_str())
                    .bind(*amount)
                    .bind(supplier.as_deref())
                    .bind(description.as_deref())
                    .fetch_one(&self.pool)
                    .await
            }
        };

        result.map_err(map_sqlx_error)
    }

    async fn update(
        &self,
        table: RecordTable,
        id: i64,
        changes: &RecordChanges,
    ) -> Result<(), RepositoryError> {
        if changes.is_empty() {
            return Ok(());
        }

        if table == RecordTable::Expenses && (changes.quantity.is_some() || changes.unit.is_some())
        {
            return Err(RepositoryError::ConstraintViolation(
                "expenses have no quantity or unit".to_string(),
            ));
        }

        // $1 is the row id; changed fields follow in declaration order
        let mut param_count = 1;
        let mut assignments = Vec::new();

        if changes.date.is_some() {
            param_count += 1;
            assignments.push(format!("date = ${}", param_count));
        }
        if changes.category.is_some() {
            param_count += 1;
            assignments.push(format!("category = ${}", param_count));
        }
        if changes.product.is_some() {
            param_count += 1;
            assignments.push(format!("product = ${}", param_count));
        }
        if changes.amount.is_some() {
            param_count += 1;
            assignments.push(format!("amount = ${}", param_count));
        }
        if changes.quantity.is_some() {
            param_count += 1;
            assignments.push(format!("quantity = ${}", param_count));
        }
        if changes.unit.is_some() {
            param_count += 1;
            assignments.push(format!("unit = ${}", param_count));
        }

        let query = format!(
            "UPDATE {} SET {} WHERE id = $1",
            table.table_name(),
            assignments.join(", ")
        );

        let mut sqlx_query = sqlx::query(&query).bind(id);

        if let Some(date) = changes.date {
            sqlx_query = sqlx_query.bind(date);
        }
        if let Some(category) = &changes.category {
            sqlx_query = sqlx_query.bind(category.as_str());
        }
        if let Some(product) = &changes.product {
            sqlx_query = sqlx_query.bind(product.as_str());
        }
        if let Some(amount) = changes.amount {
            sqlx_query = sqlx_query.bind(amount);
        }
        if let Some(quantity) = changes.quantity {
            sqlx_query = sqlx_query.bind(quantity);
        }
        if let Some(unit) = changes.unit {
            sqlx_query = sqlx_query.bind(unit.as_str());
        }

        let result = sqlx_query
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }

    async fn delete(&self, table: RecordTable, id: i64) -> Result<(), RepositoryError> {
        let query = format!("DELETE FROM {} WHERE id = $1", table.table_name());

        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }

    async fn find(&self, filters: &RecordFilters) -> Result<Vec<RecordRow>, RepositoryError> {
        let table = filters.table();
        let mut query = format!("SELECT {} FROM {}", columns(table), table.table_name());

        let mut param_count = 0;
        let mut conditions = Vec::new();

        if filters.start_date.is_some() {
            param_count += 1;
            conditions.push(format!("date >= ${}", param_count));
        }
        if filters.end_date.is_some() {
            param_count += 1;
            conditions.push(format!("date <= ${}", param_count));
        }
        if filters.product_filter().is_some() {
            param_count += 1;
            conditions.push(format!("product ILIKE ${}", param_count));
        }

        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }

        query.push_str(" ORDER BY date ASC, id ASC");

        let mut sqlx_query = sqlx::query_as::<_, RecordRow>(&query);

        if let Some(start) = filters.start_date {
            sqlx_query = sqlx_query.bind(start);
        }
        if let Some(end) = filters.end_date {
            sqlx_query = sqlx_query.bind(end);
        }
        if let Some(product) = filters.product_filter() {
            sqlx_query = sqlx_query.bind(like_pattern(product));
        }

        sqlx_query
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_products(&self) -> Result<Vec<String>, RepositoryError> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT product
            FROM purchases
            WHERE TRIM(product) <> ''
            ORDER BY product
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("tomate"), "%tomate%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_expense_columns_fill_missing_fields() {
        assert!(columns(RecordTable::Expenses).contains("NULL::NUMERIC AS quantity"));
        assert!(columns(RecordTable::Purchases).contains("quantity, unit"));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepositoryError::NotFound
        ));
    }
}
