use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::models::filters::{DateRange, RecordFilters};
use crate::models::report::{PricePoint, WeightedPriceReport};
use crate::repositories::record_repository::{RecordRepository, RepositoryError};

/// Report service errors
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Start date must not be after end date")]
    InvalidRange,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for ReportError {
    fn from(error: RepositoryError) -> Self {
        ReportError::DatabaseError(error.to_string())
    }
}

/// Quantity-weighted average unit price: total amount over total quantity.
/// An empty series, or one with no quantity, is priced at zero.
pub fn weighted_price(points: &[PricePoint]) -> Decimal {
    let (amount, quantity) = points
        .iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(amount, quantity), point| {
            (amount + point.amount, quantity + point.quantity)
        });

    if quantity <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    amount.checked_div(quantity).unwrap_or(Decimal::ZERO)
}

/// Trait defining reporting operations
#[async_trait]
pub trait ReportService: Send + Sync {
    /// Distinct products that have been purchased, for the report's product picker
    async fn list_products(&self) -> Result<Vec<String>, ReportError>;

    /// Unit-price series and weighted price of one product over a date range
    async fn weighted_price_report(
        &self,
        product: &str,
        range: DateRange,
    ) -> Result<WeightedPriceReport, ReportError>;
}

/// Implementation of ReportService
pub struct ReportServiceImpl {
    repository: Arc<dyn RecordRepository>,
}

impl ReportServiceImpl {
    pub fn new(repository: Arc<dyn RecordRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl ReportService for ReportServiceImpl {
    async fn list_products(&self) -> Result<Vec<String>, ReportError> {
        Ok(self.repository.list_products().await?)
    }

    async fn weighted_price_report(
        &self,
        product: &str,
        range: DateRange,
    ) -> Result<WeightedPriceReport, ReportError> {
        if range.start > range.end {
            return Err(ReportError::InvalidRange);
        }

        let product = product.trim();
        let rows = self
            .repository
            .find(&RecordFilters::purchases(product, range))
            .await?;

        // Rows without a positive quantity have no unit price, so their amount is left
        // out of the weighted sum as well. Stored purchases always carry one.
        let mut points = Vec::with_capacity(rows.len());
        for row in &rows {
            match PricePoint::from_row(row) {
                Some(point) => points.push(point),
                None => tracing::debug!(
                    id = row.id,
                    quantity = ?row.quantity,
                    "Skipping purchase without a positive quantity"
                ),
            }
        }
        points.sort_by_key(|point: &PricePoint| point.date);

        let weighted_price = weighted_price(&points);
        tracing::debug!(
            product,
            points = points.len(),
            weighted_price = %weighted_price,
            "Computed weighted price"
        );

        Ok(WeightedPriceReport {
            product: product.to_string(),
            start: range.start,
            end: range.end,
            weighted_price,
            points,
        })
    }
}
