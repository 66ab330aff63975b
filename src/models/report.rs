use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::record::RecordRow;

/// One purchase in a price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PricePoint {
    #[schema(format = "date")]
    pub date: NaiveDate,
    pub amount: Decimal,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl PricePoint {
    pub fn new(date: NaiveDate, amount: Decimal, quantity: Decimal) -> Option<Self> {
        if quantity <= Decimal::ZERO {
            return None;
        }
        let unit_price = amount.checked_div(quantity)?;
        Some(Self {
            date,
            amount,
            quantity,
            unit_price,
        })
    }

    /// Purchase rows without a positive quantity have no unit price and are skipped
    pub fn from_row(row: &RecordRow) -> Option<Self> {
        Self::new(row.date, row.amount, row.quantity?)
    }
}

/// Weighted average unit price of a product over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "product": "tomate",
    "start": "2024-02-01",
    "end": "2024-03-01",
    "weighted_price": "10",
    "points": [
        {"date": "2024-02-03", "amount": "100", "quantity": "10", "unit_price": "10"},
        {"date": "2024-02-17", "amount": "50", "quantity": "5", "unit_price": "10"}
    ]
}))]
pub struct WeightedPriceReport {
    pub product: String,
    #[schema(format = "date")]
    pub start: NaiveDate,
    #[schema(format = "date")]
    pub end: NaiveDate,
    pub weighted_price: Decimal,
    /// Purchases sorted by date ascending
    pub points: Vec<PricePoint>,
}
