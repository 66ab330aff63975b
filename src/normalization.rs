use rust_decimal::Decimal;

use crate::models::category::{canonical_category, is_merchandise, Unit};
use crate::models::record::{FieldValue, RawRecord, Record};
use crate::validation::{parse_date, read_numeric, validate, Numeric};

/// A record failed one or more field rules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .messages.join("; "))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

impl ValidationError {
    fn single(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }
}

fn required_decimal(field: &str, value: Option<&FieldValue>) -> Result<Decimal, ValidationError> {
    match read_numeric(value) {
        Numeric::Value(number) => Ok(number),
        Numeric::Missing => Err(ValidationError::single(format!("{} is required", field))),
        Numeric::Invalid => Err(ValidationError::single(format!("invalid {} format", field))),
    }
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Convert raw input into a canonical record.
///
/// Dates become calendar dates, the category is trimmed and lower-cased, numeric
/// fields are parsed to decimals. Quantity and unit only survive for merchandise.
pub fn normalize(raw: &RawRecord) -> Result<Record, ValidationError> {
    let messages = validate(raw);
    if !messages.is_empty() {
        return Err(ValidationError { messages });
    }

    let date = raw
        .date
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| ValidationError::single("invalid date format"))?;
    let category = canonical_category(raw.category.as_deref().unwrap_or_default());
    let product = raw.product.as_deref().unwrap_or_default().trim().to_string();
    let amount = required_decimal("amount", raw.amount.as_ref())?;
    let supplier = optional_text(raw.supplier.as_deref());
    let description = optional_text(raw.description.as_deref());

    if is_merchandise(&category) {
        let quantity = required_decimal("quantity", raw.quantity.as_ref())?;
        let unit = raw
            .unit
            .as_deref()
            .and_then(Unit::parse)
            .ok_or_else(|| ValidationError::single("unit is required"))?;

        Ok(Record::Merchandise {
            date,
            product,
            amount,
            quantity,
            unit,
            supplier,
            description,
        })
    } else {
        Ok(Record::Expense {
            date,
            category,
            product,
            amount,
            supplier,
            description,
        })
    }
}
