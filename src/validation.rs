use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use validator::ValidationError;

use crate::models::category::{canonical_category, is_merchandise, Unit};
use crate::models::filters::{RecordFilters, WeightedPriceQuery};
use crate::models::record::{FieldValue, RawRecord};

/// Parse a calendar date from `YYYY-MM-DD` or a date-time in the same format
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Outcome of reading a numeric form field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Numeric {
    Missing,
    Invalid,
    Value(Decimal),
}

pub(crate) fn read_numeric(value: Option<&FieldValue>) -> Numeric {
    match value {
        None => Numeric::Missing,
        Some(value) if value.is_blank() => Numeric::Missing,
        Some(value) => value.to_decimal().map_or(Numeric::Invalid, Numeric::Value),
    }
}

fn check_positive(field: &str, value: Option<&FieldValue>, errors: &mut Vec<String>) {
    match read_numeric(value) {
        Numeric::Missing => errors.push(format!("{} is required", field)),
        Numeric::Invalid => errors.push(format!("invalid {} format", field)),
        Numeric::Value(number) if number <= Decimal::ZERO => {
            errors.push(format!("{} must be > 0", field))
        }
        Numeric::Value(_) => {}
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Check a raw record against the field rules of its category.
///
/// Every rule is evaluated; an empty result means the record is valid. Quantity
/// and unit are only checked for merchandise.
pub fn validate(raw: &RawRecord) -> Vec<String> {
    let mut errors = Vec::new();

    match raw.date.as_deref() {
        date if is_blank(date) => errors.push("date is required".to_string()),
        Some(date) if parse_date(date).is_none() => {
            errors.push("invalid date format".to_string())
        }
        _ => {}
    }

    let category = raw.category.as_deref().map(canonical_category);
    if is_blank(category.as_deref()) {
        errors.push("category is required".to_string());
    }

    if is_blank(raw.product.as_deref()) {
        errors.push("product is required".to_string());
    }

    check_positive("amount", raw.amount.as_ref(), &mut errors);

    if category.as_deref().is_some_and(is_merchandise) {
        check_positive("quantity", raw.quantity.as_ref(), &mut errors);

        match raw.unit.as_deref() {
            unit if is_blank(unit) => errors.push("unit is required".to_string()),
            Some(unit) if Unit::parse(unit).is_none() => {
                let allowed: Vec<&str> = Unit::ALL.iter().map(Unit::as_str).collect();
                errors.push(format!("unit must be one of: {}", allowed.join(", ")));
            }
            _ => {}
        }
    }

    errors
}

/// Validates that a text field contains something other than whitespace
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("Value must not be empty".into());
        return Err(error);
    }
    Ok(())
}

/// Validates that the query start date does not come after its end date
pub fn validate_filter_dates(filters: &RecordFilters) -> Result<(), ValidationError> {
    match (filters.start_date, filters.end_date) {
        (Some(start), Some(end)) if start > end => Err(invalid_range()),
        _ => Ok(()),
    }
}

/// Validates an explicit report range; presets are always well ordered
pub fn validate_report_range(query: &WeightedPriceQuery) -> Result<(), ValidationError> {
    match (query.start, query.end) {
        (Some(start), Some(end)) if start > end => Err(invalid_range()),
        _ => Ok(()),
    }
}

fn invalid_range() -> ValidationError {
    let mut error = ValidationError::new("invalid_range");
    error.message = Some("Start date must not be after end date".into());
    error
}
