use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::category::{RecordTable, MERCHANDISE};
use crate::validation::{validate_filter_dates, validate_not_blank, validate_report_range};

/// Inclusive date range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DateRange {
    #[schema(format = "date", example = "2024-01-01")]
    pub start: NaiveDate,
    #[schema(format = "date", example = "2024-01-31")]
    pub end: NaiveDate,
}

/// Filters for the query screen: table chosen by category, then date bounds and a
/// case-insensitive product substring
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
#[validate(schema(function = "validate_filter_dates"))]
pub struct RecordFilters {
    /// Category selecting the table to search (`mercancía` searches purchases)
    #[validate(custom(function = "validate_not_blank"))]
    pub category: String,

    #[schema(format = "date", example = "2024-01-01")]
    pub start_date: Option<NaiveDate>,

    #[schema(format = "date", example = "2024-01-31")]
    pub end_date: Option<NaiveDate>,

    /// Substring matched case-insensitively against the product name
    pub product: Option<String>,
}

impl RecordFilters {
    /// Filters used by the price report: purchases of one product within a range
    pub fn purchases(product: &str, range: DateRange) -> Self {
        Self {
            category: MERCHANDISE.to_string(),
            start_date: Some(range.start),
            end_date: Some(range.end),
            product: Some(product.to_string()),
        }
    }

    pub fn table(&self) -> RecordTable {
        RecordTable::for_category(&self.category)
    }

    /// Trimmed product filter, if any text remains
    pub fn product_filter(&self) -> Option<&str> {
        self.product
            .as_deref()
            .map(str::trim)
            .filter(|product| !product.is_empty())
    }
}

/// Predefined report periods, each ending today
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub enum DatePreset {
    #[serde(rename = "last_30_days")]
    Last30Days,
    #[serde(rename = "last_60_days")]
    Last60Days,
    #[serde(rename = "last_90_days")]
    Last90Days,
    #[serde(rename = "this_month")]
    ThisMonth,
    #[serde(rename = "last_6_months")]
    Last6Months,
    #[serde(rename = "this_year")]
    ThisYear,
}

impl DatePreset {
    pub fn resolve(&self, today: NaiveDate) -> DateRange {
        let start = match self {
            DatePreset::Last30Days => today.checked_sub_days(Days::new(30)),
            DatePreset::Last60Days => today.checked_sub_days(Days::new(60)),
            DatePreset::Last90Days => today.checked_sub_days(Days::new(90)),
            DatePreset::ThisMonth => today.with_day(1),
            DatePreset::Last6Months => today.checked_sub_months(Months::new(6)),
            DatePreset::ThisYear => NaiveDate::from_ymd_opt(today.year(), 1, 1),
        };

        DateRange {
            start: start.unwrap_or(NaiveDate::MIN),
            end: today,
        }
    }
}

/// Query parameters of the weighted price report
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
#[validate(schema(function = "validate_report_range"))]
pub struct WeightedPriceQuery {
    #[validate(custom(function = "validate_not_blank"))]
    pub product: String,

    /// Predefined period; ignored when both `start` and `end` are given
    pub preset: Option<DatePreset>,

    #[schema(format = "date", example = "2024-01-01")]
    pub start: Option<NaiveDate>,

    #[schema(format = "date", example = "2024-01-31")]
    pub end: Option<NaiveDate>,
}

impl WeightedPriceQuery {
    /// Explicit range when both ends are set, otherwise the preset (last 30 days by default)
    pub fn date_range(&self, today: NaiveDate) -> DateRange {
        match (self.start, self.end) {
            (Some(start), Some(end)) => DateRange { start, end },
            _ => self
                .preset
                .unwrap_or(DatePreset::Last30Days)
                .resolve(today),
        }
    }
}
