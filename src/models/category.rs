use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Category whose records carry quantity and unit and live in the purchases table
pub const MERCHANDISE: &str = "mercancía";

/// Category names offered to clients. Expenses accept any other non-empty name.
pub const PREDEFINED_CATEGORIES: &[&str] = &[
    "mercancía",
    "equipos",
    "nomina",
    "limpieza",
    "servicios",
    "otros",
];

/// Canonical form of a category name: trimmed and lower-cased
pub fn canonical_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Whether a (possibly non-canonical) category name is the merchandise category
pub fn is_merchandise(category: &str) -> bool {
    canonical_category(category) == MERCHANDISE
}

/// Unit of measure for merchandise quantities
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Unidad,
    Kg,
    Litros,
    Paquete,
}

impl Unit {
    pub const ALL: [Unit; 4] = [Unit::Unidad, Unit::Kg, Unit::Litros, Unit::Paquete];

    /// Convert to the string stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Unidad => "unidad",
            Unit::Kg => "kg",
            Unit::Litros => "litros",
            Unit::Paquete => "paquete",
        }
    }

    /// Parse from user input or a database value, ignoring case and surrounding whitespace
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Unit::ALL.into_iter().find(|unit| unit.as_str() == value)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination table of a record, fully determined by its category
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum RecordTable {
    Purchases,
    Expenses,
}

impl RecordTable {
    pub fn for_category(category: &str) -> Self {
        if is_merchandise(category) {
            RecordTable::Purchases
        } else {
            RecordTable::Expenses
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            RecordTable::Purchases => "purchases",
            RecordTable::Expenses => "expenses",
        }
    }
}

impl fmt::Display for RecordTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Categories and units a client can offer in its entry forms
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "categories": ["mercancía", "equipos", "nomina", "limpieza", "servicios", "otros"],
    "merchandise_category": "mercancía",
    "units": ["unidad", "kg", "litros", "paquete"]
}))]
pub struct CategoryCatalog {
    pub categories: Vec<String>,
    pub merchandise_category: String,
    pub units: Vec<Unit>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self {
            categories: PREDEFINED_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            merchandise_category: MERCHANDISE.to_string(),
            units: Unit::ALL.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_for_category_is_case_insensitive() {
        assert_eq!(RecordTable::for_category("mercancía"), RecordTable::Purchases);
        assert_eq!(RecordTable::for_category("  MERCANCÍA "), RecordTable::Purchases);
        assert_eq!(RecordTable::for_category("equipos"), RecordTable::Expenses);
        assert_eq!(RecordTable::for_category("propinas"), RecordTable::Expenses);
    }

    #[test]
    fn test_unit_parse() {
        assert_eq!(Unit::parse("kg"), Some(Unit::Kg));
        assert_eq!(Unit::parse(" Litros "), Some(Unit::Litros));
        assert_eq!(Unit::parse("caja"), None);
        assert_eq!(Unit::parse(""), None);
    }

    #[test]
    fn test_catalog_lists_merchandise_first() {
        let catalog = CategoryCatalog::default();
        assert_eq!(catalog.categories[0], MERCHANDISE);
        assert_eq!(catalog.units.len(), 4);
    }
}
