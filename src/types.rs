//! Shared types flowing between the parser, matcher and fallback chain.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Parsed name ─────────────────────────────────────────────────────

/// Normalized view of a free-text product name.
///
/// Produced identically for order lines and catalog entry names so both
/// sides of a comparison live in the same space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedName {
    /// The text that was parsed, untouched.
    pub original_text: String,
    /// Canonical product type, `None` when classification failed.
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    /// Attribute name → extracted value.
    pub params: BTreeMap<String, String>,
}

impl ParsedName {
    /// A parse result for a line no type could be found for.
    pub fn unclassified(original_text: &str) -> Self {
        Self {
            original_text: original_text.to_string(),
            item_type: None,
            params: BTreeMap::new(),
        }
    }

    /// Whether a canonical type was found.
    pub fn is_classified(&self) -> bool {
        self.item_type.is_some()
    }

    /// Look up a single attribute value.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

// ── Line items ──────────────────────────────────────────────────────

/// Ordered quantity. Integral when the source text was integral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Integer(i64),
    Decimal(f64),
}

impl Quantity {
    /// Parse a quantity token: integer first, then decimal (`,` accepted as
    /// the decimal separator). Returns `None` for anything else.
    pub fn parse(token: &str) -> Option<Self> {
        let cleaned: String = token.trim().chars().filter(|c| !c.is_whitespace()).collect();
        if let Ok(n) = cleaned.parse::<i64>() {
            return Some(Self::Integer(n));
        }
        cleaned
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Self::Decimal)
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Integer(n) => n as f64,
            Self::Decimal(f) => f,
        }
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::Integer(1)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Decimal(d) => write!(f, "{d}"),
        }
    }
}

/// One ordered product as extracted from an e-mail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub name: String,
    /// Catalog code, empty until matched.
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub quantity: Quantity,
    #[serde(default)]
    pub sum: f64,
}

impl LineItem {
    /// A not-yet-matched item with no price.
    pub fn new(name: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            name: name.into(),
            code: String::new(),
            quantity,
            sum: 0.0,
        }
    }
}

// ── Resolution result ───────────────────────────────────────────────

/// A line item after catalog resolution.
///
/// When `matched` is false, `code` is empty and `name` is the order's own
/// free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLine {
    pub name: String,
    pub code: String,
    pub quantity: Quantity,
    pub sum: f64,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    pub matched: bool,
}

impl ResolvedLine {
    /// Pass a line through unresolved.
    pub fn unmatched(item: &LineItem, parsed: Option<&ParsedName>) -> Self {
        Self {
            name: item.name.clone(),
            code: String::new(),
            quantity: item.quantity,
            sum: item.sum,
            item_type: parsed.and_then(|p| p.item_type.clone()),
            params: parsed.map(|p| p.params.clone()).unwrap_or_default(),
            matched: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_prefers_integer() {
        assert_eq!(Quantity::parse("5"), Some(Quantity::Integer(5)));
        assert_eq!(Quantity::parse(" 12 "), Some(Quantity::Integer(12)));
    }

    #[test]
    fn quantity_accepts_decimal_comma() {
        assert_eq!(Quantity::parse("2,5"), Some(Quantity::Decimal(2.5)));
        assert_eq!(Quantity::parse("0.75"), Some(Quantity::Decimal(0.75)));
    }

    #[test]
    fn quantity_rejects_garbage() {
        assert_eq!(Quantity::parse("шт"), None);
        assert_eq!(Quantity::parse(""), None);
        assert_eq!(Quantity::parse("inf"), None);
    }

    #[test]
    fn quantity_serializes_as_plain_number() {
        let item = LineItem::new("Widget A", Quantity::Integer(5));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "Widget A", "code": "", "quantity": 5, "sum": 0.0})
        );
    }

    #[test]
    fn line_item_deserializes_with_missing_fields() {
        let item: LineItem = serde_json::from_str(r#"{"name": "Отвод 90"}"#).unwrap();
        assert_eq!(item.name, "Отвод 90");
        assert_eq!(item.code, "");
        assert_eq!(item.quantity, Quantity::Integer(1));
        assert_eq!(item.sum, 0.0);
    }

    #[test]
    fn line_item_accepts_fractional_quantity() {
        let item: LineItem =
            serde_json::from_str(r#"{"name": "Труба", "code": "", "quantity": 2.5, "sum": 0}"#)
                .unwrap();
        assert_eq!(item.quantity, Quantity::Decimal(2.5));
    }

    #[test]
    fn unclassified_parse_is_empty() {
        let parsed = ParsedName::unclassified("что-то");
        assert!(!parsed.is_classified());
        assert!(parsed.params.is_empty());
        assert_eq!(parsed.original_text, "что-то");
    }
}
