//! Per-type attribute value dictionaries and defaults.

use serde::Deserialize;
use serde_json::Value;

use super::ordered::OrderedMap;

/// Raw `{"values": [...], "default": ...}` entry as written in the document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSpec {
    #[serde(default)]
    values: Vec<Value>,
    #[serde(default)]
    default: Option<Value>,
}

/// Allowed literals and optional default for one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    pub attribute: String,
    pub values: Vec<String>,
    pub default: Option<String>,
}

/// Attribute specs of one canonical type, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpecs {
    pub item_type: String,
    pub attributes: Vec<AttributeSpec>,
}

/// Canonical type → attribute → allowed values and default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "OrderedMap<OrderedMap<RawSpec>>")]
pub struct AttributeSpecTable {
    types: Vec<TypeSpecs>,
}

impl From<OrderedMap<OrderedMap<RawSpec>>> for AttributeSpecTable {
    fn from(doc: OrderedMap<OrderedMap<RawSpec>>) -> Self {
        let types = doc
            .into_inner()
            .into_iter()
            .map(|(item_type, attrs)| TypeSpecs {
                item_type,
                attributes: attrs
                    .into_inner()
                    .into_iter()
                    .map(|(attribute, raw)| AttributeSpec {
                        attribute,
                        values: raw.values.iter().filter_map(literal).collect(),
                        default: raw.default.as_ref().and_then(literal),
                    })
                    .collect(),
            })
            .collect();
        Self { types }
    }
}

/// Documents mix strings and numbers; both compare as text.
fn literal(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl AttributeSpecTable {
    pub fn new(types: Vec<TypeSpecs>) -> Self {
        Self { types }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeSpecs> {
        self.types.iter()
    }

    /// Specs for a type, empty when the type has none.
    pub fn for_type(&self, item_type: &str) -> &[AttributeSpec] {
        self.types
            .iter()
            .find(|t| t.item_type == item_type)
            .map(|t| t.attributes.as_slice())
            .unwrap_or(&[])
    }
}
