//! Per-type attribute regex rules.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use super::ordered::OrderedMap;
use crate::error::TableError;

/// Raw document shape: type → attribute → patterns.
pub type RegexRuleDocument = OrderedMap<OrderedMap<Vec<String>>>;

/// Ordered patterns for one attribute. The first pattern that matches wins.
#[derive(Debug, Clone)]
pub struct AttributeRule {
    pub attribute: String,
    pub patterns: Vec<Regex>,
}

/// Attribute rules for one canonical type, in document order.
#[derive(Debug, Clone)]
pub struct TypeRules {
    pub item_type: String,
    pub attributes: Vec<AttributeRule>,
}

/// A pattern the regex engine refused, kept for validation.
#[derive(Debug, Clone)]
pub struct RejectedPattern {
    pub item_type: String,
    pub attribute: String,
    pub pattern: String,
    pub source: regex::Error,
}

/// Canonical type → attribute → compiled case-insensitive patterns.
#[derive(Debug, Clone, Default)]
pub struct RegexRuleTable {
    types: Vec<TypeRules>,
    rejected: Vec<RejectedPattern>,
}

impl RegexRuleTable {
    /// Compile every pattern of a rule document, failing on the first one
    /// the regex engine rejects.
    pub fn compile(doc: RegexRuleDocument) -> Result<Self, TableError> {
        let mut table = Self::compile_lenient(doc);
        let rejected = std::mem::take(&mut table.rejected);
        match rejected.into_iter().next() {
            Some(r) => Err(TableError::InvalidPattern {
                item_type: r.item_type,
                attribute: r.attribute,
                source: r.source,
            }),
            None => Ok(table),
        }
    }

    /// Compile each pattern on its own. A rejected pattern is logged and
    /// skipped; the rest of its attribute and every other type stay usable.
    pub fn compile_lenient(doc: RegexRuleDocument) -> Self {
        let mut types = Vec::new();
        let mut rejected = Vec::new();
        for (item_type, attrs) in doc.into_inner() {
            let mut attributes = Vec::new();
            for (attribute, patterns) in attrs.into_inner() {
                let mut compiled = Vec::with_capacity(patterns.len());
                for pattern in patterns {
                    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                        Ok(regex) => compiled.push(regex),
                        Err(source) => {
                            warn!(
                                item_type = %item_type,
                                attribute = %attribute,
                                pattern = %pattern,
                                error = %source,
                                "Skipping regex rule"
                            );
                            rejected.push(RejectedPattern {
                                item_type: item_type.clone(),
                                attribute: attribute.clone(),
                                pattern,
                                source,
                            });
                        }
                    }
                }
                attributes.push(AttributeRule {
                    attribute,
                    patterns: compiled,
                });
            }
            types.push(TypeRules {
                item_type,
                attributes,
            });
        }
        Self { types, rejected }
    }

    /// Patterns skipped by [`RegexRuleTable::compile_lenient`].
    pub fn rejected(&self) -> &[RejectedPattern] {
        &self.rejected
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeRules> {
        self.types.iter()
    }

    /// Rules for a type, empty when the type has none.
    pub fn for_type(&self, item_type: &str) -> &[AttributeRule] {
        self.types
            .iter()
            .find(|t| t.item_type == item_type)
            .map(|t| t.attributes.as_slice())
            .unwrap_or(&[])
    }
}
