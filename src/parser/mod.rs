//! Name parsing: classify a line's type, then extract its attributes.
//!
//! The same [`NameParser`] interprets both order lines and catalog entry
//! names, so both sides of a catalog comparison are normalized identically.

pub mod classify;
pub mod extract;
pub mod text;

pub use classify::{Classification, TypeClassifier};
pub use extract::{AttributeExtractor, Extraction, MaterialPolicy};
pub use text::WorkingText;

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::reference::ReferenceTables;
use crate::types::ParsedName;

/// Attribute compared exactly before any scoring.
pub const DIMENSIONS_ATTRIBUTE: &str = "dimensions";

/// Attribute the material alias table applies to.
pub const MATERIAL_ATTRIBUTE: &str = "material";

/// Turns free text into a [`ParsedName`].
#[derive(Debug, Clone)]
pub struct NameParser {
    tables: Arc<ReferenceTables>,
    classifier: TypeClassifier,
    extractor: AttributeExtractor,
}

impl NameParser {
    pub fn new(tables: Arc<ReferenceTables>) -> Self {
        Self::with_material_policy(tables, MaterialPolicy::default())
    }

    pub fn with_material_policy(tables: Arc<ReferenceTables>, policy: MaterialPolicy) -> Self {
        Self {
            classifier: TypeClassifier::new(&tables.synonyms),
            extractor: AttributeExtractor::new(Arc::clone(&tables), policy),
            tables,
        }
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    /// Parse an order line. Logs the outcome.
    pub fn parse(&self, raw: &str) -> ParsedName {
        let parsed = self.parse_quiet(raw);
        match &parsed.item_type {
            Some(item_type) => debug!(
                line = %raw,
                item_type = %item_type,
                params = ?parsed.params,
                "Parsed line"
            ),
            None => warn!(line = %raw, "Could not determine product type"),
        }
        parsed
    }

    /// Parse without logging above `trace`. Used for catalog names.
    pub fn parse_quiet(&self, raw: &str) -> ParsedName {
        let Classification {
            item_type,
            residual,
        } = self.classifier.classify(raw);

        let Some(item_type) = item_type else {
            return ParsedName::unclassified(raw);
        };
        trace!(item_type = %item_type, remaining = %residual, "Classified");

        let params = self.extractor.extract(&item_type, residual);
        ParsedName {
            original_text: raw.to_string(),
            item_type: Some(item_type),
            params,
        }
    }
}
