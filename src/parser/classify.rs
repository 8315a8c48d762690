//! Type classification by whole-word synonym lookup.

use tracing::trace;

use super::text::WorkingText;
use crate::reference::{SynonymTable, TypeSynonyms};

/// Result of classifying one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Canonical type, `None` when no synonym matched.
    pub item_type: Option<String>,
    /// Normalized text with the matched synonym removed.
    pub residual: WorkingText,
}

/// Maps a free-text line onto one canonical type.
///
/// Types are scanned longest type name first (not longest synonym); within a
/// type, synonyms are tried in table order. The first synonym found as a
/// whole word decides the type and is removed from the text.
#[derive(Debug, Clone)]
pub struct TypeClassifier {
    order: Vec<TypeSynonyms>,
}

impl TypeClassifier {
    pub fn new(synonyms: &SynonymTable) -> Self {
        Self {
            order: synonyms.classification_order().into_iter().cloned().collect(),
        }
    }

    pub fn classify(&self, raw: &str) -> Classification {
        let text = WorkingText::normalize(raw);

        for t in &self.order {
            for synonym in &t.synonyms {
                let padded = format!(" {synonym} ");
                if let Some(residual) = text.consume_first(&padded) {
                    trace!(item_type = %t.name, synonym = %synonym, "Synonym matched");
                    return Classification {
                        item_type: Some(t.name.clone()),
                        residual,
                    };
                }
            }
        }

        Classification {
            item_type: None,
            residual: text,
        }
    }
}
