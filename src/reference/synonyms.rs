//! Canonical product types and the surface words that name them.

use serde::Deserialize;

use super::ordered::OrderedMap;

/// Pseudo-type some synonym documents carry for free-text notes.
const COMMENT_TYPE: &str = "комментарий";

/// One canonical type with its synonyms, lowercased, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSynonyms {
    pub name: String,
    pub synonyms: Vec<String>,
}

/// Canonical type → ordered synonyms.
///
/// The first synonym of a type is its catalog keyword.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "OrderedMap<Vec<String>>")]
pub struct SynonymTable {
    types: Vec<TypeSynonyms>,
}

impl From<OrderedMap<Vec<String>>> for SynonymTable {
    fn from(doc: OrderedMap<Vec<String>>) -> Self {
        Self::new(doc.into_inner())
    }
}

impl SynonymTable {
    pub fn new<S: Into<String>>(entries: Vec<(S, Vec<S>)>) -> Self {
        let types = entries
            .into_iter()
            .map(|(name, synonyms)| TypeSynonyms {
                name: name.into(),
                synonyms: synonyms.into_iter().map(|s| s.into().to_lowercase()).collect(),
            })
            .collect();
        Self { types }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn contains(&self, item_type: &str) -> bool {
        self.get(item_type).is_some()
    }

    pub fn get(&self, item_type: &str) -> Option<&TypeSynonyms> {
        self.types.iter().find(|t| t.name == item_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeSynonyms> {
        self.types.iter()
    }

    /// Lowercased keyword used to pre-filter catalog names for a type.
    ///
    /// This is the type's first synonym; a type without synonyms falls back
    /// to its own name.
    pub fn keyword(&self, item_type: &str) -> String {
        self.get(item_type)
            .and_then(|t| t.synonyms.first().cloned())
            .unwrap_or_else(|| item_type.to_lowercase())
    }

    /// Types in the order the classifier scans them: longest type *name*
    /// first, ties in document order, comment pseudo-type excluded.
    pub fn classification_order(&self) -> Vec<&TypeSynonyms> {
        let mut ordered: Vec<&TypeSynonyms> = self
            .types
            .iter()
            .filter(|t| t.name.to_lowercase() != COMMENT_TYPE)
            .collect();
        ordered.sort_by(|a, b| b.name.chars().count().cmp(&a.name.chars().count()));
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_is_first_synonym_lowercased() {
        let table = SynonymTable::new(vec![("tee", vec!["Тройник", "tee"])]);
        assert_eq!(table.keyword("tee"), "тройник");
    }

    #[test]
    fn keyword_falls_back_to_type_name() {
        let table = SynonymTable::new(vec![("Flange", vec![])]);
        assert_eq!(table.keyword("Flange"), "flange");
        assert_eq!(table.keyword("unknown"), "unknown");
    }

    #[test]
    fn classification_order_sorts_by_type_name_length() {
        let table = SynonymTable::new(vec![
            ("tee", vec!["тройник"]),
            ("reducer", vec!["переход"]),
            ("cap", vec!["заглушка"]),
            ("elbow", vec!["отвод"]),
        ]);
        let names: Vec<&str> = table
            .classification_order()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        // Ties ("tee", "cap") keep document order.
        assert_eq!(names, vec!["reducer", "elbow", "tee", "cap"]);
    }

    #[test]
    fn classification_order_skips_comment_type() {
        let table = SynonymTable::new(vec![
            ("Комментарий", vec!["примечание"]),
            ("tee", vec!["тройник"]),
        ]);
        let order = table.classification_order();
        assert_eq!(order.len(), 1);
        assert_eq!(order[0].name, "tee");
    }

    #[test]
    fn deserializes_in_document_order() {
        let table: SynonymTable =
            serde_json::from_str(r#"{"tee": ["Тройник", "tee"], "cap": ["заглушка"]}"#).unwrap();
        let names: Vec<&str> = table.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["tee", "cap"]);
        assert_eq!(table.get("tee").unwrap().synonyms, vec!["тройник", "tee"]);
    }
}
