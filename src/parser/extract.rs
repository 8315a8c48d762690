//! Attribute extraction: regex rules, then dictionary literals, then defaults.
//!
//! Each phase receives the [`Extraction`] produced by the previous one and
//! only looks at attributes that are still unfilled. Whatever text a phase
//! claims is blanked out of the working text, so a token feeds at most one
//! attribute.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use tracing::{trace, warn};

use super::text::WorkingText;
use super::MATERIAL_ATTRIBUTE;
use crate::reference::{AttributeRule, MaterialAliasTable, ReferenceTables};

/// Whether steel grade aliases take part in extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MaterialPolicy {
    /// Grade names are matched only through the attribute spec dictionary.
    #[default]
    Ignore,
    /// Alias spellings are recognized and rewritten to the canonical grade.
    Normalize,
}

impl FromStr for MaterialPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "normalize" => Ok(Self::Normalize),
            other => Err(format!("expected 'ignore' or 'normalize', got '{other}'")),
        }
    }
}

/// Working text plus everything found so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: WorkingText,
    pub params: BTreeMap<String, String>,
}

impl Extraction {
    pub fn new(text: WorkingText) -> Self {
        Self {
            text,
            params: BTreeMap::new(),
        }
    }

    fn is_filled(&self, attribute: &str) -> bool {
        self.params.contains_key(attribute)
    }
}

/// A literal with its precompiled whole-word matcher.
#[derive(Debug, Clone)]
struct Literal {
    value: String,
    regex: Regex,
}

/// Dictionary data for one attribute.
#[derive(Debug, Clone)]
struct DictionaryAttribute {
    attribute: String,
    /// Longest first.
    literals: Vec<Literal>,
    default: Option<String>,
}

/// Dictionary data for one type.
#[derive(Debug, Clone)]
struct TypeDictionary {
    item_type: String,
    /// Document order, used by the default phase.
    attributes: Vec<DictionaryAttribute>,
    /// Indices into `attributes`, longest attribute name first.
    search_order: Vec<usize>,
}

/// Fills attribute values for an already classified line.
#[derive(Debug, Clone)]
pub struct AttributeExtractor {
    tables: Arc<ReferenceTables>,
    dictionaries: Vec<TypeDictionary>,
    /// `(canonical grade, alias matcher)`, longest alias first.
    material_aliases: Vec<(String, Literal)>,
    policy: MaterialPolicy,
}

impl AttributeExtractor {
    pub fn new(tables: Arc<ReferenceTables>, policy: MaterialPolicy) -> Self {
        let dictionaries = tables
            .specs
            .iter()
            .map(|t| {
                let attributes: Vec<DictionaryAttribute> = t
                    .attributes
                    .iter()
                    .map(|spec| {
                        let mut values: Vec<&String> = spec.values.iter().collect();
                        values.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
                        DictionaryAttribute {
                            attribute: spec.attribute.clone(),
                            literals: values.into_iter().filter_map(|v| literal(v)).collect(),
                            default: spec.default.clone(),
                        }
                    })
                    .collect();
                let mut search_order: Vec<usize> = (0..attributes.len()).collect();
                search_order.sort_by(|&a, &b| {
                    let len = |i: usize| attributes[i].attribute.chars().count();
                    len(b).cmp(&len(a))
                });
                TypeDictionary {
                    item_type: t.item_type.clone(),
                    attributes,
                    search_order,
                }
            })
            .collect();

        let material_aliases = compile_aliases(&tables.materials);

        Self {
            tables,
            dictionaries,
            material_aliases,
            policy,
        }
    }

    /// Run every phase for `item_type` over the classifier's residual text.
    pub fn extract(&self, item_type: &str, residual: WorkingText) -> BTreeMap<String, String> {
        let state = Extraction::new(residual);
        let state = regex_phase(self.tables.rules.for_type(item_type), state);
        trace!(remaining = %state.text, "After regex phase");

        let dictionary = self.dictionaries.iter().find(|d| d.item_type == item_type);
        let state = match dictionary {
            Some(d) => dictionary_phase(d, state),
            None => state,
        };

        let state = if self.policy == MaterialPolicy::Normalize
            && self.declares_material(item_type, dictionary)
        {
            material_phase(&self.material_aliases, &self.tables.materials, state)
        } else {
            state
        };

        let state = match dictionary {
            Some(d) => default_phase(d, state),
            None => state,
        };
        state.params
    }

    fn declares_material(&self, item_type: &str, dictionary: Option<&TypeDictionary>) -> bool {
        dictionary.is_some_and(|d| d.attributes.iter().any(|a| a.attribute == MATERIAL_ATTRIBUTE))
            || self
                .tables
                .rules
                .for_type(item_type)
                .iter()
                .any(|r| r.attribute == MATERIAL_ATTRIBUTE)
    }
}

fn literal(value: &str) -> Option<Literal> {
    let pattern = format!(r"\b{}\b", regex::escape(&value.to_lowercase()));
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(regex) => Some(Literal {
            value: value.to_string(),
            regex,
        }),
        Err(e) => {
            warn!(value, error = %e, "Skipping dictionary literal");
            None
        }
    }
}

fn compile_aliases(materials: &MaterialAliasTable) -> Vec<(String, Literal)> {
    materials
        .aliases_longest_first()
        .into_iter()
        .filter_map(|(alias, canonical)| literal(alias).map(|l| (canonical.to_string(), l)))
        .collect()
}

// ── Phases ──────────────────────────────────────────────────────────

/// Phase 1: first matching pattern per attribute, in rule order.
pub fn regex_phase(rules: &[AttributeRule], mut state: Extraction) -> Extraction {
    for rule in rules {
        if state.is_filled(&rule.attribute) {
            continue;
        }
        for pattern in &rule.patterns {
            let Some(caps) = pattern.captures(state.text.as_str()) else {
                continue;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let matched = whole.as_str().to_string();
            let range = whole.range();
            let value = capture_value(&caps, &matched);
            trace!(attribute = %rule.attribute, value = %value, "Regex rule matched");

            let next = match state.text.consume_first(&matched) {
                Some(next) => next,
                None => state.text.consume(range),
            };
            state.text = next;
            state.params.insert(rule.attribute.clone(), value);
            break;
        }
    }
    state
}

/// Join non-empty capture groups; `x` when the match itself used an `x`/`х`
/// separator, `-` otherwise. No groups means the whole match.
fn capture_value(caps: &regex::Captures<'_>, matched: &str) -> String {
    let groups: Vec<&str> = caps
        .iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .collect();
    let value = match groups.as_slice() {
        [] => matched.to_string(),
        [only] => only.to_string(),
        many => {
            let lowered = matched.to_lowercase();
            let separator = if lowered.contains('x') || lowered.contains('х') {
                "x"
            } else {
                "-"
            };
            many.join(separator)
        }
    };
    value.trim().to_string()
}

/// Phase 2: whole-word literals, longest attribute name then longest value
/// first.
fn dictionary_phase(dictionary: &TypeDictionary, mut state: Extraction) -> Extraction {
    for &index in &dictionary.search_order {
        let attr = &dictionary.attributes[index];
        if state.is_filled(&attr.attribute) {
            continue;
        }
        for literal in &attr.literals {
            if let Some(m) = literal.regex.find(state.text.as_str()) {
                trace!(attribute = %attr.attribute, value = %literal.value, "Dictionary value matched");
                state.text = state.text.consume(m.range());
                state.params.insert(attr.attribute.clone(), literal.value.clone());
                break;
            }
        }
    }
    state
}

/// Optional phase: canonicalize a found grade, or find one by alias.
fn material_phase(
    aliases: &[(String, Literal)],
    materials: &MaterialAliasTable,
    mut state: Extraction,
) -> Extraction {
    if let Some(found) = state.params.get(MATERIAL_ATTRIBUTE) {
        if let Some(canonical) = materials.canonicalize(found) {
            let canonical = canonical.to_string();
            state.params.insert(MATERIAL_ATTRIBUTE.to_string(), canonical);
        }
        return state;
    }
    for (canonical, alias) in aliases {
        if let Some(m) = alias.regex.find(state.text.as_str()) {
            trace!(alias = %alias.value, canonical = %canonical, "Material alias matched");
            state.text = state.text.consume(m.range());
            state.params.insert(MATERIAL_ATTRIBUTE.to_string(), canonical.clone());
            break;
        }
    }
    state
}

/// Phase 3: declared defaults for whatever is still missing.
fn default_phase(dictionary: &TypeDictionary, mut state: Extraction) -> Extraction {
    for attr in &dictionary.attributes {
        if state.is_filled(&attr.attribute) {
            continue;
        }
        if let Some(default) = &attr.default {
            trace!(attribute = %attr.attribute, value = %default, "Default applied");
            state.params.insert(attr.attribute.clone(), default.clone());
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{AttributeSpecTable, RegexRuleTable, SynonymTable};

    fn tables(rules: &str, specs: &str) -> Arc<ReferenceTables> {
        Arc::new(ReferenceTables::new(
            SynonymTable::default(),
            RegexRuleTable::compile(serde_json::from_str(rules).unwrap()).unwrap(),
            serde_json::from_str::<AttributeSpecTable>(specs).unwrap(),
            MaterialAliasTable::builtin(),
        ))
    }

    fn extract(t: &Arc<ReferenceTables>, item_type: &str, residual: &str) -> BTreeMap<String, String> {
        AttributeExtractor::new(Arc::clone(t), MaterialPolicy::Ignore)
            .extract(item_type, WorkingText::normalize(residual))
    }

    const TEE_RULES: &str = r#"{"tee": {"dimensions": ["(\\d+(?:\\.\\d+)?)\\s*[xх]\\s*(\\d+(?:\\.\\d+)?)"]}}"#;
    const TEE_SPECS: &str =
        r#"{"tee": {"material": {"values": ["ст20", "09г2с"], "default": "ст20"}}}"#;

    #[test]
    fn regex_groups_joined_with_x() {
        let t = tables(TEE_RULES, "{}");
        let params = extract(&t, "tee", "57x3.5 ст20");
        assert_eq!(params.get("dimensions").map(String::as_str), Some("57x3.5"));
    }

    #[test]
    fn cyrillic_x_normalizes_to_latin_separator() {
        let t = tables(TEE_RULES, "{}");
        let params = extract(&t, "tee", "57х3,5");
        assert_eq!(params.get("dimensions").map(String::as_str), Some("57x3.5"));
    }

    #[test]
    fn groups_without_x_join_with_dash() {
        let t = tables(r#"{"valve": {"dimensions": ["ду\\s*(\\d+)\\s*ру\\s*(\\d+)"]}}"#, "{}");
        let params = extract(&t, "valve", "ду 100 ру 16");
        assert_eq!(params.get("dimensions").map(String::as_str), Some("100-16"));
    }

    #[test]
    fn single_group_and_no_group() {
        let t = tables(
            r#"{"elbow": {"angle": ["(\\d+)\\s*°"], "standard": ["гост\\s*\\d+-\\d+"]}}"#,
            "{}",
        );
        let params = extract(&t, "elbow", "90° гост 17375-2001");
        assert_eq!(params.get("angle").map(String::as_str), Some("90"));
        assert_eq!(params.get("standard").map(String::as_str), Some("гост 17375-2001"));
    }

    #[test]
    fn optional_group_that_did_not_participate_is_skipped() {
        let t = tables(r#"{"pipe": {"dimensions": ["(\\d+)(?:x(\\d+))?"]}}"#, "{}");
        let params = extract(&t, "pipe", "108");
        assert_eq!(params.get("dimensions").map(String::as_str), Some("108"));
    }

    #[test]
    fn first_matching_pattern_wins() {
        let t = tables(r#"{"elbow": {"angle": ["(\\d+)\\s*град", "(\\d+)°"]}}"#, "{}");
        let params = extract(&t, "elbow", "45° 90 град");
        assert_eq!(params.get("angle").map(String::as_str), Some("90"));
    }

    #[test]
    fn dictionary_and_default_phases() {
        let t = tables(TEE_RULES, TEE_SPECS);
        assert_eq!(
            extract(&t, "tee", "57x3.5 09г2с").get("material").map(String::as_str),
            Some("09г2с")
        );
        assert_eq!(
            extract(&t, "tee", "57x3.5").get("material").map(String::as_str),
            Some("ст20")
        );
    }

    #[test]
    fn dictionary_prefers_longest_value() {
        let t = tables("{}", r#"{"flange": {"pn": {"values": ["100", "1000", "10"]}}}"#);
        let params = extract(&t, "flange", "фланец 1000");
        assert_eq!(params.get("pn").map(String::as_str), Some("1000"));
    }

    #[test]
    fn dictionary_requires_whole_word() {
        let t = tables("{}", r#"{"flange": {"pn": {"values": ["16"]}}}"#);
        assert!(extract(&t, "flange", "160").get("pn").is_none());
    }

    #[test]
    fn dictionary_keeps_declared_spelling() {
        let t = tables("{}", r#"{"flange": {"execution": {"values": ["B"]}}}"#);
        let params = extract(&t, "flange", "исп b");
        assert_eq!(params.get("execution").map(String::as_str), Some("B"));
    }

    #[test]
    fn regex_consumed_text_is_invisible_to_dictionary() {
        // "20" belongs to the dimensions token; the material dictionary must
        // not see it again.
        let t = tables(
            r#"{"reducer": {"dimensions": ["(\\d+)x(\\d+)"]}}"#,
            r#"{"reducer": {"material": {"values": ["20"]}}}"#,
        );
        let params = extract(&t, "reducer", "57x20");
        assert_eq!(params.get("dimensions").map(String::as_str), Some("57x20"));
        assert!(params.get("material").is_none());
    }

    #[test]
    fn one_token_feeds_one_attribute_within_dictionary_phase() {
        let t = tables(
            "{}",
            r#"{"flange": {"pressure": {"values": ["16"]}, "pn": {"values": ["16"]}}}"#,
        );
        let params = extract(&t, "flange", "16");
        // "pressure" is the longer name so it is searched first.
        assert_eq!(params.get("pressure").map(String::as_str), Some("16"));
        assert!(params.get("pn").is_none());
    }

    #[test]
    fn regex_value_is_not_overwritten_by_default() {
        let t = tables(
            r#"{"tee": {"material": ["(ст\\d+)"]}}"#,
            r#"{"tee": {"material": {"values": [], "default": "ст20"}}}"#,
        );
        let params = extract(&t, "tee", "ст45");
        assert_eq!(params.get("material").map(String::as_str), Some("ст45"));
    }

    #[test]
    fn type_without_tables_yields_nothing() {
        let t = tables("{}", "{}");
        assert!(extract(&t, "tee", "57x3.5").is_empty());
    }

    #[test]
    fn material_aliases_ignored_by_default() {
        let t = tables("{}", r#"{"tee": {"material": {"values": ["ст3"]}}}"#);
        assert!(extract(&t, "tee", "s235jr").get("material").is_none());
    }

    #[test]
    fn material_aliases_normalized_when_enabled() {
        let t = tables("{}", r#"{"tee": {"material": {"values": ["ст.20"], "default": "ст3"}}}"#);
        let extractor = AttributeExtractor::new(Arc::clone(&t), MaterialPolicy::Normalize);

        let found = extractor.extract("tee", WorkingText::normalize("s235jr"));
        assert_eq!(found.get("material").map(String::as_str), Some("ст3"));

        let rewritten = extractor.extract("tee", WorkingText::normalize("ст.20"));
        assert_eq!(rewritten.get("material").map(String::as_str), Some("ст20"));

        let defaulted = extractor.extract("tee", WorkingText::normalize("бронза"));
        assert_eq!(defaulted.get("material").map(String::as_str), Some("ст3"));
    }

    #[test]
    fn material_phase_skipped_for_types_without_material() {
        let t = tables("{}", r#"{"flange": {"pn": {"values": ["16"]}}}"#);
        let extractor = AttributeExtractor::new(Arc::clone(&t), MaterialPolicy::Normalize);
        let params = extractor.extract("flange", WorkingText::normalize("16 s235jr"));
        assert!(params.get("material").is_none());
    }

    #[test]
    fn material_policy_parses_case_insensitively() {
        assert_eq!("Normalize".parse(), Ok(MaterialPolicy::Normalize));
        assert_eq!(" IGNORE ".parse(), Ok(MaterialPolicy::Ignore));
        assert!("sometimes".parse::<MaterialPolicy>().is_err());
    }
}
