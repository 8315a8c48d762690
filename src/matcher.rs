//! Catalog matching: type keyword filter, strict dimension filter, scoring.
//!
//! Precision over recall. A line whose type can't be determined, whose type
//! has no catalog entries, or whose dimensions match no entry exactly gets
//! no match at all rather than a low-confidence one.

use std::fmt;

use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::parser::{NameParser, DIMENSIONS_ATTRIBUTE};
use crate::types::ParsedName;

/// Why a line got no catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// No product type could be determined for the line.
    Unclassified,
    /// No catalog name contains the type's keyword.
    NoTypeCandidates { keyword: String },
    /// Candidates exist for the type, none with these exact dimensions.
    DimensionMismatch { dimensions: String },
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unclassified => write!(f, "product type unknown"),
            Self::NoTypeCandidates { keyword } => {
                write!(f, "no catalog entries contain '{keyword}'")
            }
            Self::DimensionMismatch { dimensions } => {
                write!(f, "no catalog entry has dimensions '{dimensions}'")
            }
        }
    }
}

/// Outcome of matching one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome<'a> {
    Matched {
        entry: &'a CatalogEntry,
        /// Number of non-dimension attributes that agreed.
        score: usize,
    },
    Missed(MissReason),
}

impl<'a> MatchOutcome<'a> {
    pub fn entry(&self) -> Option<&'a CatalogEntry> {
        match self {
            Self::Matched { entry, .. } => Some(entry),
            Self::Missed(_) => None,
        }
    }
}

/// Finds the best catalog entry for an order line.
#[derive(Debug, Clone)]
pub struct CatalogMatcher<'a> {
    parser: &'a NameParser,
    catalog: &'a Catalog,
}

impl<'a> CatalogMatcher<'a> {
    pub fn new(parser: &'a NameParser, catalog: &'a Catalog) -> Self {
        Self { parser, catalog }
    }

    /// Best entry for a free-text order line, or `None`.
    pub fn find_best_match(&self, order_line: &str) -> Option<&'a CatalogEntry> {
        let parsed = self.parser.parse(order_line);
        self.match_parsed(&parsed).entry()
    }

    /// Match an already parsed order line.
    pub fn match_parsed(&self, parsed: &ParsedName) -> MatchOutcome<'a> {
        let outcome = self.select(parsed);
        match &outcome {
            MatchOutcome::Matched { entry, score } => info!(
                line = %parsed.original_text,
                code = %entry.code,
                full_name = %entry.full_name,
                score,
                "Catalog match found"
            ),
            MatchOutcome::Missed(reason) => warn!(
                line = %parsed.original_text,
                reason = %reason,
                "No catalog match"
            ),
        }
        outcome
    }

    fn select(&self, parsed: &ParsedName) -> MatchOutcome<'a> {
        let Some(item_type) = parsed.item_type.as_deref() else {
            return MatchOutcome::Missed(MissReason::Unclassified);
        };

        // 1. Keyword filter on the raw catalog name.
        let keyword = self.parser.tables().synonyms.keyword(item_type);
        let mut candidates: Vec<(&'a CatalogEntry, &'a ParsedName)> = self
            .catalog
            .iter()
            .filter(|(entry, _)| entry.full_name.to_lowercase().contains(&keyword))
            .collect();
        if candidates.is_empty() {
            return MatchOutcome::Missed(MissReason::NoTypeCandidates { keyword });
        }
        debug!(item_type, count = candidates.len(), "Candidates by type keyword");

        // 2. Exact dimensions, when the order names any.
        if let Some(dimensions) = parsed.param(DIMENSIONS_ATTRIBUTE) {
            candidates.retain(|(_, p)| p.param(DIMENSIONS_ATTRIBUTE) == Some(dimensions));
            if candidates.is_empty() {
                return MatchOutcome::Missed(MissReason::DimensionMismatch {
                    dimensions: dimensions.to_string(),
                });
            }
            debug!(dimensions, count = candidates.len(), "Candidates after dimension filter");
        }

        // 3. Score on the remaining attributes; ties keep the earlier entry.
        let mut best: Option<(&'a CatalogEntry, usize)> = None;
        for (entry, candidate) in candidates {
            let score = score(parsed, candidate);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((entry, score));
            }
        }

        match best {
            Some((entry, score)) => MatchOutcome::Matched { entry, score },
            // Unreachable with a non-empty candidate list.
            None => MatchOutcome::Missed(MissReason::NoTypeCandidates { keyword }),
        }
    }
}

/// Count of the order's non-dimension attributes the candidate agrees on.
fn score(order: &ParsedName, candidate: &ParsedName) -> usize {
    order
        .params
        .iter()
        .filter(|(key, _)| key.as_str() != DIMENSIONS_ATTRIBUTE)
        .filter(|(key, value)| candidate.params.get(*key) == Some(*value))
        .count()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::reference::{MaterialAliasTable, ReferenceTables, RegexRuleTable};

    fn parser() -> NameParser {
        let tables = ReferenceTables::new(
            serde_json::from_str(
                r#"{"tee": ["тройник", "tee"], "valve": ["задвижка"], "elbow": ["отвод"]}"#,
            )
            .unwrap(),
            RegexRuleTable::compile(
                serde_json::from_str(
                    r#"{"tee": {"dimensions": ["(\\d+(?:\\.\\d+)?)\\s*[xх]\\s*(\\d+(?:\\.\\d+)?)"]},
                        "valve": {"dimensions": ["(\\d+)\\s*-\\s*(\\d+)"]}}"#,
                )
                .unwrap(),
            )
            .unwrap(),
            serde_json::from_str(
                r#"{"tee": {"material": {"values": ["ст20", "09г2с"]}},
                    "elbow": {"angle": {"values": ["45", "90"]}, "material": {"values": ["ст20", "09г2с"]}}}"#,
            )
            .unwrap(),
            MaterialAliasTable::builtin(),
        );
        NameParser::new(Arc::new(tables))
    }

    fn catalog(parser: &NameParser, names: &[(&str, &str)]) -> Catalog {
        Catalog::new(
            names.iter().map(|(c, n)| CatalogEntry::new(*c, *n)).collect(),
            parser,
        )
    }

    #[test]
    fn material_point_decides_between_same_dimensions() {
        let p = parser();
        let c = catalog(
            &p,
            &[("2", "Тройник 57x3.5 09г2с"), ("1", "Тройник 57x3.5 ст20")],
        );
        let m = CatalogMatcher::new(&p, &c);
        assert_eq!(m.find_best_match("тройник 57x3.5 ст20").unwrap().code, "1");
    }

    #[test]
    fn dimension_mismatch_is_a_hard_miss() {
        let p = parser();
        let c = catalog(
            &p,
            &[("1", "Задвижка 50-16"), ("2", "Задвижка 100-10")],
        );
        let m = CatalogMatcher::new(&p, &c);
        let parsed = p.parse("задвижка 100-16");
        assert_eq!(
            m.match_parsed(&parsed),
            MatchOutcome::Missed(MissReason::DimensionMismatch {
                dimensions: "100-16".into()
            })
        );
        assert!(m.find_best_match("задвижка 100-16").is_none());
    }

    #[test]
    fn candidate_without_dimensions_never_matches_dimensioned_order() {
        let p = parser();
        let c = catalog(&p, &[("1", "Тройник ст20")]);
        let m = CatalogMatcher::new(&p, &c);
        assert!(m.find_best_match("тройник 57x3.5 ст20").is_none());
    }

    #[test]
    fn unclassified_line_misses() {
        let p = parser();
        let c = catalog(&p, &[("1", "Тройник 57x3.5 ст20")]);
        let m = CatalogMatcher::new(&p, &c);
        assert_eq!(
            m.match_parsed(&p.parse("болт м12")),
            MatchOutcome::Missed(MissReason::Unclassified)
        );
    }

    #[test]
    fn no_keyword_candidates_misses() {
        let p = parser();
        let c = catalog(&p, &[("1", "Отвод 90 ст20")]);
        let m = CatalogMatcher::new(&p, &c);
        assert_eq!(
            m.match_parsed(&p.parse("тройник 57x3.5")),
            MatchOutcome::Missed(MissReason::NoTypeCandidates {
                keyword: "тройник".into()
            })
        );
    }

    #[test]
    fn keyword_is_a_plain_substring_of_the_catalog_name() {
        // Classification of the catalog name isn't required to pass the
        // keyword filter; only the dimension filter consults the parse.
        let p = parser();
        let c = catalog(&p, &[("1", "Тройники разные")]);
        let m = CatalogMatcher::new(&p, &c);
        assert_eq!(m.find_best_match("tee ст20").unwrap().code, "1");
    }

    #[test]
    fn equal_scores_keep_first_catalog_entry() {
        let p = parser();
        let c = catalog(
            &p,
            &[
                ("first", "Отвод 90 ст20"),
                ("second", "Отвод 90 ст20 гост"),
            ],
        );
        let m = CatalogMatcher::new(&p, &c);
        let parsed = p.parse("отвод 90 ст20");
        assert_eq!(
            m.match_parsed(&parsed),
            MatchOutcome::Matched {
                entry: &c.entries()[0],
                score: 2
            }
        );
    }

    #[test]
    fn higher_score_replaces_earlier_entry() {
        let p = parser();
        let c = catalog(
            &p,
            &[("a", "Отвод 45 ст20"), ("b", "Отвод 90 ст20")],
        );
        let m = CatalogMatcher::new(&p, &c);
        assert_eq!(m.find_best_match("отвод 90 ст20").unwrap().code, "b");
    }

    #[test]
    fn zero_score_still_matches() {
        let p = parser();
        let c = catalog(&p, &[("1", "Тройник 57x3.5 09г2с")]);
        let m = CatalogMatcher::new(&p, &c);
        let parsed = p.parse("тройник 57x3.5 ст20");
        assert!(matches!(
            m.match_parsed(&parsed),
            MatchOutcome::Matched { score: 0, .. }
        ));
    }

    #[test]
    fn empty_catalog_misses() {
        let p = parser();
        let c = Catalog::default();
        let m = CatalogMatcher::new(&p, &c);
        assert!(m.find_best_match("тройник 57x3.5").is_none());
    }
}
