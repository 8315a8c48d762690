//! Reference tables: synonyms, regex rules, attribute specs, material aliases.
//!
//! Loaded once at startup into an immutable [`ReferenceTables`] that the
//! parser, matcher and catalog share by `Arc`. Loading is lenient by default
//! (a broken document degrades to an empty table and is logged); call
//! [`ReferenceTables::validate`] to fail fast on inconsistent tables instead.

pub mod materials;
pub mod ordered;
pub mod rules;
pub mod specs;
pub mod synonyms;

pub use materials::MaterialAliasTable;
pub use rules::{AttributeRule, RegexRuleDocument, RegexRuleTable, RejectedPattern, TypeRules};
pub use specs::{AttributeSpec, AttributeSpecTable, TypeSpecs};
pub use synonyms::{SynonymTable, TypeSynonyms};

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{error, info};

use crate::error::TableError;

/// Locations of the reference documents.
#[derive(Debug, Clone)]
pub struct TablePaths {
    pub synonyms: PathBuf,
    pub regex: PathBuf,
    pub parameters: PathBuf,
    /// Optional override for the built-in material alias table.
    pub materials: Option<PathBuf>,
}

/// All reference data the resolver needs. Immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub synonyms: SynonymTable,
    pub rules: RegexRuleTable,
    pub specs: AttributeSpecTable,
    pub materials: MaterialAliasTable,
}

impl ReferenceTables {
    pub fn new(
        synonyms: SynonymTable,
        rules: RegexRuleTable,
        specs: AttributeSpecTable,
        materials: MaterialAliasTable,
    ) -> Self {
        Self {
            synonyms,
            rules,
            specs,
            materials,
        }
    }

    /// Load every document, failing on the first one that can't be read.
    pub fn load(paths: &TablePaths) -> Result<Self, TableError> {
        let synonyms: SynonymTable = load_document(&paths.synonyms, "synonyms")?;
        let rules = RegexRuleTable::compile(load_document(&paths.regex, "regex rules")?)?;
        let specs: AttributeSpecTable = load_document(&paths.parameters, "attribute specs")?;
        let materials = match &paths.materials {
            Some(path) => load_document(path, "material aliases")?,
            None => MaterialAliasTable::builtin(),
        };
        Ok(Self::new(synonyms, rules, specs, materials))
    }

    /// Load every document, substituting an empty table for each one that
    /// fails. Classification and extraction simply never succeed for data
    /// that is missing. A regex pattern the engine rejects drops only that
    /// pattern; [`ReferenceTables::validate`] still reports it.
    pub fn load_or_degrade(paths: &TablePaths) -> Self {
        let synonyms = load_document(&paths.synonyms, "synonyms").unwrap_or_else(degrade);
        let rules = load_document::<RegexRuleDocument>(&paths.regex, "regex rules")
            .map(RegexRuleTable::compile_lenient)
            .unwrap_or_else(degrade);
        let specs = load_document(&paths.parameters, "attribute specs").unwrap_or_else(degrade);
        let materials = match &paths.materials {
            Some(path) => load_document(path, "material aliases").unwrap_or_else(degrade),
            None => MaterialAliasTable::builtin(),
        };
        Self::new(synonyms, rules, specs, materials)
    }

    /// Cross-check the tables against each other.
    ///
    /// Reports every problem at once:
    /// - a type with rules or specs that the synonym table doesn't define
    /// - a type whose synonym list is empty
    /// - a spec attribute with no values, no default and no regex rule
    /// - a regex pattern that was skipped because it didn't compile
    pub fn validate(&self) -> Result<(), TableError> {
        let mut problems = Vec::new();

        for r in self.rules.rejected() {
            problems.push(format!(
                "regex rule for '{}.{}' doesn't compile: {}",
                r.item_type, r.attribute, r.pattern
            ));
        }

        for t in self.synonyms.iter() {
            if t.synonyms.is_empty() {
                problems.push(format!("type '{}' has no synonyms", t.name));
            }
        }

        for t in self.rules.iter() {
            if !self.synonyms.contains(&t.item_type) {
                problems.push(format!("regex rules reference unknown type '{}'", t.item_type));
            }
        }

        for t in self.specs.iter() {
            if !self.synonyms.contains(&t.item_type) {
                problems.push(format!(
                    "attribute specs reference unknown type '{}'",
                    t.item_type
                ));
            }
            let rules = self.rules.for_type(&t.item_type);
            for spec in &t.attributes {
                let has_rule = rules.iter().any(|r| r.attribute == spec.attribute);
                if spec.values.is_empty() && spec.default.is_none() && !has_rule {
                    problems.push(format!(
                        "attribute '{}.{}' can never be filled (no values, default or rule)",
                        t.item_type, spec.attribute
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(TableError::Inconsistent { problems })
        }
    }
}

fn degrade<T: Default>(e: TableError) -> T {
    error!(error = %e, "Reference table unavailable, using an empty table");
    T::default()
}

/// Read and decode one JSON reference document.
pub fn load_document<T: DeserializeOwned>(path: &Path, table: &'static str) -> Result<T, TableError> {
    let raw = std::fs::read_to_string(path).map_err(|source| TableError::Io {
        table,
        path: path.to_path_buf(),
        source,
    })?;
    let doc = serde_json::from_str(raw.trim_start_matches('\u{feff}')).map_err(|source| {
        TableError::Json {
            table,
            path: path.to_path_buf(),
            source,
        }
    })?;
    info!(table, path = %path.display(), "Loaded reference table");
    Ok(doc)
}
