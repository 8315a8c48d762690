//! Product catalog snapshot.
//!
//! Loaded once at startup from a tab-separated export with a header row and
//! never refreshed while the process runs. Each entry's name is parsed once
//! when the [`Catalog`] is built; matching reads the cached result.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CatalogError;
use crate::parser::NameParser;
use crate::types::ParsedName;

/// Default header of the code column.
pub const DEFAULT_CODE_COLUMN: &str = "Код";

/// Default header of the full-name column.
pub const DEFAULT_NAME_COLUMN: &str = "Полное наименование";

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub code: String,
    pub full_name: String,
    /// Every other column, passed through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl CatalogEntry {
    pub fn new(code: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            full_name: full_name.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// Which header names hold the code and the full name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogColumns {
    pub code: String,
    pub name: String,
}

impl Default for CatalogColumns {
    fn default() -> Self {
        Self {
            code: DEFAULT_CODE_COLUMN.to_string(),
            name: DEFAULT_NAME_COLUMN.to_string(),
        }
    }
}

/// Read a tab-separated catalog file.
pub fn load_tsv(path: &Path, columns: &CatalogColumns) -> Result<Vec<CatalogEntry>, CatalogError> {
    let file = File::open(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = read_tsv(file, columns)?;
    info!(path = %path.display(), count = entries.len(), "Loaded catalog");
    Ok(entries)
}

/// Read tab-separated catalog rows from any reader.
///
/// Quoting is off: product names routinely contain `"` for inch sizes.
/// Short rows are allowed; missing cells read as empty.
pub fn read_tsv<R: Read>(reader: R, columns: &CatalogColumns) -> Result<Vec<CatalogEntry>, CatalogError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(CatalogError::Empty);
    }
    debug!(?headers, "Catalog headers");

    let position = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| CatalogError::MissingColumn {
                column: column.to_string(),
            })
    };
    let code_idx = position(&columns.code)?;
    let name_idx = position(&columns.name)?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cell = |i: usize| record.get(i).unwrap_or_default().to_string();
        let extra = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != code_idx && *i != name_idx)
            .filter_map(|(i, h)| record.get(i).map(|v| (h.clone(), v.to_string())))
            .collect();
        entries.push(CatalogEntry {
            code: cell(code_idx),
            full_name: cell(name_idx),
            extra,
        });
    }
    Ok(entries)
}

/// Catalog entries with their parsed names.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    parsed: Vec<ParsedName>,
}

impl Catalog {
    /// Parse every entry's name once with the same parser used for orders.
    pub fn new(entries: Vec<CatalogEntry>, parser: &NameParser) -> Self {
        let parsed: Vec<ParsedName> = entries
            .iter()
            .map(|e| parser.parse_quiet(&e.full_name))
            .collect();
        let classified = parsed.iter().filter(|p| p.is_classified()).count();
        info!(
            entries = entries.len(),
            classified,
            "Catalog indexed"
        );
        Self { entries, parsed }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries with their cached parse, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&CatalogEntry, &ParsedName)> {
        self.entries.iter().zip(self.parsed.iter())
    }
}
