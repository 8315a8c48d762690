//! Steel grade aliases.
//!
//! Maps foreign and colloquial grade names (`s235jr`, `сталь 20`, `aisi321`)
//! onto the grade names the catalog uses.

use serde::Deserialize;

use super::ordered::OrderedMap;

/// Grades recognized when no alias document is configured.
const BUILTIN_ALIASES: &[(&str, &[&str])] = &[
    ("ст3", &["ст3", "ст.3", "сталь 3", "ст3сп", "ст3пс", "ст3кп", "s235jr", "s235", "st37-2", "q235", "a36"]),
    ("ст10", &["ст10", "сталь 10", "ст.10", "10кп", "10пс", "c10e", "ck10", "1010", "s10c"]),
    ("ст20", &["ст20", "сталь 20", "ст.20", "20кп", "20пс", "c22e", "ck22", "1020", "s20c"]),
    ("ст35", &["ст35", "сталь 35", "ст.35", "c35e", "ck35", "1035", "s35c"]),
    ("ст45", &["ст45", "сталь 45", "ст.45", "c45e", "ck45", "1045", "s45c"]),
    ("09г2с", &["09г2с", "09г2c", "09g2s", "s355j2", "s355", "st52-3", "q345", "16mn"]),
    ("17г1с", &["17г1с", "17гс", "17г1су", "s355j0", "s355", "st52-3"]),
    ("10г2", &["10г2"]),
    ("13хфа", &["13хфа", "13хф"]),
    ("40х", &["40х", "40cr", "5140", "scr440"]),
    ("30хгса", &["30хгса", "хромансиль", "30chgsa", "30hgsa"]),
    ("12х18н10т", &["12х18н10т", "12x18h10t", "08х18н10т", "aisi 321", "aisi321"]),
    ("aisi 304", &["aisi 304", "aisi304", "08х18н10"]),
    ("aisi 316", &["aisi 316", "aisi316", "08х17н13м2", "10х17н13м2"]),
];

/// Canonical grade → aliases (lowercased), in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "OrderedMap<Vec<String>>")]
pub struct MaterialAliasTable {
    grades: Vec<(String, Vec<String>)>,
}

impl From<OrderedMap<Vec<String>>> for MaterialAliasTable {
    fn from(doc: OrderedMap<Vec<String>>) -> Self {
        let grades = doc
            .into_inner()
            .into_iter()
            .map(|(canonical, aliases)| {
                (canonical, aliases.into_iter().map(|a| a.to_lowercase()).collect())
            })
            .collect();
        Self { grades }
    }
}

impl MaterialAliasTable {
    /// The built-in grade table.
    pub fn builtin() -> Self {
        let grades = BUILTIN_ALIASES
            .iter()
            .map(|(canonical, aliases)| {
                (canonical.to_string(), aliases.iter().map(|a| a.to_string()).collect())
            })
            .collect();
        Self { grades }
    }

    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }

    /// Canonical grade for a value that is a grade or one of its aliases.
    ///
    /// Grades are checked in table order, so an alias listed under two
    /// grades (`s355`) resolves to the first.
    pub fn canonicalize(&self, value: &str) -> Option<&str> {
        let needle = value.trim().to_lowercase();
        self.grades
            .iter()
            .find(|(canonical, aliases)| {
                canonical.to_lowercase() == needle || aliases.iter().any(|a| *a == needle)
            })
            .map(|(canonical, _)| canonical.as_str())
    }

    /// Every `(alias, canonical)` pair, longest alias first.
    ///
    /// Ties keep table order.
    pub fn aliases_longest_first(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .grades
            .iter()
            .flat_map(|(canonical, aliases)| {
                aliases.iter().map(move |a| (a.as_str(), canonical.as_str()))
            })
            .collect();
        pairs.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        pairs
    }
}
