//! Order resolver: ties the fallback chain, name parser and catalog
//! matcher together.
//!
//! Every input line yields exactly one output line. A line that can't be
//! resolved is passed through with an empty code and its own name; one bad
//! line never affects the others.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::error::ResolveError;
use crate::fallback::FallbackChain;
use crate::matcher::{CatalogMatcher, MatchOutcome};
use crate::parser::NameParser;
use crate::types::{LineItem, ResolvedLine};

/// Resolves order line items against the catalog.
pub struct OrderResolver {
    parser: NameParser,
    catalog: Catalog,
    fallback: FallbackChain,
}

impl OrderResolver {
    pub fn new(parser: NameParser, catalog: Catalog, fallback: FallbackChain) -> Self {
        Self {
            parser,
            catalog,
            fallback,
        }
    }

    pub fn parser(&self) -> &NameParser {
        &self.parser
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn matcher(&self) -> CatalogMatcher<'_> {
        CatalogMatcher::new(&self.parser, &self.catalog)
    }

    /// Resolve each item independently, in input order.
    pub fn resolve_lines(&self, items: &[LineItem]) -> Vec<ResolvedLine> {
        let count = items.len();
        info!(count, "Resolving order lines");

        let matcher = self.matcher();
        let lines: Vec<ResolvedLine> = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.resolve_line(&matcher, index, item).unwrap_or_else(|e| {
                    error!(index, error = %e, "Failed to resolve line, passing through");
                    ResolvedLine::unmatched(item, None)
                })
            })
            .collect();

        let matched = lines.iter().filter(|l| l.matched).count();
        info!(matched, total = count, "Order resolution complete");
        lines
    }

    /// Extract line items from raw text with the fallback chain, then resolve.
    pub async fn resolve_text(&self, raw: &str) -> Vec<ResolvedLine> {
        let items = self.fallback.extract_items(raw).await;
        self.resolve_lines(&items)
    }

    /// Resolve upstream items, falling back to raw text when there are none.
    pub async fn resolve_order(&self, items: Vec<LineItem>, raw: &str) -> Vec<ResolvedLine> {
        if items.is_empty() {
            self.resolve_text(raw).await
        } else {
            self.resolve_lines(&items)
        }
    }

    fn resolve_line(
        &self,
        matcher: &CatalogMatcher<'_>,
        index: usize,
        item: &LineItem,
    ) -> Result<ResolvedLine, ResolveError> {
        if item.name.trim().is_empty() {
            return Err(ResolveError::EmptyName { index });
        }

        let parsed = self.parser.parse(&item.name);
        let line = match matcher.match_parsed(&parsed) {
            MatchOutcome::Matched { entry, .. } => ResolvedLine {
                name: entry.full_name.clone(),
                code: entry.code.clone(),
                quantity: item.quantity,
                sum: item.sum,
                item_type: parsed.item_type,
                params: parsed.params,
                matched: true,
            },
            MatchOutcome::Missed(_) => ResolvedLine::unmatched(item, Some(&parsed)),
        };
        Ok(line)
    }
}

/// Resolved lines with a summary, as written by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub resolved_at: DateTime<Utc>,
    pub total: usize,
    pub matched: usize,
    pub lines: Vec<ResolvedLine>,
}

impl ResolutionReport {
    pub fn new(lines: Vec<ResolvedLine>) -> Self {
        Self {
            resolved_at: Utc::now(),
            total: lines.len(),
            matched: lines.iter().filter(|l| l.matched).count(),
            lines,
        }
    }
}
