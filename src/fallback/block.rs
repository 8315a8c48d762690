//! Structural block parser.
//!
//! Looks for a nomenclature section laid out one cell per line, as e-mail
//! clients produce when a table is pasted as plain text:
//!
//! ```text
//! Номенклатура
//! Ед.изм.
//! Кол-во по спец.
//! Тройник 57x3.5 ст20
//! шт
//! 10
//! С уважением, ...
//! ```

use tracing::{debug, warn};

use crate::types::{LineItem, Quantity};

/// Tokens that delimit and label a nomenclature block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    /// Section headers; the block starts at the earliest one found.
    pub headers: Vec<String>,
    /// Signature markers; the block ends at the earliest one after the start.
    pub end_markers: Vec<String>,
    /// Leading lines dropped when they equal one of these exactly.
    pub column_labels: Vec<String>,
}

impl Default for BlockLayout {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            headers: owned(&["Номенклатура", "Nomenclature"]),
            end_markers: owned(&["С уважением", "Best regards"]),
            column_labels: owned(&["Номенклатура", "Nomenclature", "Ед.изм.", "Кол-во по спец."]),
        }
    }
}

/// Cells per product: name, unit, quantity.
const GROUP: usize = 3;

/// Parse the nomenclature block of `text`, if there is one.
pub fn parse_block(text: &str, layout: &BlockLayout) -> Vec<LineItem> {
    let Some(start) = earliest(text, &layout.headers) else {
        return Vec::new();
    };
    let block = &text[start..];
    let block = match earliest(block, &layout.end_markers) {
        Some(end) => &block[..end],
        None => block,
    };

    let lines: Vec<&str> = block
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .skip_while(|l| layout.column_labels.iter().any(|label| label == l))
        .collect();
    if lines.is_empty() {
        return Vec::new();
    }
    if lines.len() % GROUP != 0 {
        warn!(
            lines = lines.len(),
            dropped = lines.len() % GROUP,
            "Nomenclature block is not a multiple of three lines; trailing lines dropped"
        );
    }

    lines
        .chunks_exact(GROUP)
        .map(|cells| {
            let (name, quantity) = (cells[0], cells[2]);
            let quantity = Quantity::parse(quantity).unwrap_or_else(|| {
                warn!(name, quantity, "Unreadable quantity, using 1");
                Quantity::default()
            });
            debug!(name, %quantity, "Block item");
            LineItem::new(name, quantity)
        })
        .collect()
}

/// Byte offset of the earliest occurrence of any needle.
fn earliest(haystack: &str, needles: &[String]) -> Option<usize> {
    needles
        .iter()
        .filter(|n| !n.is_empty())
        .filter_map(|n| haystack.find(n.as_str()))
        .min()
}
