//! The working copy of a line that parsing phases consume.

use std::fmt;
use std::ops::Range;

/// Normalized line text with already-claimed spans blanked out.
///
/// Every consuming operation returns a new value; a span that one attribute
/// claimed is replaced by a single space so no later attribute or phase can
/// match it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingText {
    text: String,
}

impl WorkingText {
    /// Lowercase, turn decimal commas into points, and pad with one space on
    /// each side so whole-word checks work at the edges.
    pub fn normalize(raw: &str) -> Self {
        Self {
            text: format!(" {} ", raw.to_lowercase().replace(',', ".")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Blank out a byte range.
    pub fn consume(&self, range: Range<usize>) -> Self {
        let mut text = String::with_capacity(self.text.len());
        text.push_str(&self.text[..range.start]);
        text.push(' ');
        text.push_str(&self.text[range.end..]);
        Self { text }
    }

    /// Blank out the first occurrence of `needle`, if any.
    pub fn consume_first(&self, needle: &str) -> Option<Self> {
        if needle.is_empty() {
            return None;
        }
        self.text
            .find(needle)
            .map(|start| self.consume(start..start + needle.len()))
    }

    /// What is left, trimmed, for logging.
    pub fn remaining(&self) -> &str {
        self.text.trim()
    }
}

impl fmt::Display for WorkingText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.remaining())
    }
}
