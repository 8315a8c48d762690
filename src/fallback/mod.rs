//! Line-item fallback chain.
//!
//! Used when upstream extraction produced no items. Strategies run in a
//! fixed order over the raw e-mail text; the first that yields anything wins.

pub mod ai;
pub mod block;
pub mod loose;

pub use block::BlockLayout;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::llm::provider::LlmProvider;
use crate::types::LineItem;

/// Order of the two local strategies. AI extraction always runs last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackOrder {
    #[default]
    BlockFirst,
    LooseFirst,
}

impl FromStr for FallbackOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block-first" | "block" => Ok(Self::BlockFirst),
            "loose-first" | "loose" => Ok(Self::LooseFirst),
            other => Err(format!("expected 'block-first' or 'loose-first', got '{other}'")),
        }
    }
}

/// One extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Block,
    Loose,
    Ai,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Block => "block",
            Self::Loose => "loose",
            Self::Ai => "ai",
        })
    }
}

impl FallbackOrder {
    /// Strategies in the order they are tried.
    pub fn strategies(self) -> [Strategy; 3] {
        match self {
            Self::BlockFirst => [Strategy::Block, Strategy::Loose, Strategy::Ai],
            Self::LooseFirst => [Strategy::Loose, Strategy::Block, Strategy::Ai],
        }
    }
}

/// Runs the strategies in order.
pub struct FallbackChain {
    order: FallbackOrder,
    layout: BlockLayout,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl FallbackChain {
    /// Chain without AI extraction.
    pub fn new(order: FallbackOrder) -> Self {
        Self {
            order,
            layout: BlockLayout::default(),
            llm: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_layout(mut self, layout: BlockLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn order(&self) -> FallbackOrder {
        self.order
    }

    /// Line items from raw text, or empty when every strategy came up dry.
    pub async fn extract_items(&self, raw: &str) -> Vec<LineItem> {
        for strategy in self.order.strategies() {
            let items = match strategy {
                Strategy::Block => block::parse_block(raw, &self.layout),
                Strategy::Loose => loose::parse_lines(raw),
                Strategy::Ai => match &self.llm {
                    Some(llm) => ai::extract_with_llm(llm.as_ref(), raw).await,
                    None => {
                        debug!("No LLM configured, skipping AI extraction");
                        continue;
                    }
                },
            };
            if !items.is_empty() {
                info!(strategy = %strategy, count = items.len(), "Line items extracted");
                return items;
            }
            debug!(strategy = %strategy, "Strategy found no items");
        }
        warn!("No line items found by any strategy");
        Vec::new()
    }
}
