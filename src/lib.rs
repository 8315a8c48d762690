//! Order Resolver: matches free-text order lines to a product catalog.

pub mod catalog;
pub mod config;
pub mod error;
pub mod fallback;
pub mod llm;
pub mod logging;
pub mod matcher;
pub mod parser;
pub mod reference;
pub mod resolve;
pub mod types;
