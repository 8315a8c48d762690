//! LLM integration for AI-assisted line extraction.
//!
//! The fallback chain only sees the [`LlmProvider`] trait; the YandexGPT
//! provider talks to the foundation-models completion API over `reqwest`.

pub mod provider;
pub mod yandex;

pub use provider::*;
pub use yandex::YandexGptProvider;
