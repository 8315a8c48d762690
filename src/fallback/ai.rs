//! AI-assisted extraction, the last resort of the fallback chain.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::types::{LineItem, Quantity};

/// Max tokens for the extraction call.
const EXTRACT_MAX_TOKENS: u32 = 1500;

const EXTRACT_TEMPERATURE: f32 = 0.0;

fn build_system_prompt() -> String {
    "Ты извлекаешь список заказанных товаров из текста делового письма.\n\
     Верни только JSON-массив объектов с полями:\n\
     - \"name\": наименование товара, как в письме;\n\
     - \"code\": пустая строка;\n\
     - \"quantity\": количество числом (1, если не указано);\n\
     - \"sum\": 0.0.\n\
     Пример: [{\"name\": \"Тройник 57x3.5 ст20\", \"code\": \"\", \"quantity\": 10, \"sum\": 0.0}]\n\
     Если товаров нет, верни []. Не оборачивай ответ в markdown."
        .to_string()
}

fn build_user_prompt(text: &str) -> String {
    format!("Текст письма:\n{text}")
}

/// Ask the model for line items. Any failure is logged and yields nothing.
pub async fn extract_with_llm(llm: &dyn LlmProvider, text: &str) -> Vec<LineItem> {
    match request_items(llm, text).await {
        Ok(items) => {
            info!(model = llm.model_name(), count = items.len(), "AI extraction finished");
            items
        }
        Err(e) => {
            error!(model = llm.model_name(), error = %e, "AI extraction failed");
            Vec::new()
        }
    }
}

async fn request_items(llm: &dyn LlmProvider, text: &str) -> Result<Vec<LineItem>, LlmError> {
    let request = CompletionRequest::new(vec![
        ChatMessage::system(build_system_prompt()),
        ChatMessage::user(build_user_prompt(text)),
    ])
    .with_temperature(EXTRACT_TEMPERATURE)
    .with_max_tokens(EXTRACT_MAX_TOKENS);

    let response = llm.complete(request).await?;
    let preview: String = response.content.chars().take(300).collect();
    debug!(response = %preview, "AI extraction raw response");
    parse_items(&response.content)
}

// ── Response parsing ────────────────────────────────────────────────

/// Parse a model reply into line items.
///
/// A reply that is valid JSON but not an array yields no items. Elements
/// that aren't objects are skipped; missing or malformed fields default.
fn parse_items(raw: &str) -> Result<Vec<LineItem>, LlmError> {
    let json = extract_json_array(raw);
    let value: Value = serde_json::from_str(&json)?;
    let Value::Array(elements) = value else {
        warn!("AI reply is JSON but not an array");
        return Ok(Vec::new());
    };
    Ok(elements
        .into_iter()
        .filter_map(|element| match serde_json::from_value::<LenientItem>(element) {
            Ok(item) => Some(item.into()),
            Err(e) => {
                warn!(error = %e, "Skipping malformed AI item");
                None
            }
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct LenientItem {
    #[serde(default)]
    name: Value,
    #[serde(default)]
    code: Value,
    #[serde(default)]
    quantity: Value,
    #[serde(default)]
    sum: Value,
}

impl From<LenientItem> for LineItem {
    fn from(item: LenientItem) -> Self {
        let text = |v: Value| match v {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        };
        let quantity = match &item.quantity {
            Value::Number(n) => n
                .as_i64()
                .map(Quantity::Integer)
                .or_else(|| n.as_f64().map(Quantity::Decimal)),
            Value::String(s) => Quantity::parse(s),
            _ => None,
        }
        .unwrap_or_default();
        let sum = match &item.sum {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().replace(',', ".").parse().unwrap_or(0.0),
            _ => 0.0,
        };
        LineItem {
            name: text(item.name),
            code: text(item.code),
            quantity,
            sum,
        }
    }
}

/// Extract a JSON array from model output (handles markdown wrapping).
fn extract_json_array(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('[') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('['), trimmed.rfind(']'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::llm::provider::CompletionResponse;

    /// Mock LLM that returns a fixed reply and records the prompt.
    struct MockExtractLlm {
        reply: Result<String, ()>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl MockExtractLlm {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for MockExtractLlm {
        fn model_name(&self) -> &str {
            "mock-extract"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.seen.lock().unwrap().push(request);
            match &self.reply {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    input_tokens: 100,
                    output_tokens: 20,
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "mock".into(),
                    reason: "connection refused".into(),
                }),
            }
        }
    }

    #[test]
    fn strips_json_fence() {
        assert_eq!(extract_json_array("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(extract_json_array("```\n[]\n```"), "[]");
        assert_eq!(extract_json_array("Вот список: [{\"name\": \"a\"}]."), "[{\"name\": \"a\"}]");
    }

    #[test]
    fn missing_fields_default() {
        let items = parse_items(r#"[{"name": "Отвод 90"}]"#).unwrap();
        assert_eq!(items, vec![LineItem::new("Отвод 90", Quantity::Integer(1))]);
    }

    #[test]
    fn string_numbers_are_accepted() {
        let items = parse_items(r#"[{"name": "Фланец", "quantity": "2,5", "sum": "10.5"}]"#).unwrap();
        assert_eq!(items[0].quantity, Quantity::Decimal(2.5));
        assert_eq!(items[0].sum, 10.5);
    }

    #[test]
    fn non_array_reply_yields_nothing() {
        assert!(parse_items(r#"{"name": "Отвод"}"#).unwrap().is_empty());
    }

    #[test]
    fn non_object_elements_are_skipped() {
        let items = parse_items(r#"["junk", {"name": "Тройник", "quantity": 4}]"#).unwrap();
        assert_eq!(items, vec![LineItem::new("Тройник", Quantity::Integer(4))]);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(parse_items("не json"), Err(LlmError::Json(_))));
    }

    #[tokio::test]
    async fn fenced_reply_is_parsed() {
        let llm = MockExtractLlm::replying(
            "```json\n[{\"name\": \"Тройник 57x3.5 ст20\", \"code\": \"\", \"quantity\": 10, \"sum\": 0.0}]\n```",
        );
        let items = extract_with_llm(&llm, "письмо").await;
        assert_eq!(
            items,
            vec![LineItem::new("Тройник 57x3.5 ст20", Quantity::Integer(10))]
        );

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen[0].temperature, Some(0.0));
        assert_eq!(seen[0].max_tokens, Some(EXTRACT_MAX_TOKENS));
        assert!(seen[0].messages[1].content.contains("письмо"));
    }

    #[tokio::test]
    async fn long_email_is_sent_whole() {
        let llm = MockExtractLlm::replying("[]");
        let mut text = "Строка переписки без товаров.\n".repeat(600);
        text.push_str("Отвод 90 57x3.5 ст20 - 4 шт");
        extract_with_llm(&llm, &text).await;

        let seen = llm.seen.lock().unwrap();
        assert!(seen[0].messages[1].content.len() > text.len());
        assert!(seen[0].messages[1].content.ends_with("Отвод 90 57x3.5 ст20 - 4 шт"));
    }

    #[tokio::test]
    async fn provider_error_yields_nothing() {
        let llm = MockExtractLlm::failing();
        assert!(extract_with_llm(&llm, "письмо").await.is_empty());
    }

    #[tokio::test]
    async fn garbage_reply_yields_nothing() {
        let llm = MockExtractLlm::replying("Извините, не могу помочь.");
        assert!(extract_with_llm(&llm, "письмо").await.is_empty());
    }
}
