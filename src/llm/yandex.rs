//! YandexGPT foundation-models completion over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{CompletionRequest, CompletionResponse, LlmProvider, Role};
use crate::error::LlmError;

const PROVIDER: &str = "yandexgpt";

/// Default completion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default token cap when a request sets none.
const DEFAULT_MAX_TOKENS: u32 = 2000;

// ── Wire format ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    model_uri: &'a str,
    completion_options: WireOptions,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireOptions {
    stream: bool,
    temperature: f32,
    /// Sent as a string, as the API documents it.
    max_tokens: String,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    result: WireResult,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    #[serde(default)]
    alternatives: Vec<WireAlternative>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireAlternative {
    message: WireReply,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUsage {
    #[serde(default)]
    input_text_tokens: Option<String>,
    #[serde(default)]
    completion_tokens: Option<String>,
}

// ── Provider ────────────────────────────────────────────────────────

/// YandexGPT provider authenticated with a service-account API key.
pub struct YandexGptProvider {
    client: reqwest::Client,
    endpoint: String,
    model_uri: String,
    api_key: SecretString,
}

impl YandexGptProvider {
    /// Every request, body read included, is bounded by `timeout`.
    pub fn new(
        endpoint: impl Into<String>,
        model_uri: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model_uri: model_uri.into(),
            api_key,
        })
    }
}

fn build_body<'a>(model_uri: &'a str, request: &'a CompletionRequest) -> WireRequest<'a> {
    WireRequest {
        model_uri,
        completion_options: WireOptions {
            stream: false,
            temperature: request.temperature.unwrap_or(0.0),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS).to_string(),
        },
        messages: request
            .messages
            .iter()
            .map(|m| WireMessage {
                role: m.role,
                text: &m.content,
            })
            .collect(),
    }
}

fn parse_body(body: &str) -> Result<CompletionResponse, LlmError> {
    let response: WireResponse =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("unexpected response structure: {e}"),
        })?;
    let tokens = |v: Option<String>| v.and_then(|s| s.parse().ok()).unwrap_or(0);
    let (input_tokens, output_tokens) = match response.result.usage {
        Some(u) => (tokens(u.input_text_tokens), tokens(u.completion_tokens)),
        None => (0, 0),
    };
    let content = response
        .result
        .alternatives
        .into_iter()
        .next()
        .map(|a| a.message.text)
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: "no alternatives in response".to_string(),
        })?;
    Ok(CompletionResponse {
        content,
        input_tokens,
        output_tokens,
    })
}

#[async_trait]
impl LlmProvider for YandexGptProvider {
    fn model_name(&self) -> &str {
        &self.model_uri
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = build_body(&self.model_uri, &request);
        debug!(endpoint = %self.endpoint, messages = body.messages.len(), "Sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("Api-Key {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("failed to read body: {e}"),
        })?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            });
        }
        if !status.is_success() {
            let preview: String = text.chars().take(500).collect();
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {status}: {preview}"),
            });
        }

        let completion = parse_body(&text)?;
        debug!(
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            "Completion received"
        );
        Ok(completion)
    }
}
