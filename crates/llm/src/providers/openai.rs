//! OpenAI-compatible chat completion provider.
//!
//! Serves both OpenAI and Groq, which exposes the same
//! `/v1/chat/completions` API under `https://api.groq.com/openai`.

use super::lines::lines;
use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use docqa_core::{AppError, AppResult};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    #[serde(default)]
    delta: ChatDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Client for OpenAI-compatible chat completion APIs.
pub struct OpenAiCompatClient {
    provider: String,
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a client for a named provider at a base URL.
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl AsRef<str>,
    ) -> Self {
        Self {
            provider: provider.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_header: format!("Bearer {}", api_key.as_ref()),
            client: reqwest::Client::new(),
        }
    }

    /// Groq client at its default endpoint.
    pub fn groq(api_key: impl AsRef<str>) -> Self {
        Self::new("groq", DEFAULT_GROQ_BASE_URL, api_key)
    }

    /// OpenAI client at its default endpoint.
    pub fn openai(api_key: impl AsRef<str>) -> Self {
        Self::new("openai", DEFAULT_OPENAI_BASE_URL, api_key)
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request<'a>(&self, request: &'a LlmRequest, stream: bool) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn post(&self, body: &ChatRequest<'_>) -> AppResult<reqwest::Response> {
        let response = self
            .client
            .post(self.chat_completions_url())
            .header("Authorization", &self.auth_header)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AppError::Llm(format!("Failed to send request to {}: {}", self.provider, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "{} API error ({}): {}",
                self.provider, status, error_text
            )));
        }

        Ok(response)
    }
}

/// Parse one SSE line of a streaming chat completion.
///
/// Returns `None` for lines that carry nothing (comments, role-only deltas).
fn parse_sse_line(line: &str, model: &str) -> Option<AppResult<LlmStreamChunk>> {
    let data = line.strip_prefix("data:")?.trim();

    if data == "[DONE]" {
        return Some(Ok(LlmStreamChunk::finished(model, None)));
    }

    let chunk: ChatStreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => return Some(Err(AppError::Llm(format!("Failed to parse chunk: {}", e)))),
    };

    let model = chunk.model.unwrap_or_else(|| model.to_string());
    let choice = chunk.choices.into_iter().next()?;

    choice
        .delta
        .content
        .filter(|content| !content.is_empty())
        .map(|content| Ok(LlmStreamChunk::delta(content, model)))
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(provider = %self.provider, model = %request.model, "Sending chat completion");

        let body = self.build_request(request, false);
        let response = self.post(&body).await?;

        let chat: ChatResponse = response.json().await.map_err(|e| {
            AppError::Llm(format!("Failed to parse {} response: {}", self.provider, e))
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::Llm(format!("No choices in {} response", self.provider)))?;

        let usage = chat
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: if chat.model.is_empty() {
                request.model.clone()
            } else {
                chat.model
            },
            usage,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::debug!(provider = %self.provider, model = %request.model, "Starting streaming chat completion");

        let body = self.build_request(request, true);
        let response = self.post(&body).await?;

        let model = request.model.clone();
        let stream = lines(response.bytes_stream()).filter_map(move |line| {
            let parsed = match line {
                Ok(line) => parse_sse_line(&line, &model),
                Err(e) => Some(Err(e)),
            };
            futures::future::ready(parsed)
        });

        Ok(Box::pin(stream))
    }
}
