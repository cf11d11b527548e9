//! Model Gateway: send an [`ExtractionRequest`] to a vision model, get text back.
//!
//! [`ModelGateway`] is the seam between the pipeline and the outside world.
//! Two implementations ship:
//!
//! * [`OpenAiGateway`]: talks to any OpenAI-compatible
//!   `/chat/completions` endpoint directly over `reqwest`. The API key is a
//!   constructor argument; nothing here reads the environment.
//! * [`ProviderGateway`]: adapts an `edgequake_llm` provider, so every
//!   backend the `ProviderFactory` knows (Anthropic, Gemini, Ollama, …)
//!   works unchanged.
//!
//! Gateways never retry. A failed call fails the request.

use crate::error::{ExtractError, GatewayError};
use crate::pipeline::request::ExtractionRequest;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Default base URL for [`OpenAiGateway`].
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Upstream error bodies are truncated to this many characters in errors.
const MAX_DETAIL_CHARS: usize = 500;

/// A vision-capable model that turns one request into raw answer text.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Short provider label used in logs and errors.
    fn name(&self) -> &str;

    /// Send `request` and return the model's raw answer.
    async fn complete(&self, request: &ExtractionRequest) -> Result<String, GatewayError>;
}

// ── OpenAI-compatible HTTP gateway ───────────────────────────────────────

/// Gateway for OpenAI and OpenAI-compatible chat-completions APIs.
#[derive(Clone)]
pub struct OpenAiGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl fmt::Debug for OpenAiGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiGateway")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OpenAiGateway {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Point at another OpenAI-compatible server (Azure proxy, vLLM, a mock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn body(request: &ExtractionRequest) -> serde_json::Value {
        let mut body = json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": request.parts() }],
            "max_tokens": request.max_tokens,
        });
        if let Some(t) = request.temperature {
            body["temperature"] = json!(t);
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &ExtractionRequest) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&Self::body(request))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = retry_after(response.headers());
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(self.name(), status, retry_after_secs, &detail));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("unreadable response body: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| GatewayError::EmptyAnswer {
                provider: self.name().to_string(),
            })?;

        debug!("{}: answer of {} chars", self.name(), content.len());
        Ok(content)
    }
}

fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Map a non-success HTTP status to a [`GatewayError`].
fn classify_status(
    provider: &str,
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: &str,
) -> GatewayError {
    let detail = truncate(body.trim(), MAX_DETAIL_CHARS);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Auth {
            provider: provider.to_string(),
            detail,
        },
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited {
            provider: provider.to_string(),
            retry_after_secs,
        },
        _ => GatewayError::Upstream {
            provider: provider.to_string(),
            status: status.as_u16(),
            detail,
        },
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\u{2026}", &s[..idx]),
        None => s.to_string(),
    }
}

// ── edgequake-llm provider gateway ───────────────────────────────────────

/// Gateway backed by an [`edgequake_llm::LLMProvider`].
///
/// The model is fixed when the provider is built; `ExtractionRequest::model`
/// is ignored here.
#[derive(Clone)]
pub struct ProviderGateway {
    name: String,
    provider: Arc<dyn LLMProvider>,
}

impl fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderGateway")
            .field("name", &self.name)
            .field("provider", &"<dyn LLMProvider>")
            .finish()
    }
}

impl ProviderGateway {
    pub fn new(name: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }

    /// Build a provider by name via [`ProviderFactory`], which reads that
    /// provider's own credential variable (`ANTHROPIC_API_KEY`, …).
    pub fn from_factory(provider_name: &str, model: &str) -> Result<Self, ExtractError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            ExtractError::InvalidConfig(format!(
                "LLM provider '{provider_name}' is not configured: {e}"
            ))
        })?;
        Ok(Self::new(provider_name, provider))
    }

    fn messages(request: &ExtractionRequest) -> Vec<ChatMessage> {
        let images = request
            .image()
            .and_then(|img| {
                img.data_parts().map(|(mime, payload)| {
                    let data = ImageData::new(payload.to_string(), mime.to_string());
                    match img.detail.as_deref() {
                        Some(d) => data.with_detail(d),
                        None => data,
                    }
                })
            })
            .into_iter()
            .collect::<Vec<_>>();
        vec![ChatMessage::user_with_images(request.instruction(), images)]
    }

    fn options(request: &ExtractionRequest) -> CompletionOptions {
        CompletionOptions {
            temperature: request.temperature,
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ModelGateway for ProviderGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ExtractionRequest) -> Result<String, GatewayError> {
        let messages = Self::messages(request);
        let options = Self::options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| classify_provider_error(&self.name, &e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.name, response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(GatewayError::EmptyAnswer {
                provider: self.name.clone(),
            });
        }
        Ok(response.content)
    }
}

/// Provider libraries only give us a message; recognise the common classes.
fn classify_provider_error(provider: &str, message: &str) -> GatewayError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
        || lower.contains("api key")
    {
        GatewayError::Auth {
            provider: provider.to_string(),
            detail: truncate(message, MAX_DETAIL_CHARS),
        }
    } else if lower.contains("429") || lower.contains("rate limit") {
        GatewayError::RateLimited {
            provider: provider.to_string(),
            retry_after_secs: None,
        }
    } else {
        GatewayError::Provider {
            provider: provider.to_string(),
            detail: truncate(message, MAX_DETAIL_CHARS),
        }
    }
}
