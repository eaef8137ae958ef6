//! Completion client: bounded retry around a pluggable completion backend.
//!
//! All prompt engineering lives in [`crate::prompts`]; this module only
//! moves messages to a service and text back, with the retry policy in one
//! place.
//!
//! ## Retry Strategy
//!
//! Up to `max_attempts` tries (default 3) with a fixed `retry_delay_ms`
//! pause (default 5 s) between them. There is no jitter: requests are
//! strictly sequential, so there is no herd to spread out. When the last
//! attempt fails its error is returned unchanged and the call site applies
//! its own fallback.
//!
//! ## Backends
//!
//! * [`AzureOpenAiBackend`]: direct REST call to an Azure OpenAI deployment
//!   (endpoint, key and API version held in [`CompletionConfig`]).
//! * [`ProviderBackend`]: any edgequake-llm provider (OpenAI, Anthropic,
//!   Gemini, Ollama, …).
//!
//! Tests plug in scripted backends through the [`CompletionBackend`] trait.

use crate::config::CompletionConfig;
use crate::error::{CompletionError, ReportError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Author of one chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One `{role, content}` entry of a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling options sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestOptions {
    pub temperature: f32,
    pub max_tokens: Option<usize>,
}

/// A service that turns a message list into one completion.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short label for logs, e.g. `azure:gpt-4o`.
    fn name(&self) -> &str;

    /// Send one request. Must not retry; [`CompletionClient`] does that.
    async fn complete(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<String, CompletionError>;
}

/// The completion adapter shared by every pipeline stage.
///
/// Cheap to clone; the backend is reference-counted.
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
    options: RequestOptions,
    max_attempts: u32,
    retry_delay: Duration,
}

impl CompletionClient {
    /// Wrap `backend` with the retry policy and sampling options of `config`.
    pub fn new(backend: Arc<dyn CompletionBackend>, config: &CompletionConfig) -> Self {
        Self {
            backend,
            options: RequestOptions {
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            },
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Resolve a backend from `config` and wrap it.
    pub fn from_config(config: &CompletionConfig) -> Result<Self, ReportError> {
        let backend = resolve_backend(config)?;
        info!("Completion backend: {}", backend.name());
        Ok(Self::new(backend, config))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Send `messages`, retrying on any failure.
    ///
    /// Returns the trimmed completion text, or the last attempt's error once
    /// `max_attempts` tries have failed.
    pub async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError> {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.backend.complete(messages, &self.options).await {
                Ok(text) => {
                    debug!(
                        "Completion: {} chars in {:?} (attempt {}/{})",
                        text.len(),
                        start.elapsed(),
                        attempt,
                        self.max_attempts
                    );
                    return Ok(text.trim().to_string());
                }
                Err(e) => {
                    warn!(
                        "Completion attempt {}/{} failed: {}",
                        attempt, self.max_attempts, e
                    );
                    if attempt >= self.max_attempts {
                        return Err(e);
                    }
                    sleep(self.retry_delay).await;
                }
            }
        }
    }
}

// ── Azure OpenAI REST backend ────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Message],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Chat-completions call against one Azure OpenAI deployment.
pub struct AzureOpenAiBackend {
    http: reqwest::Client,
    url: String,
    api_key: String,
    label: String,
}

impl AzureOpenAiBackend {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        deployment: &str,
        api_version: &str,
        timeout_secs: u64,
    ) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            url: chat_completions_url(endpoint, deployment, api_version),
            api_key: api_key.into(),
            label: format!("azure:{deployment}"),
        })
    }
}

/// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={v}`
pub fn chat_completions_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        endpoint.trim_end_matches('/'),
        deployment,
        api_version
    )
}

#[async_trait]
impl CompletionBackend for AzureOpenAiBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<String, CompletionError> {
        let body = serde_json::to_vec(&ChatRequest {
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        })
        .map_err(|e| CompletionError::Transport(format!("request encoding: {e}")))?;

        let response = self
            .http
            .post(&self.url)
            .header("api-key", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body: String = text.chars().take(500).collect();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(CompletionError::EmptyCompletion)
    }
}

// ── edgequake-llm provider backend ───────────────────────────────────────

/// Adapter from an edgequake-llm provider to [`CompletionBackend`].
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

#[async_trait]
impl CompletionBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<String, CompletionError> {
        let chat: Vec<ChatMessage> = messages
            .iter()
            .map(|m| match m.role {
                Role::System => ChatMessage::system(m.content.clone()),
                Role::User => ChatMessage::user(m.content.clone()),
            })
            .collect();

        let opts = CompletionOptions {
            temperature: Some(options.temperature),
            max_tokens: options.max_tokens,
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&chat, Some(&opts))
            .await
            .map_err(|e| CompletionError::Provider(e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

fn create_provider_backend(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn CompletionBackend>, ReportError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ReportError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(ProviderBackend::new(
        provider,
        format!("{provider_name}:{model}"),
    )))
}

/// Resolve the completion backend, from most-specific to least-specific.
///
/// 1. **Azure credentials** (`endpoint` + `api_key`): direct REST backend.
/// 2. **Named provider** (`provider_name`): edgequake-llm factory with
///    `model`; the provider reads its own API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_backend(
    config: &CompletionConfig,
) -> Result<Arc<dyn CompletionBackend>, ReportError> {
    // 1) Azure deployment
    if config.has_azure_credentials() {
        if let (Some(endpoint), Some(key)) = (&config.endpoint, &config.api_key) {
            let backend = AzureOpenAiBackend::new(
                endpoint,
                key.clone(),
                &config.model,
                &config.api_version,
                config.request_timeout_secs,
            )
            .map_err(|e| ReportError::ProviderNotConfigured {
                provider: "azure".to_string(),
                hint: e.to_string(),
            })?;
            return Ok(Arc::new(backend));
        }
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        return create_provider_backend(name, &config.model);
    }

    // 3) Environment pair
    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider_backend(&prov, &model);
        }
    }

    // 4) Auto-detect
    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReportError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No completion service configured.\n\
                Set AZURE_OPENAI_ENDPOINT + AZURE_OPENAI_API_KEY, or OPENAI_API_KEY / ANTHROPIC_API_KEY.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(ProviderBackend::new(provider, "auto")))
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails `failures` times, then answers `reply`.
    struct FlakyBackend {
        failures: usize,
        calls: AtomicUsize,
        reply: &'static str,
    }

    #[async_trait]
    impl CompletionBackend for FlakyBackend {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _options: &RequestOptions,
        ) -> Result<String, CompletionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(CompletionError::Status {
                    status: 503,
                    body: format!("busy #{n}"),
                })
            } else {
                Ok(self.reply.to_string())
            }
        }
    }

    fn fast_config() -> CompletionConfig {
        CompletionConfig {
            retry_delay_ms: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let backend = Arc::new(FlakyBackend {
            failures: 2,
            calls: AtomicUsize::new(0),
            reply: "  resposta  \n",
        });
        let client = CompletionClient::new(backend.clone(), &fast_config());

        let out = client.complete(&[Message::user("oi")]).await.unwrap();
        assert_eq!(out, "resposta");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts_with_last_error() {
        let backend = Arc::new(FlakyBackend {
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
            reply: "",
        });
        let client = CompletionClient::new(backend.clone(), &fast_config());

        let err = client.complete(&[Message::user("oi")]).await.unwrap_err();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert!(err.to_string().contains("busy #2"), "got: {err}");
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let backend = Arc::new(FlakyBackend {
            failures: 0,
            calls: AtomicUsize::new(0),
            reply: "x",
        });
        let config = CompletionConfig {
            max_attempts: 0,
            ..fast_config()
        };
        let client = CompletionClient::new(backend, &config);
        assert_eq!(client.max_attempts, 1);
    }

    #[test]
    fn azure_url_layout() {
        assert_eq!(
            chat_completions_url("https://res.openai.azure.com/", "gpt-4o", "2024-02-01"),
            "https://res.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-02-01"
        );
    }

    #[test]
    fn messages_serialise_as_role_content_pairs() {
        let json = serde_json::to_value([Message::system("s"), Message::user("u")]).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"role": "system", "content": "s"},
                {"role": "user", "content": "u"}
            ])
        );
    }

    #[test]
    fn resolve_prefers_azure_credentials() {
        let config = CompletionConfig {
            endpoint: Some("https://res.openai.azure.com".into()),
            api_key: Some("k".into()),
            provider_name: Some("openai".into()),
            ..Default::default()
        };
        let backend = resolve_backend(&config).unwrap();
        assert_eq!(backend.name(), "azure:gpt-4o");
    }
}
