//! OpenAI-compatible chat and embedding clients

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Shared HTTP transport for an OpenAI-compatible service
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Create a client from LLM configuration. The API key comes from the
    /// config or, failing that, the `OPENAI_API_KEY` environment variable.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                Error::Config(
                    "No API key configured and OPENAI_API_KEY is not set".to_string(),
                )
            })?;

        let http = Client::builder()
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post_json<Req, Resp>(&self, path: &str, request: &Req, timeout: Duration) -> Result<Resp>
    where
        Req: Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!("HTTP {} from {}: {}", status, path, body)));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse response from {}: {}", path, e)))
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Chat-completion provider bound to one model and decoding configuration.
///
/// Routing and answering each get their own instance: same transport,
/// different model, temperature, and timeout.
pub struct OpenAiChat {
    client: Arc<OpenAiClient>,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiChat {
    /// Create a chat provider over a shared transport
    pub fn new(client: Arc<OpenAiClient>, model: String, temperature: f32, timeout: Duration) -> Self {
        Self {
            client,
            model,
            temperature,
            timeout,
        }
    }

    /// Routing instance: classification model, zero temperature
    pub fn for_routing(client: Arc<OpenAiClient>, config: &LlmConfig) -> Self {
        Self::new(
            client,
            config.routing_model.clone(),
            config.routing_temperature,
            Duration::from_secs(config.routing_timeout_secs),
        )
    }

    /// Answering instance: generation model, low-but-nonzero temperature
    pub fn for_answering(client: Arc<OpenAiClient>, config: &LlmConfig) -> Self {
        Self::new(
            client,
            config.answer_model.clone(),
            config.answer_temperature,
            Duration::from_secs(config.answer_timeout_secs),
        )
    }
}

#[async_trait]
impl LlmProvider for OpenAiChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages,
        };

        let response: ChatResponse = self
            .client
            .post_json("/chat/completions", &request, self.timeout)
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::llm("Completion response contained no choices"))
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Embedding provider over the shared transport
pub struct OpenAiEmbedder {
    client: Arc<OpenAiClient>,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

impl OpenAiEmbedder {
    /// Create an embedder from embedding configuration
    pub fn new(client: Arc<OpenAiClient>, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            dimensions: config.dimensions,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response: EmbeddingResponse = self
            .client
            .post_json("/embeddings", &request, self.timeout)
            .await
            .map_err(|e| match e {
                Error::Llm(msg) => Error::embedding(msg),
                other => other,
            })?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::embedding("Embedding response contained no data"))?;

        if embedding.len() != self.dimensions {
            return Err(Error::embedding(format!(
                "Model returned {} dimensions, expected {}",
                embedding.len(),
                self.dimensions
            )));
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }
}
