use crate::core::config::{Config, API_KEY_ENV};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use url::Url;

/// One chat-completion call: a system and a user message plus sampling limits.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the endpoint for a strict JSON object.
    pub json_output: bool,
}

#[async_trait]
pub trait LlmClient: Send + Sync + Debug {
    /// Returns the raw text of the first choice.
    async fn chat(&self, request: &ChatRequest) -> Result<String>;
}

pub fn create_llm(config: &Config) -> Result<Box<dyn LlmClient>> {
    let api_key = config
        .llm
        .resolve_api_key(std::env::var(API_KEY_ENV).ok())
        .with_context(|| format!("No API key: set llm.api_key in config.yml or {}", API_KEY_ENV))?;

    let client = CompletionClient::new(&api_key, &config.llm.model, &config.llm.base_url)?
        .with_timeout(config.llm.timeout())?;
    Ok(Box::new(client))
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct CompletionClient {
    api_key: String,
    model: String,
    endpoint: Url,
    client: reqwest::Client,
}

impl Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl CompletionClient {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Result<Self> {
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&base)
            .and_then(|u| u.join("chat/completions"))
            .with_context(|| format!("Invalid base_url: {}", base_url))?;

        Ok(Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            endpoint,
            client: reqwest::Client::new(),
        })
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(self)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<CompletionMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct CompletionMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessageResponse,
}

#[derive(Deserialize)]
struct CompletionMessageResponse {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for CompletionClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let request_body = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                CompletionMessage { role: "system".to_string(), content: request.system.clone() },
                CompletionMessage { role: "user".to_string(), content: request.user.clone() },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_output.then(|| ResponseFormat {
                kind: "json_object".to_string(),
            }),
        };

        log::debug!(
            "POST {} (model={}, max_tokens={})",
            self.endpoint,
            self.model,
            request.max_tokens
        );

        let resp = self.client.post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("API request failed: {} {}", status, error_text));
        }

        let response_text = resp.text().await?;
        let result: CompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| anyhow!("Failed to parse completion response: {}. Body: {}", e, response_text))?;

        if let Some(choice) = result.choices.first() {
            if let Some(content) = &choice.message.content {
                return Ok(content.clone());
            }
        }

        Err(anyhow!("Completion response empty or missing content"))
    }
}
