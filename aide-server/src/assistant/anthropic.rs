//! Anthropic Messages API client.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assistant::{ChatModel, CompletionRequest};
use crate::config::Config;

const API_VERSION: &str = "2023-06-01";

#[derive(Serialize, Debug)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Serialize, Debug)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Non-streaming client for `POST {base_url}/v1/messages`.
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: &str, config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.anthropic_base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            model: config.model.clone(),
        })
    }

    /// Build a client when an API key is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        config
            .anthropic_api_key
            .as_deref()
            .map(|key| Self::new(key, config))
            .transpose()
    }
}

#[async_trait]
impl ChatModel for AnthropicClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: request.system.as_deref(),
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage { role: m.role.as_ref(), content: &m.content })
                .collect(),
        };

        let url = format!("{}/v1/messages", self.base_url);
        debug!(%url, model = %self.model, turns = body.messages.len(), "sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .context("failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_owned());
            bail!("Anthropic API request failed with status {status}: {error_body}");
        }

        let parsed: MessagesResponse =
            response.json().await.context("failed to decode Anthropic response")?;
        extract_text(parsed)
    }
}

/// Concatenate the text blocks of a response.
fn extract_text(response: MessagesResponse) -> Result<String> {
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");
    if text.is_empty() {
        bail!(
            "Anthropic response contained no text (stop_reason: {})",
            response.stop_reason.as_deref().unwrap_or("unknown")
        );
    }
    Ok(text)
}
