//! Gemini client over the OpenAI-compatible chat-completions endpoint
//!
//! Uses a long-lived reqwest::Client for connection pooling.
//! Any OpenAI-compatible server works when `base_url` points at it.

use super::{ChatTurn, ModelBackend, ModelReply, ToolCall};
use crate::error::AgentError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Upper bound on one chat-completions round-trip
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Reusable chat client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: &str, model: &str) -> Result<Self> {
        Self::with_timeout(api_key, base_url, model, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        api_key: String,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelBackend for GeminiClient {
    async fn complete(&self, turns: &[ChatTurn], tools: &[Value]) -> Result<ModelReply> {
        if self.api_key.is_empty() {
            return Err(AgentError::LlmError(
                "GOOGLE_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: turns,
            tools,
        };

        debug!(turns = turns.len(), model = %self.model, "Calling chat completions");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Chat completions request failed: {}", e);
                AgentError::LlmError(format!("Model request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Chat completions error response ({}): {}", status, error_text);
            return Err(AgentError::LlmError(format!(
                "Model API returned {}: {}",
                status, error_text
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse chat completions response: {}", e);
            AgentError::LlmError(format!("Model response parse error: {}", e))
        })?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::LlmError("No choices in model response".to_string()))?;

        let reply = interpret_choice(choice);
        match &reply {
            ModelReply::ToolCalls { calls, .. } => {
                info!(tool_calls = calls.len(), "Model requested tools")
            }
            ModelReply::Message(text) => info!(chars = text.len(), "Model produced final answer"),
        }

        Ok(reply)
    }
}

/// Tool calls win over `finish_reason`: some compatible servers report `stop`
/// alongside a tool-call batch.
fn interpret_choice(choice: Choice) -> ModelReply {
    debug!(finish_reason = ?choice.finish_reason, "Interpreting model choice");

    match choice.message.tool_calls {
        Some(calls) if !calls.is_empty() => ModelReply::ToolCalls {
            content: choice.message.content,
            calls,
        },
        _ => ModelReply::Message(choice.message.content.unwrap_or_default()),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [Value],
}

fn no_tools(tools: &&[Value]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}
