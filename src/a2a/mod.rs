//! JSON-RPC task/message protocol adapter
//!
//! Validates the JSON-RPC 2.0 envelope, extracts the user's text, runs the
//! comparison agent and wraps its answer into a task result. Envelope problems
//! become JSON-RPC errors; agent problems become completed tasks.

use crate::agent::ComparisonAgent;
use crate::models::{ConversationHistory, Message, Role, TaskResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod task;
pub mod webhook;

pub use task::{convert_history, history_from_messages, to_task_result};
pub use webhook::WebhookNotifier;

pub const JSONRPC_VERSION: &str = "2.0";

pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// =============================
/// Envelope
/// =============================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: TaskResult) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }

    pub fn invalid_request(id: Value, message: impl Into<String>) -> Self {
        Self::error(id, INVALID_REQUEST, message, None)
    }

    pub fn internal_error(id: Value, details: impl Into<String>) -> Self {
        Self::error(
            id,
            INTERNAL_ERROR,
            "Internal error",
            Some(json!({ "details": details.into() })),
        )
    }

    pub fn error_code(&self) -> Option<i32> {
        self.error.as_ref().map(|e| e.code)
    }
}

/// =============================
/// Method Params
/// =============================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushAuthentication {
    #[serde(default)]
    pub schemes: Vec<String>,
    #[serde(default)]
    pub credentials: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNotificationConfig {
    pub url: String,
    #[serde(default)]
    pub authentication: Option<PushAuthentication>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageConfiguration {
    #[serde(default)]
    pub blocking: Option<bool>,
    #[serde(default)]
    pub accepted_output_modes: Vec<String>,
    #[serde(default)]
    pub push_notification_config: Option<PushNotificationConfig>,
}

/// Params of `message/send`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendParams {
    pub message: Message,
    #[serde(default)]
    pub configuration: Option<MessageConfiguration>,
}

/// Params of `execute`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteParams {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub context_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Everything the agent needs for one task, whichever method carried it
struct TaskRequest {
    text: String,
    history: ConversationHistory,
    task_id: Option<String>,
    context_id: Option<String>,
    push: Option<PushNotificationConfig>,
}

/// =============================
/// Handler
/// =============================

pub struct A2aHandler {
    agent: Arc<ComparisonAgent>,
    notifier: WebhookNotifier,
}

impl A2aHandler {
    pub fn new(agent: Arc<ComparisonAgent>, notifier: WebhookNotifier) -> Self {
        Self { agent, notifier }
    }

    pub fn agent(&self) -> &Arc<ComparisonAgent> {
        &self.agent
    }

    /// Handle one decoded JSON body. Always yields a well-formed response.
    pub async fn handle(&self, body: Value) -> JsonRpcResponse {
        let request = match parse_envelope(body) {
            Ok(request) => request,
            Err(response) => return response,
        };

        info!(method = %request.method, "JSON-RPC request");

        let parsed = match request.method.as_str() {
            "message/send" => parse_message_send(request.params),
            "execute" => parse_execute(request.params),
            other => {
                warn!(method = other, "Unknown JSON-RPC method");
                return JsonRpcResponse::error(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", other),
                    None,
                );
            }
        };

        match parsed {
            Ok(task_request) => self.process(request.id, task_request).await,
            Err(message) => JsonRpcResponse::error(request.id, INVALID_PARAMS, message, None),
        }
    }

    async fn process(&self, id: Value, request: TaskRequest) -> JsonRpcResponse {
        let TaskRequest {
            text,
            history,
            task_id,
            context_id,
            push,
        } = request;

        // a panic inside the agent surfaces here as a JoinError
        let agent = self.agent.clone();
        let replay = history.clone();
        let joined =
            tokio::spawn(async move { agent.try_run(&replay, &text).await }).await;

        let task = match joined {
            Ok(Ok((answer, updated))) => to_task_result(Ok(answer), task_id, context_id, &updated),
            Ok(Err(e)) => {
                error!(error = %e, "Agent failed, returning explanatory task");
                to_task_result(Err(e), task_id, context_id, &history)
            }
            Err(e) => {
                error!(error = %e, "Agent task aborted");
                return JsonRpcResponse::internal_error(id, e.to_string());
            }
        };

        if let Some(config) = push {
            info!(url = %config.url, task_id = %task.id, "Scheduling webhook delivery");
            self.notifier.notify(config, task.clone());
        }

        JsonRpcResponse::success(id, task)
    }
}

fn parse_envelope(body: Value) -> std::result::Result<JsonRpcRequest, JsonRpcResponse> {
    let Value::Object(map) = &body else {
        return Err(JsonRpcResponse::invalid_request(
            Value::Null,
            "Invalid Request: body must be a JSON object",
        ));
    };

    let id = map.get("id").cloned().unwrap_or(Value::Null);

    if map.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(JsonRpcResponse::invalid_request(
            id,
            "Invalid Request: jsonrpc must be \"2.0\"",
        ));
    }

    if !(id.is_string() || id.is_number()) {
        return Err(JsonRpcResponse::invalid_request(
            Value::Null,
            "Invalid Request: id is required",
        ));
    }

    serde_json::from_value(body).map_err(|e| {
        JsonRpcResponse::invalid_request(id, format!("Invalid Request: {}", e))
    })
}

fn parse_message_send(params: Value) -> std::result::Result<TaskRequest, String> {
    let params: MessageSendParams =
        serde_json::from_value(params).map_err(|e| format!("Invalid params: {}", e))?;

    let text = params.message.extract_text();
    if text.is_empty() {
        return Err("Invalid params: no text found in message".to_string());
    }

    Ok(TaskRequest {
        text,
        history: ConversationHistory::new(),
        task_id: params.message.task_id.clone(),
        context_id: params.message.context_id.clone(),
        push: params
            .configuration
            .and_then(|config| config.push_notification_config),
    })
}

fn parse_execute(params: Value) -> std::result::Result<TaskRequest, String> {
    let params: ExecuteParams =
        serde_json::from_value(params).map_err(|e| format!("Invalid params: {}", e))?;

    let latest = params
        .messages
        .iter()
        .rposition(|m| m.role == Role::User && !m.extract_text().is_empty())
        .ok_or_else(|| "Invalid params: no text found in messages".to_string())?;

    Ok(TaskRequest {
        text: params.messages[latest].extract_text(),
        history: history_from_messages(&params.messages[..latest]),
        task_id: params.task_id,
        context_id: params.context_id,
        push: None,
    })
}
