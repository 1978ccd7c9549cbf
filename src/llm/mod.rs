//! Model backend trait and chat turn types
//!
//! The conversation loop talks to the language model through `ModelBackend`.
//! Turns serialize in the OpenAI-compatible chat-completions shape.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod gemini;
pub use gemini::GeminiClient;

/// Function name and JSON-encoded arguments of a tool call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// A tool invocation requested by the model backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn call_id(&self) -> &str {
        &self.id
    }
}

/// One entry of the turn sequence sent to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatTurn {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        content: String,
        tool_call_id: String,
    },
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        ChatTurn::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatTurn::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatTurn::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        ChatTurn::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Rebuild a turn from a raw history role. Unrecognised roles replay as user turns.
    pub fn from_history(role: &str, content: &str) -> Self {
        match role {
            "system" => ChatTurn::system(content),
            "assistant" | "agent" => ChatTurn::assistant(content),
            _ => ChatTurn::user(content),
        }
    }
}

/// What the backend answered for one round-trip
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// The model wants tools run before it answers
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
    /// Final assistant text
    Message(String),
}

/// Trait for a language-model backend (one inference per call)
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn complete(&self, turns: &[ChatTurn], tools: &[Value]) -> Result<ModelReply>;
}
