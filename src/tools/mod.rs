//! Tool registry and dispatcher
//!
//! The tool set is closed, so the registry is a static mapping from tool name
//! to a typed handler. Dispatch turns a batch of model tool calls into `tool`
//! turns, one per call, in call order.

use crate::error::AgentError;
use crate::llm::{ChatTurn, ToolCall};
use crate::market_data::MarketDataProvider;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod compare;
pub use compare::{CompanyMetrics, ComparisonData, CompareArgs, CompareCompaniesTool};

/// Outcome of one tool execution, as the model sees it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolResult {
    Comparison(ComparisonData),
    Error { error: String },
}

impl ToolResult {
    pub fn error(message: impl Into<String>) -> Self {
        ToolResult::Error {
            error: message.into(),
        }
    }
}

/// Names of every registered tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    CompareCompanies,
}

impl ToolKind {
    pub const ALL: &'static [ToolKind] = &[ToolKind::CompareCompanies];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            compare::TOOL_NAME => Some(ToolKind::CompareCompanies),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::CompareCompanies => compare::TOOL_NAME,
        }
    }

    pub fn definition(&self) -> Value {
        match self {
            ToolKind::CompareCompanies => compare::definition(),
        }
    }
}

/// Registry holding one handler per `ToolKind`
pub struct ToolRegistry {
    compare: CompareCompaniesTool,
}

impl ToolRegistry {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            compare: CompareCompaniesTool::new(provider),
        }
    }

    /// Tool contracts advertised to the model backend
    pub fn definitions(&self) -> Vec<Value> {
        ToolKind::ALL.iter().map(ToolKind::definition).collect()
    }

    pub fn list(&self) -> Vec<&'static str> {
        ToolKind::ALL.iter().map(ToolKind::name).collect()
    }

    /// Execute a batch of tool calls concurrently, keeping call order.
    pub async fn dispatch(&self, calls: &[ToolCall]) -> Vec<ChatTurn> {
        join_all(calls.iter().map(|call| self.dispatch_one(call))).await
    }

    async fn dispatch_one(&self, call: &ToolCall) -> ChatTurn {
        debug!(tool_name = %call.name(), call_id = %call.call_id(), "Dispatching tool call");

        let content = match ToolKind::from_name(call.name()) {
            Some(kind) => {
                let result = self.execute(kind, &call.function.arguments).await;
                encode(&result)
            }
            None => {
                warn!(tool_name = %call.name(), "Tool not registered");
                "{}".to_string()
            }
        };

        ChatTurn::tool(content, call.call_id())
    }

    async fn execute(&self, kind: ToolKind, arguments: &str) -> ToolResult {
        match kind {
            ToolKind::CompareCompanies => match decode_args::<CompareArgs>(kind, arguments) {
                Ok(args) => self.compare.compare(&args.ticker1, &args.ticker2).await,
                Err(e) => {
                    warn!(tool_name = kind.name(), error = %e, "Rejected tool arguments");
                    ToolResult::error(e.to_string())
                }
            },
        }
    }
}

fn decode_args<T: for<'de> Deserialize<'de>>(kind: ToolKind, arguments: &str) -> crate::Result<T> {
    let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
    serde_json::from_str(arguments).map_err(|e| {
        AgentError::InvalidToolInput(format!("Invalid arguments for {}: {}", kind.name(), e))
    })
}

fn encode(result: &ToolResult) -> String {
    serde_json::to_string(result).unwrap_or_else(|e| {
        serde_json::json!({ "error": format!("Failed to encode tool result: {}", e) }).to_string()
    })
}
