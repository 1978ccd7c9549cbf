//! Company Comparison Agent
//!
//! A single-purpose agent that:
//! - Gates free text on comparison intent before spending a model call
//! - Converses with an OpenAI-compatible model backend in a bounded tool loop
//! - Resolves both companies through a market data tool
//! - Returns the answer as a JSON-RPC task result, optionally pushed to a webhook
//!
//! FLOW:
//! TEXT → CLASSIFY → MODEL ⇄ TOOLS → ANSWER → TASK RESULT

pub mod a2a;
pub mod agent;
pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod llm;
pub mod market_data;
pub mod models;
pub mod tools;

#[cfg(test)]
mod testing;

pub use error::{AgentError, Result};

// Re-export common types
pub use models::*;
pub use agent::ComparisonAgent;
pub use classifier::is_comparison;
pub use config::AgentConfig;
