//! Environment configuration
//!
//! Binaries call `dotenv::dotenv()` first, so `.env` values land here too.

use crate::agent::DEFAULT_MAX_ITERATIONS;
use crate::error::AgentError;
use crate::{llm, market_data, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub market_data_base_url: String,
    pub port: u16,
    pub max_iterations: usize,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GOOGLE_API_KEY")
            .or_else(|| get("GEMINI_API_KEY"))
            .unwrap_or_default();

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| AgentError::ConfigError(format!("Invalid PORT '{}': {}", raw, e)))?,
            None => 8080,
        };

        let max_iterations = match get("AGENT_MAX_ITERATIONS") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                AgentError::ConfigError(format!("Invalid AGENT_MAX_ITERATIONS '{}': {}", raw, e))
            })?,
            None => DEFAULT_MAX_ITERATIONS,
        };

        Ok(Self {
            api_key,
            base_url: get("BASE_URL").unwrap_or_else(|| llm::gemini::DEFAULT_BASE_URL.to_string()),
            model: get("MODEL").unwrap_or_else(|| llm::gemini::DEFAULT_MODEL.to_string()),
            market_data_base_url: get("MARKET_DATA_BASE_URL")
                .unwrap_or_else(|| market_data::DEFAULT_BASE_URL.to_string()),
            port,
            max_iterations,
        })
    }
}
