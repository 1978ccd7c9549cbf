//! Test doubles shared by the unit tests

use crate::error::AgentError;
use crate::llm::{ChatTurn, ModelBackend, ModelReply};
use crate::market_data::{CompanyProfile, MarketDataProvider};
use crate::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Model backend replaying canned replies and recording every turn sequence
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<ModelReply>>>,
    requests: Mutex<Vec<Vec<ChatTurn>>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<ModelReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatTurn>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn complete(&self, turns: &[ChatTurn], _tools: &[Value]) -> Result<ModelReply> {
        self.requests.lock().unwrap().push(turns.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::LlmError("script exhausted".to_string())))
    }
}

/// In-memory market data keyed by symbol
pub struct StaticProvider {
    profiles: HashMap<String, CompanyProfile>,
    failure: Option<String>,
    lookups: Arc<AtomicUsize>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
            failure: None,
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_big_tech() -> Self {
        let mut provider = Self::new();
        provider.insert(
            "AAPL",
            json!({
                "shortName": "Apple Inc.",
                "sector": "Technology",
                "marketCap": 3_000_000_000_000_i64,
                "currentPrice": 190.5,
                "revenueGrowth": 0.06,
                "grossMargins": 0.45,
                "profitMargins": 0.25,
                "trailingPE": 29.1,
                "dividendYield": 0.005
            }),
        );
        provider.insert(
            "MSFT",
            json!({
                "shortName": "Microsoft Corporation",
                "sector": "Technology",
                "marketCap": 3_100_000_000_000_i64,
                "currentPrice": 420.1,
                "revenueGrowth": 0.15,
                "grossMargins": 0.69,
                "profitMargins": 0.36,
                "trailingPE": 35.2,
                "dividendYield": 0.007
            }),
        );
        provider
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn insert(&mut self, symbol: &str, profile: Value) {
        if let Value::Object(map) = profile {
            self.profiles.insert(symbol.to_string(), map);
        }
    }

    pub fn lookups(&self) -> Arc<AtomicUsize> {
        self.lookups.clone()
    }
}

#[async_trait]
impl MarketDataProvider for StaticProvider {
    async fn profile(&self, symbol: &str) -> Result<Option<CompanyProfile>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(AgentError::DataProviderError(message.clone()));
        }
        Ok(self.profiles.get(symbol).cloned())
    }
}
