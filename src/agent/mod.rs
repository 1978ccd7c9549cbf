//! Comparison agent - the conversation loop
//!
//! GATE → AWAIT MODEL ⇄ DISPATCH TOOLS → ANSWER
//!
//! The loop never fails outward: backend and dispatch errors come back as text,
//! with the caller's history untouched.

use crate::classifier::is_comparison;
use crate::error::AgentError;
use crate::llm::{ChatTurn, ModelBackend, ModelReply, ToolCall};
use crate::models::ConversationHistory;
use crate::tools::ToolRegistry;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub mod prompts;

pub use prompts::REFUSAL;

/// Default cap on model round-trips per request
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

enum LoopState {
    AwaitingModel,
    DispatchingTools(Vec<ToolCall>),
}

pub struct ComparisonAgent {
    model: Arc<dyn ModelBackend>,
    tools: ToolRegistry,
    system_prompt: String,
    max_iterations: usize,
}

impl ComparisonAgent {
    pub fn new(model: Arc<dyn ModelBackend>, tools: ToolRegistry) -> Self {
        Self {
            model,
            tools,
            system_prompt: prompts::system_prompt(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Answer one user message.
    ///
    /// Returns the reply text and the history to use for the next call. The
    /// history only grows when the model produced an answer; failures come
    /// back as text with the history unchanged.
    pub async fn run(
        &self,
        history: ConversationHistory,
        user_text: &str,
    ) -> (String, ConversationHistory) {
        match self.try_run(&history, user_text).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Conversation loop failed");
                (
                    format!("An error occurred while processing your request: {}", e),
                    history,
                )
            }
        }
    }

    /// Like `run`, but hands backend and dispatch failures to the caller.
    pub async fn try_run(
        &self,
        history: &ConversationHistory,
        user_text: &str,
    ) -> Result<(String, ConversationHistory)> {
        if !is_comparison(user_text) {
            info!("Query is not a comparison, returning refusal");
            return Ok((REFUSAL.to_string(), history.clone()));
        }

        let answer = self.converse(history, user_text).await?;
        let updated = history.clone().with_exchange(user_text, &answer);
        Ok((answer, updated))
    }

    fn initial_turns(&self, history: &ConversationHistory, user_text: &str) -> Vec<ChatTurn> {
        let mut turns = Vec::with_capacity(history.len() + 2);
        turns.push(ChatTurn::system(self.system_prompt.clone()));
        turns.extend(
            history
                .entries()
                .iter()
                .map(|entry| ChatTurn::from_history(&entry.role, &entry.content)),
        );
        turns.push(ChatTurn::user(user_text));
        turns
    }

    async fn converse(&self, history: &ConversationHistory, user_text: &str) -> Result<String> {
        let mut turns = self.initial_turns(history, user_text);
        let tool_definitions = self.tools.definitions();
        let mut round_trips = 0usize;
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if round_trips >= self.max_iterations {
                        warn!(round_trips, "Model exceeded tool-call iteration cap");
                        return Err(AgentError::MaxIterationsExceeded(self.max_iterations));
                    }
                    round_trips += 1;

                    debug!(round_trips, turns = turns.len(), "Awaiting model");

                    match self.model.complete(&turns, &tool_definitions).await? {
                        ModelReply::Message(text) => {
                            info!(round_trips, "Model answered");
                            return Ok(text);
                        }
                        ModelReply::ToolCalls { content, calls } => {
                            turns.push(ChatTurn::Assistant {
                                content,
                                tool_calls: calls.clone(),
                            });
                            LoopState::DispatchingTools(calls)
                        }
                    }
                }
                LoopState::DispatchingTools(calls) => {
                    info!(tool_calls = calls.len(), "Dispatching tools");
                    let results = self.tools.dispatch(&calls).await;
                    turns.extend(results);
                    LoopState::AwaitingModel
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HistoryEntry;
    use crate::testing::{ScriptedBackend, StaticProvider};

    fn agent(backend: Arc<ScriptedBackend>) -> ComparisonAgent {
        ComparisonAgent::new(
            backend,
            ToolRegistry::new(Arc::new(StaticProvider::with_big_tech())),
        )
    }

    fn compare_call(id: &str) -> ToolCall {
        ToolCall::new(id, "compare_companies", r#"{"ticker1":"AAPL","ticker2":"MSFT"}"#)
    }

    #[tokio::test]
    async fn test_non_comparison_never_calls_model() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let history = ConversationHistory::from_entries(vec![HistoryEntry::user("earlier")]);

        let (text, updated) = agent(backend.clone())
            .run(history.clone(), "What is the capital of France?")
            .await;

        assert_eq!(text, REFUSAL);
        assert_eq!(updated, history);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_comparison_with_tool_round_trip() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(ModelReply::ToolCalls {
                content: None,
                calls: vec![compare_call("call_1")],
            }),
            Ok(ModelReply::Message("Choice: MSFT".to_string())),
        ]));

        let (text, history) = agent(backend.clone())
            .run(ConversationHistory::new(), "Compare AAPL and MSFT")
            .await;

        assert_eq!(text, "Choice: MSFT");
        assert_eq!(
            history.entries(),
            &[
                HistoryEntry::user("Compare AAPL and MSFT"),
                HistoryEntry::assistant("Choice: MSFT"),
            ]
        );

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);

        // first call: system + user
        assert!(matches!(requests[0][0], ChatTurn::System { .. }));
        assert_eq!(requests[0][1], ChatTurn::user("Compare AAPL and MSFT"));
        assert_eq!(requests[0].len(), 2);

        // second call adds the tool request and its result
        let second = &requests[1];
        assert_eq!(second.len(), 4);
        assert!(matches!(&second[2], ChatTurn::Assistant { tool_calls, .. } if tool_calls.len() == 1));
        match &second[3] {
            ChatTurn::Tool { content, tool_call_id } => {
                assert_eq!(tool_call_id, "call_1");
                assert!(content.contains("Apple Inc. vs Microsoft Corporation"));
            }
            other => panic!("expected tool turn, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_batch_of_two_tool_calls() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(ModelReply::ToolCalls {
                content: None,
                calls: vec![compare_call("a"), compare_call("b")],
            }),
            Ok(ModelReply::Message("done".to_string())),
        ]));

        agent(backend.clone())
            .run(ConversationHistory::new(), "AAPL vs MSFT")
            .await;

        let requests = backend.requests();
        let second = &requests[1];
        let ids: Vec<&str> = second
            .iter()
            .filter_map(|turn| match turn {
                ChatTurn::Tool { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_history_round_trip_precedes_new_turn() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(ModelReply::Message("first answer".to_string())),
            Ok(ModelReply::Message("second answer".to_string())),
        ]));
        let agent = agent(backend.clone());

        let (_, history) = agent
            .run(ConversationHistory::new(), "Compare AAPL and MSFT")
            .await;
        let (_, history) = agent.run(history, "Which is better, KO or PEP?").await;

        let requests = backend.requests();
        let second = &requests[1];
        assert_eq!(
            &second[1..],
            &[
                ChatTurn::user("Compare AAPL and MSFT"),
                ChatTurn::assistant("first answer"),
                ChatTurn::user("Which is better, KO or PEP?"),
            ]
        );
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_text() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(AgentError::LlmError(
            "upstream unavailable".to_string(),
        ))]));
        let history = ConversationHistory::from_entries(vec![HistoryEntry::user("earlier")]);

        let (text, updated) = agent(backend)
            .run(history.clone(), "Compare AAPL and MSFT")
            .await;

        assert!(text.starts_with("An error occurred while processing your request:"));
        assert!(text.contains("upstream unavailable"));
        assert_eq!(updated, history);
    }

    #[tokio::test]
    async fn test_try_run_surfaces_errors() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(AgentError::LlmError(
            "bad gateway".to_string(),
        ))]));

        let err = agent(backend)
            .try_run(&ConversationHistory::new(), "Compare AAPL and MSFT")
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::LlmError(_)));
    }

    #[tokio::test]
    async fn test_endless_tool_calls_hit_the_cap() {
        let replies = (0..5)
            .map(|i| {
                Ok(ModelReply::ToolCalls {
                    content: None,
                    calls: vec![compare_call(&format!("call_{i}"))],
                })
            })
            .collect();
        let backend = Arc::new(ScriptedBackend::new(replies));

        let (text, history) = agent(backend.clone())
            .with_max_iterations(3)
            .run(ConversationHistory::new(), "Compare AAPL and MSFT")
            .await;

        assert_eq!(backend.call_count(), 3);
        assert!(text.contains("after 3 round-trips"));
        assert!(history.is_empty());
    }
}
