//! Task result assembly and history replay

use crate::error::AgentError;
use crate::models::{
    generate_id, Artifact, ConversationHistory, HistoryEntry, Message, Role, TaskResult,
    TaskState, TaskStatus,
};

/// Name of the artifact carrying the comparison text
pub const ARTIFACT_NAME: &str = "comparison";

/// Wrap the agent's outcome into a task result.
///
/// Agent failures still produce a `completed` task; the failure is explained in
/// the message text. Missing ids are generated.
pub fn to_task_result(
    outcome: std::result::Result<String, AgentError>,
    task_id: Option<String>,
    context_id: Option<String>,
    history: &ConversationHistory,
) -> TaskResult {
    let id = task_id.filter(|v| !v.trim().is_empty()).unwrap_or_else(generate_id);
    let context_id = context_id
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(generate_id);

    let text = match outcome {
        Ok(text) => text,
        Err(e) => format!("Error processing request: {}", e),
    };

    let message = Message::text(Role::Agent, text.clone()).with_task(&id, &context_id);

    TaskResult::new(
        id,
        context_id,
        TaskStatus::new(TaskState::Completed, message),
        vec![Artifact::text(ARTIFACT_NAME, text)],
        convert_history(history),
    )
}

/// Replay raw history as protocol messages (`assistant` → agent, unknown → system)
pub fn convert_history(history: &ConversationHistory) -> Vec<Message> {
    history
        .entries()
        .iter()
        .map(|entry| {
            let role = match entry.role.as_str() {
                "user" => Role::User,
                "assistant" | "agent" => Role::Agent,
                _ => Role::System,
            };
            Message::text(role, entry.content.clone())
        })
        .collect()
}

/// Raw history from protocol messages, skipping messages without usable text
pub fn history_from_messages(messages: &[Message]) -> ConversationHistory {
    let entries = messages
        .iter()
        .filter_map(|message| {
            let text = message.extract_text();
            if text.is_empty() {
                return None;
            }
            let role = match message.role {
                Role::User => "user",
                Role::Agent => "assistant",
                Role::System => "system",
                Role::Tool => "tool",
            };
            Some(HistoryEntry::new(role, text))
        })
        .collect();

    ConversationHistory::from_entries(entries)
}
