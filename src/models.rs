//! Core data models for the comparison agent
//!
//! Protocol-facing types (messages, parts, tasks, artifacts) serialize in the
//! camelCase task/message envelope shape. `ConversationHistory` is the raw
//! role/content log the conversation loop works with.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    System,
    Tool,
}

/// Terminal states a task result can carry.
///
/// `InputRequired` is reserved: the agent never asks follow-up questions today.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Completed,
    InputRequired,
    Failed,
}

//
// ================= Parts =================
//

/// A single piece of message content.
///
/// Decoding is lenient at the message level: parts with a missing or unknown
/// `kind` are skipped instead of failing the whole message.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
    Data { data: Vec<Part> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Decode one part from raw JSON, `None` when the kind is not recognised.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.get("kind").and_then(Value::as_str)? {
            "text" => value
                .get("text")
                .and_then(Value::as_str)
                .map(Part::text),
            "data" => {
                let items = match value.get("data") {
                    Some(Value::Array(items)) => {
                        items.iter().filter_map(Part::from_value).collect()
                    }
                    _ => Vec::new(),
                };
                Some(Part::Data { data: items })
            }
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Part {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Part::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("unsupported or missing part kind"))
    }
}

fn deserialize_known_parts<'de, D>(deserializer: D) -> std::result::Result<Vec<Part>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw.iter().filter_map(Part::from_value).collect())
}

//
// ================= Message =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default = "message_kind")]
    pub kind: String,
    pub role: Role,
    #[serde(deserialize_with = "deserialize_known_parts")]
    pub parts: Vec<Part>,
    #[serde(default = "generate_id")]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

fn message_kind() -> String {
    "message".to_string()
}

fn task_kind() -> String {
    "task".to_string()
}

pub(crate) fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

impl Message {
    /// Message with a single text part and a fresh message id
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            kind: message_kind(),
            role,
            parts: vec![Part::text(text)],
            message_id: generate_id(),
            task_id: None,
            context_id: None,
        }
    }

    pub fn with_task(mut self, task_id: &str, context_id: &str) -> Self {
        self.task_id = Some(task_id.to_string());
        self.context_id = Some(context_id.to_string());
        self
    }

    /// Text carried by the message's direct text parts, joined by newlines.
    ///
    /// Falls back to the last text item inside data parts when the message
    /// has no direct text. Returns an empty string when nothing usable exists.
    pub fn extract_text(&self) -> String {
        let direct: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } if !text.trim().is_empty() => Some(text.trim()),
                _ => None,
            })
            .collect();

        if !direct.is_empty() {
            return direct.join("\n");
        }

        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Data { data } => data.iter().rev().find_map(|item| match item {
                    Part::Text { text } if !text.trim().is_empty() => {
                        Some(text.trim().to_string())
                    }
                    _ => None,
                }),
                _ => None,
            })
            .last()
            .unwrap_or_default()
    }
}

//
// ================= Task =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    pub state: TaskState,
    pub timestamp: String,
    pub message: Message,
}

impl TaskStatus {
    pub fn new(state: TaskState, message: Message) -> Self {
        Self {
            state,
            timestamp: Utc::now().to_rfc3339(),
            message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    pub name: String,
    pub parts: Vec<Part>,
}

impl Artifact {
    pub fn text(name: &str, text: impl Into<String>) -> Self {
        Self {
            artifact_id: generate_id(),
            name: name.to_string(),
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub id: String,
    pub context_id: String,
    #[serde(default = "task_kind")]
    pub kind: String,
    pub status: TaskStatus,
    pub artifacts: Vec<Artifact>,
    pub history: Vec<Message>,
}

impl TaskResult {
    pub fn new(
        id: String,
        context_id: String,
        status: TaskStatus,
        artifacts: Vec<Artifact>,
        history: Vec<Message>,
    ) -> Self {
        Self {
            id,
            context_id,
            kind: task_kind(),
            status,
            artifacts,
            history,
        }
    }
}

//
// ================= Conversation History =================
//

/// One raw role/content pair (`user`, `assistant`, `system`, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Append-only conversation log, passed into the loop by value and handed
/// back as a new value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ConversationHistory {
    entries: Vec<HistoryEntry>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// History extended with one user/assistant exchange
    pub fn with_exchange(mut self, user: &str, assistant: &str) -> Self {
        self.entries.push(HistoryEntry::user(user));
        self.entries.push(HistoryEntry::assistant(assistant));
        self
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::System => "system",
            Role::Tool => "tool",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Completed => "completed",
            TaskState::InputRequired => "input-required",
            TaskState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
