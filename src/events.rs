//! Typed thread events and items streamed by `codex exec --experimental-json`.
//!
//! Each stdout line is one JSON object with a string `type` discriminator.
//! Known tags decode into closed enum variants; unknown tags pass through as
//! [`ThreadEvent::Unknown`] / [`ThreadItem::Other`] so newer CLI versions do
//! not break the parser.

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};

/// Token usage counters reported by `turn.completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens consumed.
    #[serde(default)]
    pub input_tokens: u64,
    /// Input tokens served from cache.
    #[serde(default)]
    pub cached_input_tokens: u64,
    /// Output tokens generated.
    #[serde(default)]
    pub output_tokens: u64,
}

/// The error payload of a `turn.failed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadError {
    /// Human-readable failure message.
    pub message: String,
}

/// Status of a command execution item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandExecutionStatus {
    /// Still running.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with a failure.
    Failed,
}

/// Kind of a single file change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchChangeKind {
    /// File added.
    Add,
    /// File deleted.
    Delete,
    /// File updated in place.
    Update,
}

/// Outcome of applying a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchApplyStatus {
    /// Patch applied.
    Completed,
    /// Patch failed to apply.
    Failed,
}

/// Status of an MCP tool call item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpToolCallStatus {
    /// Still running.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with a failure.
    Failed,
}

/// A final agent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessageItem {
    /// Item identifier.
    pub id: String,
    /// Message text.
    pub text: String,
}

/// A reasoning summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningItem {
    /// Item identifier.
    pub id: String,
    /// Reasoning text.
    pub text: String,
}

/// A command executed by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandExecutionItem {
    /// Item identifier.
    pub id: String,
    /// The command line.
    pub command: String,
    /// Interleaved stdout/stderr captured from the command.
    pub aggregated_output: String,
    /// Exit code, present once the command finished.
    #[serde(default)]
    pub exit_code: Option<i64>,
    /// Execution status.
    pub status: CommandExecutionStatus,
}

/// One path touched by a file change item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpdateChange {
    /// The affected path.
    pub path: String,
    /// What happened to the path.
    pub kind: PatchChangeKind,
}

/// A set of file changes applied by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeItem {
    /// Item identifier.
    pub id: String,
    /// Per-path change entries.
    pub changes: Vec<FileUpdateChange>,
    /// Apply outcome.
    pub status: PatchApplyStatus,
}

/// Successful result payload of an MCP tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolCallResult {
    /// Content blocks returned by the tool.
    #[serde(default)]
    pub content: Vec<Value>,
    /// Structured content, if the tool returned any.
    #[serde(default)]
    pub structured_content: Value,
}

/// Error payload of a failed MCP tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpToolCallError {
    /// Failure message from the server.
    pub message: String,
}

/// An MCP tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolCallItem {
    /// Item identifier.
    pub id: String,
    /// MCP server name.
    pub server: String,
    /// Tool name.
    pub tool: String,
    /// Tool arguments.
    #[serde(default)]
    pub arguments: Value,
    /// Result, present when the call succeeded.
    #[serde(default)]
    pub result: Option<McpToolCallResult>,
    /// Error, present when the call failed.
    #[serde(default)]
    pub error: Option<McpToolCallError>,
    /// Call status.
    pub status: McpToolCallStatus,
}

/// A web search performed by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchItem {
    /// Item identifier.
    pub id: String,
    /// The search query.
    pub query: String,
}

/// One entry of a todo list item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoEntry {
    /// Task description.
    pub text: String,
    /// Whether the task is done.
    pub completed: bool,
}

/// The agent's current todo list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoListItem {
    /// Item identifier.
    pub id: String,
    /// Ordered task entries.
    pub items: Vec<TodoEntry>,
}

/// A non-fatal error surfaced as an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorItem {
    /// Item identifier.
    pub id: String,
    /// Error message.
    pub message: String,
}

/// A discrete unit of agent output, surfaced once completed.
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadItem {
    /// Final agent message.
    AgentMessage(AgentMessageItem),
    /// Reasoning summary.
    Reasoning(ReasoningItem),
    /// Command execution.
    CommandExecution(CommandExecutionItem),
    /// File changes.
    FileChange(FileChangeItem),
    /// MCP tool call.
    McpToolCall(McpToolCallItem),
    /// Web search.
    WebSearch(WebSearchItem),
    /// Todo list snapshot.
    TodoList(TodoListItem),
    /// Item-level error.
    Error(ErrorItem),
    /// An item type this crate does not know about; the raw object is kept.
    Other(Value),
}

impl ThreadItem {
    fn to_value(&self) -> serde_json::Result<Value> {
        let (tag, mut value) = match self {
            Self::AgentMessage(item) => ("agent_message", serde_json::to_value(item)?),
            Self::Reasoning(item) => ("reasoning", serde_json::to_value(item)?),
            Self::CommandExecution(item) => ("command_execution", serde_json::to_value(item)?),
            Self::FileChange(item) => ("file_change", serde_json::to_value(item)?),
            Self::McpToolCall(item) => ("mcp_tool_call", serde_json::to_value(item)?),
            Self::WebSearch(item) => ("web_search", serde_json::to_value(item)?),
            Self::TodoList(item) => ("todo_list", serde_json::to_value(item)?),
            Self::Error(item) => ("error", serde_json::to_value(item)?),
            Self::Other(value) => return Ok(value.clone()),
        };
        if let Value::Object(map) = &mut value {
            map.insert("type".to_string(), Value::String(tag.to_string()));
        }
        Ok(value)
    }
}

impl Serialize for ThreadItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().map_err(S::Error::custom)?.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ThreadItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let item_type = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let decoded = match item_type.as_str() {
            "agent_message" => serde_json::from_value(value).map(Self::AgentMessage),
            "reasoning" => serde_json::from_value(value).map(Self::Reasoning),
            "command_execution" => serde_json::from_value(value).map(Self::CommandExecution),
            "file_change" => serde_json::from_value(value).map(Self::FileChange),
            "mcp_tool_call" => serde_json::from_value(value).map(Self::McpToolCall),
            "web_search" => serde_json::from_value(value).map(Self::WebSearch),
            "todo_list" => serde_json::from_value(value).map(Self::TodoList),
            "error" => serde_json::from_value(value).map(Self::Error),
            _ => return Ok(Self::Other(value)),
        };
        decoded.map_err(|e| D::Error::custom(format!("malformed '{item_type}' item: {e}")))
    }
}

/// One event of the thread stream, keyed by its `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadEvent {
    /// The thread is live; carries the thread identity used for resuming.
    ThreadStarted {
        /// The opaque thread identifier.
        thread_id: String,
    },
    /// A turn began.
    TurnStarted,
    /// The turn finished; terminal for a successful turn.
    TurnCompleted {
        /// Token usage for the turn, when reported as an object.
        usage: Option<Usage>,
    },
    /// The turn failed; terminal.
    TurnFailed {
        /// The failure payload, when well-formed.
        error: Option<ThreadError>,
    },
    /// An item started.
    ItemStarted {
        /// The item.
        item: ThreadItem,
    },
    /// An item was updated.
    ItemUpdated {
        /// The item.
        item: ThreadItem,
    },
    /// An item completed.
    ItemCompleted {
        /// The item.
        item: ThreadItem,
    },
    /// A stream-level error report.
    Error {
        /// Error message.
        message: String,
    },
    /// An event type this crate does not know about; kept verbatim for
    /// forward compatibility.
    Unknown {
        /// The unrecognized `type` tag.
        event_type: String,
        /// The raw event object.
        payload: Value,
    },
}

impl ThreadEvent {
    /// Returns the wire `type` tag of this event.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::ThreadStarted { .. } => "thread.started",
            Self::TurnStarted => "turn.started",
            Self::TurnCompleted { .. } => "turn.completed",
            Self::TurnFailed { .. } => "turn.failed",
            Self::ItemStarted { .. } => "item.started",
            Self::ItemUpdated { .. } => "item.updated",
            Self::ItemCompleted { .. } => "item.completed",
            Self::Error { .. } => "error",
            Self::Unknown { event_type, .. } => event_type,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn item_event<E: serde::de::Error>(obj: &serde_json::Map<String, Value>, tag: &str) -> std::result::Result<ThreadItem, E> {
    let item_value = obj
        .get("item")
        .cloned()
        .ok_or_else(|| E::custom(format!("malformed '{tag}' event: missing field 'item'")))?;
    serde_json::from_value(item_value).map_err(E::custom)
}

impl<'de> Deserialize<'de> for ThreadEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Value::Object(ref obj) = value else {
            return Err(D::Error::custom(format!(
                "expected object event, received {}",
                json_type_name(&value)
            )));
        };
        let event_type = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::custom("event is missing string field 'type'"))?
            .to_string();
        match event_type.as_str() {
            "thread.started" => {
                let thread_id = obj
                    .get("thread_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        D::Error::custom(
                            "malformed 'thread.started' event: missing string field 'thread_id'",
                        )
                    })?
                    .to_string();
                Ok(Self::ThreadStarted { thread_id })
            }
            "turn.started" => Ok(Self::TurnStarted),
            "turn.completed" => {
                let usage = obj
                    .get("usage")
                    .filter(|u| u.is_object())
                    .and_then(|u| serde_json::from_value(u.clone()).ok());
                Ok(Self::TurnCompleted { usage })
            }
            "turn.failed" => {
                let error = obj
                    .get("error")
                    .filter(|e| e.is_object())
                    .and_then(|e| serde_json::from_value(e.clone()).ok());
                Ok(Self::TurnFailed { error })
            }
            "item.started" => Ok(Self::ItemStarted {
                item: item_event(obj, "item.started")?,
            }),
            "item.updated" => Ok(Self::ItemUpdated {
                item: item_event(obj, "item.updated")?,
            }),
            "item.completed" => Ok(Self::ItemCompleted {
                item: item_event(obj, "item.completed")?,
            }),
            "error" => {
                let message = obj
                    .get("message")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        D::Error::custom("malformed 'error' event: missing string field 'message'")
                    })?
                    .to_string();
                Ok(Self::Error { message })
            }
            _ => Ok(Self::Unknown {
                event_type,
                payload: value,
            }),
        }
    }
}

impl Serialize for ThreadEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let value = match self {
            Self::ThreadStarted { thread_id } => {
                serde_json::json!({"type": "thread.started", "thread_id": thread_id})
            }
            Self::TurnStarted => serde_json::json!({"type": "turn.started"}),
            Self::TurnCompleted { usage } => {
                serde_json::json!({"type": "turn.completed", "usage": usage})
            }
            Self::TurnFailed { error } => {
                serde_json::json!({"type": "turn.failed", "error": error})
            }
            Self::ItemStarted { item } => {
                serde_json::json!({"type": "item.started", "item": item})
            }
            Self::ItemUpdated { item } => {
                serde_json::json!({"type": "item.updated", "item": item})
            }
            Self::ItemCompleted { item } => {
                serde_json::json!({"type": "item.completed", "item": item})
            }
            Self::Error { message } => serde_json::json!({"type": "error", "message": message}),
            Self::Unknown { payload, .. } => payload.clone(),
        };
        value.serialize(serializer)
    }
}

/// Parses one stdout line into a [`ThreadEvent`].
///
/// # Errors
///
/// Returns [`Error::Parse`] when the line is not valid JSON, is not a JSON
/// object, lacks a string `type` field, or carries a known tag with a
/// malformed payload. Unknown tags are not errors.
pub fn parse_thread_event(line: &str) -> Result<ThreadEvent> {
    let value: Value = serde_json::from_str(line).map_err(|_| Error::Parse {
        message: format!("failed to parse event: {line}"),
    })?;
    serde_json::from_value(value).map_err(|e| Error::Parse {
        message: e.to_string(),
    })
}
