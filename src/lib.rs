//! # codex-driver
//!
//! A Rust client for the Codex CLI. It spawns `codex exec` as a subprocess,
//! writes the prompt to stdin, and parses the newline-delimited JSON events
//! from stdout into typed thread events. All agent reasoning, sandboxing,
//! and tool execution happen inside the external binary; this crate is the
//! process-exec and stream-protocol bridge.
//!
//! ## Features
//!
//! - Typed event and item model for the `--experimental-json` thread stream
//! - Multi-turn threads with resume via the CLI-assigned thread identity
//! - Structured config overrides flattened to `--config` arguments
//! - Cooperative cancellation with deterministic child teardown
//! - Per-turn output schemas through a self-cleaning temp file
//!
//! ## Example
//!
//! ```no_run
//! use codex_driver::{Codex, CodexOptions, ThreadOptions};
//!
//! fn main() -> codex_driver::Result<()> {
//!     let client = Codex::new(CodexOptions::new())?;
//!     let mut thread = client.start_thread(ThreadOptions::new());
//!     let result = thread.run("Summarize this repository")?;
//!     println!("{}", result.final_response);
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]

mod binary;
mod client;
mod config;
mod error;
mod events;
mod exec;
mod overrides;
mod signal;
mod stream;
mod thread;

pub use client::Codex;
pub use config::{
    ApprovalMode, CodexOptions, ReasoningEffort, SandboxMode, ThreadOptions, TurnOptions,
    WebSearchMode,
};
pub use error::{Error, Result};
pub use events::{
    parse_thread_event, AgentMessageItem, CommandExecutionItem, CommandExecutionStatus, ErrorItem,
    FileChangeItem, FileUpdateChange, McpToolCallError, McpToolCallItem, McpToolCallResult,
    McpToolCallStatus, PatchApplyStatus, PatchChangeKind, ReasoningItem, ThreadError, ThreadEvent,
    ThreadItem, TodoEntry, TodoListItem, Usage, WebSearchItem,
};
pub use overrides::{ConfigOverrides, ConfigValue};
pub use signal::{AbortSignal, CancelFlag};
pub use thread::{Input, RunResult, Thread, ThreadEventStream, UserInput};
