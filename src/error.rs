//! Error types for the codex-driver library.

use std::io;
use std::path::PathBuf;

/// The result type for codex-driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, spawning, or talking to the Codex CLI.
///
/// Nothing in this crate is retried automatically; every variant is terminal
/// for the current call and the caller decides whether to retry a whole turn.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable `codex` executable could be located.
    #[error("codex binary not found: {details}")]
    BinaryNotFound {
        /// Description of the locations that were tried.
        details: String,
    },

    /// Failed to spawn the CLI process.
    #[error("failed to spawn codex executable at '{}': {source}", .path.display())]
    SpawnFailed {
        /// The executable path that was attempted.
        path: PathBuf,
        /// The underlying IO error.
        source: io::Error,
    },

    /// A standard stream was unavailable after spawning the child.
    #[error("child process has no {stream} pipe")]
    MissingPipe {
        /// Which stream was missing.
        stream: &'static str,
    },

    /// Failed to write the prompt to the process stdin.
    #[error("failed to write input to codex process: {source}")]
    StdinWriteFailed {
        /// The underlying IO error.
        source: io::Error,
    },

    /// Failed to read from the process stdout.
    #[error("failed to read codex output: {source}")]
    StdoutReadFailed {
        /// The underlying IO error.
        source: io::Error,
    },

    /// Failed to wait for the process to exit.
    #[error("failed to wait for codex process: {source}")]
    WaitFailed {
        /// The underlying IO error.
        source: io::Error,
    },

    /// The CLI process exited with a non-zero status.
    #[error(
        "codex exec exited with code {}: {stderr}",
        .exit_code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
    )]
    ProcessFailed {
        /// The exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// Captured stderr output.
        stderr: String,
    },

    /// The cancellation signal was already set before the child was spawned.
    #[error("codex exec aborted before start")]
    AbortedBeforeStart,

    /// The run was cancelled after the child was spawned.
    #[error("{}", abort_message(.stderr))]
    Aborted {
        /// Stderr captured while tearing the child down.
        stderr: String,
    },

    /// A stdout line could not be parsed into a thread event.
    #[error("{message}")]
    Parse {
        /// Description of the offending line or shape.
        message: String,
    },

    /// The stream carried a `turn.failed` event.
    #[error("{message}")]
    TurnFailed {
        /// The failure message reported by the CLI.
        message: String,
    },

    /// The stream ended without a terminal turn event.
    #[error("stream disconnected before completion")]
    Disconnected,

    /// A caller-supplied value failed validation before any process was spawned.
    #[error("{message}")]
    InvalidInput {
        /// Description of the invalid value.
        message: String,
    },

    /// A config override tree failed validation.
    #[error("{message}")]
    InvalidConfig {
        /// Description of the invalid override.
        message: String,
    },

    /// Failed to materialize the output-schema temp file.
    #[error("failed to write output schema file: {source}")]
    SchemaFile {
        /// The underlying IO error.
        source: io::Error,
    },
}

fn abort_message(stderr: &str) -> String {
    if stderr.is_empty() {
        "codex exec aborted".to_string()
    } else {
        format!("codex exec aborted: {stderr}")
    }
}
