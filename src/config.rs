//! Option bundles for the client, thread, and turn layers.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::overrides::ConfigOverrides;
use crate::signal::AbortSignal;

/// Sandbox policy enforced by the CLI for a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SandboxMode {
    /// The agent may read anything but write nothing.
    ReadOnly,
    /// The agent may write inside the workspace.
    WorkspaceWrite,
    /// No sandboxing at all.
    DangerFullAccess,
}

impl SandboxMode {
    /// Returns the CLI wire string for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::WorkspaceWrite => "workspace-write",
            Self::DangerFullAccess => "danger-full-access",
        }
    }
}

/// Approval policy for privileged agent actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApprovalMode {
    /// Never ask for approval.
    Never,
    /// Ask when the agent requests it.
    OnRequest,
    /// Ask after a failure.
    OnFailure,
    /// Ask for untrusted commands.
    Untrusted,
}

impl ApprovalMode {
    /// Returns the CLI wire string for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::OnRequest => "on-request",
            Self::OnFailure => "on-failure",
            Self::Untrusted => "untrusted",
        }
    }
}

/// Model reasoning effort level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasoningEffort {
    /// Minimal reasoning.
    Minimal,
    /// Low reasoning.
    Low,
    /// Medium reasoning.
    Medium,
    /// High reasoning.
    High,
}

impl ReasoningEffort {
    /// Returns the CLI wire string for this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Web search behavior for a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebSearchMode {
    /// Web search disabled.
    Disabled,
    /// Cached results only.
    Cached,
    /// Live web search.
    Live,
}

impl WebSearchMode {
    /// Returns the CLI wire string for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Cached => "cached",
            Self::Live => "live",
        }
    }
}

/// Client-level options shared by every thread started from one [`Codex`](crate::Codex).
#[derive(Debug, Clone, Default)]
pub struct CodexOptions {
    /// Explicit path to the `codex` executable. When unset, the bundled
    /// binary is tried first, then `codex` on `$PATH`.
    pub codex_path_override: Option<PathBuf>,
    /// Overrides the API base URL (`OPENAI_BASE_URL`).
    pub base_url: Option<String>,
    /// API key forwarded to the CLI (`CODEX_API_KEY`).
    pub api_key: Option<String>,
    /// Config overrides applied to every turn as `--config` arguments.
    pub config_overrides: Option<ConfigOverrides>,
    /// Replacement environment for the child process. When set, the ambient
    /// environment is not inherited at all.
    pub env_override: Option<HashMap<String, String>>,
}

impl CodexOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit executable path.
    #[must_use]
    pub fn with_codex_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.codex_path_override = Some(path.into());
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets client-wide config overrides.
    #[must_use]
    pub fn with_config_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.config_overrides = Some(overrides);
        self
    }

    /// Replaces the child process environment.
    #[must_use]
    pub fn with_env_override(mut self, env: HashMap<String, String>) -> Self {
        self.env_override = Some(env);
        self
    }
}

/// Per-thread options, fixed for the lifetime of a [`Thread`](crate::Thread).
#[derive(Debug, Clone, Default)]
pub struct ThreadOptions {
    /// Model override.
    pub model: Option<String>,
    /// Sandbox policy.
    pub sandbox_mode: Option<SandboxMode>,
    /// Working directory for the CLI process.
    pub working_directory: Option<PathBuf>,
    /// Extra writable directories inside the sandbox.
    pub additional_directories: Vec<PathBuf>,
    /// Skips the CLI's git repository safety check.
    pub skip_git_repo_check: bool,
    /// Model reasoning effort.
    pub model_reasoning_effort: Option<ReasoningEffort>,
    /// Enables or disables sandbox network access.
    pub network_access_enabled: Option<bool>,
    /// Web search mode. Takes precedence over [`Self::web_search_enabled`].
    pub web_search_mode: Option<WebSearchMode>,
    /// Legacy web search toggle: `true` maps to live, `false` to disabled.
    pub web_search_enabled: Option<bool>,
    /// Approval policy for privileged actions.
    pub approval_policy: Option<ApprovalMode>,
}

impl ThreadOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sandbox policy.
    #[must_use]
    pub const fn with_sandbox_mode(mut self, mode: SandboxMode) -> Self {
        self.sandbox_mode = Some(mode);
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Adds an extra writable directory.
    #[must_use]
    pub fn with_additional_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.additional_directories.push(dir.into());
        self
    }

    /// Skips the git repository safety check.
    #[must_use]
    pub const fn with_skip_git_repo_check(mut self) -> Self {
        self.skip_git_repo_check = true;
        self
    }

    /// Sets the reasoning effort.
    #[must_use]
    pub const fn with_model_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.model_reasoning_effort = Some(effort);
        self
    }

    /// Enables or disables sandbox network access.
    #[must_use]
    pub const fn with_network_access(mut self, enabled: bool) -> Self {
        self.network_access_enabled = Some(enabled);
        self
    }

    /// Sets the web search mode.
    #[must_use]
    pub const fn with_web_search_mode(mut self, mode: WebSearchMode) -> Self {
        self.web_search_mode = Some(mode);
        self
    }

    /// Sets the legacy web search toggle.
    #[must_use]
    pub const fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search_enabled = Some(enabled);
        self
    }

    /// Sets the approval policy.
    #[must_use]
    pub const fn with_approval_policy(mut self, policy: ApprovalMode) -> Self {
        self.approval_policy = Some(policy);
        self
    }
}

/// Per-turn options passed to [`Thread::run`](crate::Thread::run) and
/// [`Thread::run_streamed`](crate::Thread::run_streamed).
#[derive(Clone, Default)]
pub struct TurnOptions {
    /// JSON schema constraining the final agent message. Written to a
    /// private temp file and passed via `--output-schema`; removed once the
    /// turn finishes on any path.
    pub output_schema: Option<serde_json::Value>,
    /// Cancellation signal observed at the launcher's three checkpoints.
    pub signal: Option<Arc<dyn AbortSignal>>,
}

impl TurnOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output schema.
    #[must_use]
    pub fn with_output_schema(mut self, schema: serde_json::Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Sets the cancellation signal.
    #[must_use]
    pub fn with_signal(mut self, signal: Arc<dyn AbortSignal>) -> Self {
        self.signal = Some(signal);
        self
    }
}

impl fmt::Debug for TurnOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnOptions")
            .field("output_schema", &self.output_schema)
            .field("signal", &self.signal.as_ref().map(|_| "..."))
            .finish()
    }
}
