//! Spawning `codex exec` and wiring up its standard streams.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::binary::resolve_executable;
use crate::config::{ApprovalMode, CodexOptions, ReasoningEffort, SandboxMode, WebSearchMode};
use crate::error::{Error, Result};
use crate::overrides::ConfigOverrides;
use crate::signal::{is_signal_aborted, AbortSignal};
use crate::stream::ExecStream;

/// Environment variable naming the integration that spawned the CLI.
pub(crate) const INTERNAL_ORIGINATOR_ENV: &str = "CODEX_INTERNAL_ORIGINATOR_OVERRIDE";
/// Originator value for this SDK.
pub(crate) const RUST_SDK_ORIGINATOR: &str = "codex_sdk_rs";

const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
const API_KEY_ENV: &str = "CODEX_API_KEY";

/// One launch request. All fields except `input` are optional; absence means
/// the corresponding flag is not passed.
#[derive(Default)]
pub(crate) struct ExecArgs {
    pub input: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub thread_id: Option<String>,
    pub images: Vec<PathBuf>,
    pub model: Option<String>,
    pub sandbox_mode: Option<SandboxMode>,
    pub working_directory: Option<PathBuf>,
    pub additional_directories: Vec<PathBuf>,
    pub skip_git_repo_check: bool,
    pub output_schema_file: Option<PathBuf>,
    pub model_reasoning_effort: Option<ReasoningEffort>,
    pub signal: Option<Arc<dyn AbortSignal>>,
    pub network_access_enabled: Option<bool>,
    pub web_search_mode: Option<WebSearchMode>,
    pub web_search_enabled: Option<bool>,
    pub approval_policy: Option<ApprovalMode>,
}

/// Launcher bound to one resolved executable plus client-wide overrides.
#[derive(Debug)]
pub(crate) struct CodexExec {
    executable_path: PathBuf,
    env_override: Option<HashMap<String, String>>,
    config_overrides: Option<ConfigOverrides>,
}

impl CodexExec {
    pub(crate) fn new(options: &CodexOptions) -> Result<Self> {
        let executable_path = resolve_executable(options.codex_path_override.as_deref())?;
        Ok(Self {
            executable_path,
            env_override: options.env_override.clone(),
            config_overrides: options.config_overrides.clone(),
        })
    }

    /// Spawns one `codex exec` run: writes the prompt, closes stdin, and
    /// returns the lazy stdout line stream. The cancellation signal is
    /// checked before spawning and again after the input is written.
    pub(crate) fn run(&self, args: ExecArgs) -> Result<ExecStream> {
        if is_signal_aborted(args.signal.as_ref()) {
            return Err(Error::AbortedBeforeStart);
        }

        let command_args = self.build_command_args(&args)?;
        let env = self.build_env(args.base_url.as_deref(), args.api_key.as_deref());
        debug!(
            executable = %self.executable_path.display(),
            args = ?command_args,
            "spawning codex exec"
        );

        let mut child = Command::new(&self.executable_path)
            .args(&command_args)
            .env_clear()
            .envs(&env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::SpawnFailed {
                path: self.executable_path.clone(),
                source,
            })?;

        let Some(mut stdin) = child.stdin.take() else {
            terminate_child(&mut child);
            return Err(Error::MissingPipe { stream: "stdin" });
        };
        let Some(stdout) = child.stdout.take() else {
            terminate_child(&mut child);
            return Err(Error::MissingPipe { stream: "stdout" });
        };
        let Some(mut stderr) = child.stderr.take() else {
            terminate_child(&mut child);
            return Err(Error::MissingPipe { stream: "stderr" });
        };

        if is_signal_aborted(args.signal.as_ref()) {
            terminate_child(&mut child);
            let mut discarded = String::new();
            let _ = stderr.read_to_string(&mut discarded);
            return Err(Error::AbortedBeforeStart);
        }

        // The full prompt must be flushed and the pipe closed before any
        // output is read, otherwise an unbuffered child can deadlock.
        if let Err(source) = stdin.write_all(args.input.as_bytes()) {
            terminate_child(&mut child);
            return Err(Error::StdinWriteFailed { source });
        }
        drop(stdin);

        let stderr_thread = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        });

        if is_signal_aborted(args.signal.as_ref()) {
            terminate_child(&mut child);
            // Drained but not reported: the child never produced output yet.
            let _ = stderr_thread.join();
            return Err(Error::Aborted {
                stderr: String::new(),
            });
        }

        Ok(ExecStream::new(child, stdout, stderr_thread, args.signal))
    }

    /// Builds the argument vector. Flag placement order is part of the CLI
    /// compatibility contract and must not change.
    fn build_command_args(&self, args: &ExecArgs) -> Result<Vec<String>> {
        let mut out = vec!["exec".to_string(), "--experimental-json".to_string()];

        if let Some(overrides) = &self.config_overrides {
            for entry in overrides.serialize()? {
                out.push("--config".to_string());
                out.push(entry);
            }
        }
        if let Some(model) = &args.model {
            out.push("--model".to_string());
            out.push(model.clone());
        }
        if let Some(mode) = args.sandbox_mode {
            out.push("--sandbox".to_string());
            out.push(mode.as_str().to_string());
        }
        if let Some(dir) = &args.working_directory {
            out.push("--cd".to_string());
            out.push(dir.display().to_string());
        }
        for dir in &args.additional_directories {
            out.push("--add-dir".to_string());
            out.push(dir.display().to_string());
        }
        if args.skip_git_repo_check {
            out.push("--skip-git-repo-check".to_string());
        }
        if let Some(path) = &args.output_schema_file {
            out.push("--output-schema".to_string());
            out.push(path.display().to_string());
        }
        if let Some(effort) = args.model_reasoning_effort {
            out.push("--config".to_string());
            out.push(format!("model_reasoning_effort=\"{}\"", effort.as_str()));
        }
        if let Some(enabled) = args.network_access_enabled {
            out.push("--config".to_string());
            out.push(format!(
                "sandbox_workspace_write.network_access={}",
                if enabled { "true" } else { "false" }
            ));
        }
        if let Some(mode) = args.web_search_mode {
            out.push("--config".to_string());
            out.push(format!("web_search=\"{}\"", mode.as_str()));
        } else if let Some(enabled) = args.web_search_enabled {
            out.push("--config".to_string());
            let mode = if enabled {
                WebSearchMode::Live
            } else {
                WebSearchMode::Disabled
            };
            out.push(format!("web_search=\"{}\"", mode.as_str()));
        }
        if let Some(policy) = args.approval_policy {
            out.push("--config".to_string());
            out.push(format!("approval_policy=\"{}\"", policy.as_str()));
        }
        if let Some(thread_id) = &args.thread_id {
            out.push("resume".to_string());
            out.push(thread_id.clone());
        }
        for image in &args.images {
            out.push("--image".to_string());
            out.push(image.display().to_string());
        }
        Ok(out)
    }

    /// Builds the child environment: either the caller-supplied replacement
    /// map or a copy of the ambient environment, never a mix of both.
    fn build_env(&self, base_url: Option<&str>, api_key: Option<&str>) -> HashMap<String, String> {
        let mut env = self
            .env_override
            .clone()
            .unwrap_or_else(|| std::env::vars().collect());
        env.entry(INTERNAL_ORIGINATOR_ENV.to_string())
            .or_insert_with(|| RUST_SDK_ORIGINATOR.to_string());
        if let Some(base_url) = base_url {
            env.insert(BASE_URL_ENV.to_string(), base_url.to_string());
        }
        if let Some(api_key) = api_key {
            env.insert(API_KEY_ENV.to_string(), api_key.to_string());
        }
        env
    }
}

/// Best-effort child teardown. Failures while killing or waiting are
/// swallowed; the abort path must not itself fail.
pub(crate) fn terminate_child(child: &mut Child) {
    if let Err(err) = child.kill() {
        warn!(error = %err, "failed to kill codex child");
    }
    let _ = child.wait();
}
