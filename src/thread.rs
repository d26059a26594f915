//! Thread handles: one conversation, one turn at a time.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;

use crate::config::{CodexOptions, ThreadOptions, TurnOptions};
use crate::error::{Error, Result};
use crate::events::{parse_thread_event, ThreadEvent, ThreadItem, Usage};
use crate::exec::{CodexExec, ExecArgs};
use crate::stream::ExecStream;

/// One part of a structured turn input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// A text block. Text blocks are joined with blank lines, in order.
    Text {
        /// The text.
        text: String,
    },
    /// A local image attached to the prompt.
    LocalImage {
        /// Path to the image file.
        path: PathBuf,
    },
}

/// Turn input: either one text block or an ordered list of typed parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A single prompt string.
    Text(String),
    /// Ordered structured parts.
    Items(Vec<UserInput>),
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<UserInput>> for Input {
    fn from(value: Vec<UserInput>) -> Self {
        Self::Items(value)
    }
}

fn normalize_input(input: Input) -> (String, Vec<PathBuf>) {
    match input {
        Input::Text(text) => (text, Vec::new()),
        Input::Items(items) => {
            let mut parts = Vec::new();
            let mut images = Vec::new();
            for item in items {
                match item {
                    UserInput::Text { text } => parts.push(text),
                    UserInput::LocalImage { path } => images.push(path),
                }
            }
            (parts.join("\n\n"), images)
        }
    }
}

/// The materialized outcome of one completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Completed items, in arrival order.
    pub items: Vec<ThreadItem>,
    /// The last agent message text seen, or empty if none arrived.
    pub final_response: String,
    /// Token usage from `turn.completed`, when reported.
    pub usage: Option<Usage>,
}

/// The output schema handed to the CLI through a temp file. The directory
/// and file are removed on drop, on every exit path.
struct OutputSchemaFile {
    _dir: TempDir,
    path: PathBuf,
}

fn create_output_schema_file(schema: Option<&Value>) -> Result<Option<OutputSchemaFile>> {
    let Some(schema) = schema else {
        return Ok(None);
    };
    if !schema.is_object() {
        return Err(Error::InvalidInput {
            message: "output schema must be a plain JSON object".to_string(),
        });
    }
    let dir = tempfile::Builder::new()
        .prefix("codex-output-schema-")
        .tempdir()
        .map_err(|source| Error::SchemaFile { source })?;
    let path = dir.path().join("schema.json");
    let rendered = serde_json::to_string(schema).map_err(|e| Error::InvalidInput {
        message: format!("output schema is not serializable: {e}"),
    })?;
    std::fs::write(&path, rendered).map_err(|source| Error::SchemaFile { source })?;
    Ok(Some(OutputSchemaFile { _dir: dir, path }))
}

/// A conversation with the agent, possibly spanning multiple turns.
///
/// The thread identity is assigned by the CLI: it stays `None` until the
/// first `thread.started` event of the first run and is passed back as the
/// resume target on every later run. Turns are strictly sequential per
/// thread; `run` and `run_streamed` take `&mut self`, so a second turn
/// cannot start while one is in flight.
#[derive(Debug)]
pub struct Thread {
    exec: Arc<CodexExec>,
    options: CodexOptions,
    thread_options: ThreadOptions,
    id: Option<String>,
}

impl Thread {
    pub(crate) fn new(
        exec: Arc<CodexExec>,
        options: CodexOptions,
        thread_options: ThreadOptions,
        id: Option<String>,
    ) -> Self {
        Self {
            exec,
            options,
            thread_options,
            id,
        }
    }

    /// Returns the thread identity, once the CLI has assigned one.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Runs one turn to completion and aggregates the result.
    ///
    /// # Errors
    ///
    /// Fails on spawn/IO errors, abort, malformed events, a `turn.failed`
    /// event (carrying its message), or a stream that ends without a
    /// terminal turn event.
    pub fn run(&mut self, input: impl Into<Input>) -> Result<RunResult> {
        self.run_with(input, TurnOptions::default())
    }

    /// Like [`Thread::run`] with explicit per-turn options.
    ///
    /// # Errors
    ///
    /// See [`Thread::run`].
    pub fn run_with(&mut self, input: impl Into<Input>, turn_options: TurnOptions) -> Result<RunResult> {
        let stream = self.run_streamed_with(input, turn_options)?;
        let mut items = Vec::new();
        let mut final_response = String::new();
        let mut usage = None;
        let mut completed = false;
        for event in stream {
            match event? {
                ThreadEvent::ItemCompleted { item } => {
                    // Later agent messages supersede earlier ones.
                    if let ThreadItem::AgentMessage(message) = &item {
                        final_response.clone_from(&message.text);
                    }
                    items.push(item);
                }
                ThreadEvent::TurnCompleted { usage: turn_usage } => {
                    completed = true;
                    if turn_usage.is_some() {
                        usage = turn_usage;
                    }
                }
                ThreadEvent::TurnFailed { error } => {
                    return Err(Error::TurnFailed {
                        message: error
                            .map_or_else(|| "turn failed".to_string(), |e| e.message),
                    });
                }
                _ => {}
            }
        }
        if !completed {
            return Err(Error::Disconnected);
        }
        Ok(RunResult {
            items,
            final_response,
            usage,
        })
    }

    /// Runs one turn and yields its events lazily.
    ///
    /// # Errors
    ///
    /// Fails if the input or output schema is invalid, the signal is already
    /// set, or the process cannot be spawned. Event-level failures surface
    /// through the returned iterator.
    pub fn run_streamed(&mut self, input: impl Into<Input>) -> Result<ThreadEventStream<'_>> {
        self.run_streamed_with(input, TurnOptions::default())
    }

    /// Like [`Thread::run_streamed`] with explicit per-turn options.
    ///
    /// # Errors
    ///
    /// See [`Thread::run_streamed`].
    pub fn run_streamed_with(
        &mut self,
        input: impl Into<Input>,
        turn_options: TurnOptions,
    ) -> Result<ThreadEventStream<'_>> {
        let schema_file = create_output_schema_file(turn_options.output_schema.as_ref())?;
        let (prompt, images) = normalize_input(input.into());
        let exec_args = ExecArgs {
            input: prompt,
            base_url: self.options.base_url.clone(),
            api_key: self.options.api_key.clone(),
            thread_id: self.id.clone(),
            images,
            model: self.thread_options.model.clone(),
            sandbox_mode: self.thread_options.sandbox_mode,
            working_directory: self.thread_options.working_directory.clone(),
            additional_directories: self.thread_options.additional_directories.clone(),
            skip_git_repo_check: self.thread_options.skip_git_repo_check,
            output_schema_file: schema_file.as_ref().map(|f| f.path.clone()),
            model_reasoning_effort: self.thread_options.model_reasoning_effort,
            signal: turn_options.signal,
            network_access_enabled: self.thread_options.network_access_enabled,
            web_search_mode: self.thread_options.web_search_mode,
            web_search_enabled: self.thread_options.web_search_enabled,
            approval_policy: self.thread_options.approval_policy,
        };
        let lines = self.exec.run(exec_args)?;
        Ok(ThreadEventStream {
            thread: self,
            lines,
            _schema_file: schema_file,
            poisoned: false,
        })
    }
}

/// Lazy event iterator for one turn.
///
/// Consuming it updates the owning [`Thread`]'s identity when a
/// `thread.started` event passes through, whether or not the caller
/// aggregates. Dropping it early tears the child process down and removes
/// the output-schema temp file.
pub struct ThreadEventStream<'a> {
    thread: &'a mut Thread,
    lines: ExecStream,
    _schema_file: Option<OutputSchemaFile>,
    poisoned: bool,
}

impl Iterator for ThreadEventStream<'_> {
    type Item = Result<ThreadEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(err) => {
                self.poisoned = true;
                return Some(Err(err));
            }
        };
        match parse_thread_event(&line) {
            Ok(event) => {
                if let ThreadEvent::ThreadStarted { thread_id } = &event {
                    self.thread.id = Some(thread_id.clone());
                }
                Some(Ok(event))
            }
            Err(err) => {
                self.poisoned = true;
                Some(Err(err))
            }
        }
    }
}
