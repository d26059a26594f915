//! Lazy line stream over the child's stdout.

use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::trace;

use crate::error::{Error, Result};
use crate::exec::terminate_child;
use crate::signal::{is_signal_aborted, AbortSignal};

/// A single-pass iterator of trimmed stdout lines from one `codex exec` run.
///
/// The prompt has already been written and stdin closed by the time this
/// exists. Each `next` call checks the cancellation signal before reading.
/// On normal exhaustion the child is reaped and a non-zero exit becomes an
/// error carrying the exit code and drained stderr. Dropping the stream
/// early kills the child so a consumer that stops iterating never leaks the
/// process.
pub(crate) struct ExecStream {
    child: Child,
    stdout: Option<BufReader<ChildStdout>>,
    stderr_thread: Option<JoinHandle<String>>,
    signal: Option<Arc<dyn AbortSignal>>,
    done: bool,
}

impl ExecStream {
    pub(crate) fn new(
        child: Child,
        stdout: ChildStdout,
        stderr_thread: JoinHandle<String>,
        signal: Option<Arc<dyn AbortSignal>>,
    ) -> Self {
        Self {
            child,
            stdout: Some(BufReader::new(stdout)),
            stderr_thread: Some(stderr_thread),
            signal,
            done: false,
        }
    }

    fn join_stderr(&mut self) -> String {
        self.stderr_thread
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }

    /// Kills the child and returns whatever stderr it produced.
    fn teardown(&mut self) -> String {
        self.stdout = None;
        terminate_child(&mut self.child);
        self.join_stderr()
    }

    /// Handles clean EOF: reap the child and surface a non-zero exit.
    fn finish(&mut self) -> Option<Result<String>> {
        self.stdout = None;
        let status = match self.child.wait() {
            Ok(status) => status,
            Err(source) => {
                let _ = self.join_stderr();
                return Some(Err(Error::WaitFailed { source }));
            }
        };
        let stderr = self.join_stderr();
        if status.success() {
            None
        } else {
            Some(Err(Error::ProcessFailed {
                exit_code: status.code(),
                stderr,
            }))
        }
    }
}

impl Iterator for ExecStream {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if is_signal_aborted(self.signal.as_ref()) {
                self.done = true;
                let stderr = self.teardown();
                return Some(Err(Error::Aborted { stderr }));
            }
            let Some(reader) = self.stdout.as_mut() else {
                self.done = true;
                return None;
            };
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    self.done = true;
                    return self.finish();
                }
                Ok(_) => {
                    let trimmed = line.trim_end_matches(['\r', '\n']);
                    if trimmed.is_empty() {
                        continue;
                    }
                    trace!(line = trimmed, "codex event line");
                    return Some(Ok(trimmed.to_string()));
                }
                Err(source) => {
                    self.done = true;
                    let _ = self.teardown();
                    return Some(Err(Error::StdoutReadFailed { source }));
                }
            }
        }
    }
}

impl Drop for ExecStream {
    fn drop(&mut self) {
        self.stdout = None;
        terminate_child(&mut self.child);
        if let Some(handle) = self.stderr_thread.take() {
            let _ = handle.join();
        }
    }
}
