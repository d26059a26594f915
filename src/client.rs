//! Top-level client entrypoint.

use std::sync::Arc;

use crate::config::{CodexOptions, ThreadOptions};
use crate::error::{Error, Result};
use crate::exec::CodexExec;
use crate::thread::Thread;

/// Entry point for interacting with Codex threads.
///
/// Resolves the `codex` executable once at construction; every thread
/// started from the same client shares that resolution plus the
/// client-level options (base URL, API key, config overrides, environment).
#[derive(Debug)]
pub struct Codex {
    exec: Arc<CodexExec>,
    options: CodexOptions,
}

impl Codex {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BinaryNotFound`] when no explicit path is given and
    /// neither a bundled binary nor `codex` on `$PATH` can be found.
    pub fn new(options: CodexOptions) -> Result<Self> {
        let exec = Arc::new(CodexExec::new(&options)?);
        Ok(Self { exec, options })
    }

    /// Starts a new thread. Its identity is assigned by the CLI on the
    /// first run.
    #[must_use]
    pub fn start_thread(&self, options: ThreadOptions) -> Thread {
        Thread::new(Arc::clone(&self.exec), self.options.clone(), options, None)
    }

    /// Resumes an existing thread by identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `id` is empty.
    pub fn resume_thread(&self, id: impl Into<String>, options: ThreadOptions) -> Result<Thread> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidInput {
                message: "thread id must be non-empty".to_string(),
            });
        }
        Ok(Thread::new(
            Arc::clone(&self.exec),
            self.options.clone(),
            options,
            Some(id),
        ))
    }
}
