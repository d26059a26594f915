//! Locating the `codex` executable.
//!
//! Resolution order: explicit override, bundled platform binary under
//! `vendor/<triple>/codex/` next to the current executable, then `codex` on
//! `$PATH`. Installing the bundled binary is an external concern; this module
//! only looks it up.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Maps an OS/arch pair to the release target triple for the bundled binary.
pub(crate) fn resolve_target_triple(os: &str, arch: &str) -> Result<String> {
    let triple = match (os, arch) {
        ("linux" | "android", "x86_64") => "x86_64-unknown-linux-musl",
        ("linux" | "android", "aarch64") => "aarch64-unknown-linux-musl",
        ("macos", "x86_64") => "x86_64-apple-darwin",
        ("macos", "aarch64") => "aarch64-apple-darwin",
        ("windows", "x86_64") => "x86_64-pc-windows-msvc",
        ("windows", "aarch64") => "aarch64-pc-windows-msvc",
        _ => {
            return Err(Error::BinaryNotFound {
                details: format!("unsupported platform: {os} ({arch})"),
            })
        }
    };
    Ok(triple.to_string())
}

fn bundled_path_in(root: &Path, triple: &str) -> PathBuf {
    let binary_name = if triple.contains("windows") {
        "codex.exe"
    } else {
        "codex"
    };
    root.join("vendor").join(triple).join("codex").join(binary_name)
}

/// Returns the bundled binary path for the current platform, or an error
/// describing why it is unavailable.
pub(crate) fn bundled_codex_path() -> Result<PathBuf> {
    let triple = resolve_target_triple(env::consts::OS, env::consts::ARCH)?;
    let exe = env::current_exe().map_err(|e| Error::BinaryNotFound {
        details: format!("cannot determine current executable location: {e}"),
    })?;
    let root = exe.parent().ok_or_else(|| Error::BinaryNotFound {
        details: "current executable has no parent directory".to_string(),
    })?;
    let candidate = bundled_path_in(root, &triple);
    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(Error::BinaryNotFound {
            details: format!(
                "bundled codex binary not found at {}; install a platform bundle or set codex_path_override",
                candidate.display()
            ),
        })
    }
}

/// Resolves the executable to spawn.
pub(crate) fn resolve_executable(path_override: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = path_override {
        return Ok(path.to_path_buf());
    }
    match bundled_codex_path() {
        Ok(path) => Ok(path),
        Err(bundled_error) => which::which("codex").map_err(|_| Error::BinaryNotFound {
            details: format!("{bundled_error}; also failed to find `codex` on PATH"),
        }),
    }
}
