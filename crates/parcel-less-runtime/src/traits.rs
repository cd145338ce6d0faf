/*
 * traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Defines the SystemRuntime trait and supporting types for the runtime abstraction layer.
 *
 * This abstraction allows the LESS transform to run in different execution environments:
 * - NativeRuntime: Full system access using std and tokio
 * - MemoryRuntime: In-memory file system for tests and sandboxed hosts
 */

use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug)]
pub enum RuntimeError {
    /// Standard I/O error
    Io(io::Error),

    /// Operation not supported on this runtime (e.g., JS evaluation without an engine)
    NotSupported(String),

    /// A config module threw or could not be evaluated
    ScriptError(String),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::Io(e) => write!(f, "I/O error: {}", e),
            RuntimeError::NotSupported(msg) => write!(f, "Operation not supported: {}", msg),
            RuntimeError::ScriptError(msg) => write!(f, "Script evaluation error: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self {
        RuntimeError::Io(e)
    }
}

impl RuntimeError {
    /// Whether this error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// Type of filesystem path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// Lexically normalize a path: drop `.` components and resolve `..` against
/// the preceding component. Never climbs above the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(Component::RootDir);
                }
            }
            Component::CurDir => {}
            other => {
                normalized.push(other);
            }
        }
    }
    if normalized.as_os_str().is_empty() {
        normalized.push(Component::RootDir);
    }
    normalized
}

/// Trait defining the runtime operations the LESS transform needs.
///
/// Implementations provide the actual system interaction, allowing for
/// different behavior based on target (native, in-memory).
///
/// ## JavaScript Execution
///
/// The trait exposes a purpose-specific entry point
/// ([`evaluate_config_module`](SystemRuntime::evaluate_config_module)), not a
/// generic `eval()`. No deno_core or V8 types leak into the trait definition.
///
/// ## Async Trait Send Bounds
///
/// On native targets, async methods produce `Send` futures (required for multi-threaded async).
/// On WASM, async methods produce `?Send` futures.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait SystemRuntime: Send + Sync {
    // ═══════════════════════════════════════════════════════════════════════
    // FILE OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════

    /// Read entire file contents as bytes.
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Read file as string with UTF-8 encoding.
    ///
    /// Default implementation reads bytes and converts to string.
    fn file_read_string(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.file_read(path)?;
        decode_utf8(bytes)
    }

    /// Read entire file contents without blocking the executor.
    ///
    /// Default implementation delegates to the blocking [`file_read`](SystemRuntime::file_read).
    async fn file_read_async(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        self.file_read(path)
    }

    /// Async variant of [`file_read_string`](SystemRuntime::file_read_string).
    async fn file_read_string_async(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.file_read_async(path).await?;
        decode_utf8(bytes)
    }

    /// Check if path exists, optionally filtering by type.
    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool>;

    /// Check if path exists and is a file.
    fn is_file(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::File))
    }

    /// Check if path exists and is a directory.
    fn is_dir(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::Directory))
    }

    /// Get current working directory.
    fn cwd(&self) -> RuntimeResult<PathBuf>;

    // ═══════════════════════════════════════════════════════════════════════
    // JAVASCRIPT EXECUTION
    // ═══════════════════════════════════════════════════════════════════════

    /// Check if JavaScript execution is available on this runtime.
    ///
    /// Default: returns `false` (JS not available).
    fn js_available(&self) -> bool {
        false
    }

    /// Evaluate a CommonJS config module and return its `module.exports`.
    ///
    /// The module sees `module`, `exports`, `__filename` and `__dirname`.
    /// The exported value is converted to JSON, so functions and other
    /// non-serializable members are dropped.
    ///
    /// # Returns
    ///
    /// The exported value on success, `RuntimeError::ScriptError` if the module
    /// throws, or `RuntimeError::NotSupported` if JS is not available.
    async fn evaluate_config_module(
        &self,
        source: &str,
        filename: &Path,
    ) -> RuntimeResult<serde_json::Value> {
        let _ = (source, filename);
        Err(RuntimeError::NotSupported(
            "JavaScript execution is not available on this runtime".to_string(),
        ))
    }
}

fn decode_utf8(bytes: Vec<u8>) -> RuntimeResult<String> {
    String::from_utf8(bytes).map_err(|e| {
        RuntimeError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid UTF-8 in file: {}", e),
        ))
    })
}
