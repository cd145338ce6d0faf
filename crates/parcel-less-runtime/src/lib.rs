/*
 * parcel-less-runtime
 * Copyright (c) 2025 Posit, PBC
 *
 * Runtime abstraction layer for the parcel-less transform.
 *
 * This crate provides a trait-based abstraction for the system operations
 * the LESS transform performs, allowing it to run in different execution
 * environments:
 *
 * - NativeRuntime: Real filesystem via tokio, V8 for config modules (native targets)
 * - MemoryRuntime: In-memory file system (all targets)
 */

mod js_native;
mod memory;
mod native;
mod traits;

// Re-export core types (API surface)
pub use traits::{PathKind, RuntimeError, RuntimeResult, SystemRuntime, normalize_path};

// Re-export runtime implementations
pub use memory::{MemoryRuntime, VirtualFileSystem};

#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeRuntime;

/// Create a default runtime for the current platform.
///
/// On native targets, this returns a NativeRuntime with full system access.
#[cfg(not(target_arch = "wasm32"))]
pub fn default_runtime() -> NativeRuntime {
    NativeRuntime::new()
}

/// Create a default runtime for the current platform.
///
/// On WASM targets there is no filesystem, so this returns an empty MemoryRuntime.
#[cfg(target_arch = "wasm32")]
pub fn default_runtime() -> MemoryRuntime {
    MemoryRuntime::new()
}
