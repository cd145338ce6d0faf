/*
 * native.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * NativeRuntime implementation with full filesystem access.
 *
 * Async reads go through tokio's blocking pool, so async methods must be
 * awaited from within a tokio runtime.
 */

#![cfg(not(target_arch = "wasm32"))]

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::js_native::JsEngine;
use crate::traits::{PathKind, RuntimeResult, SystemRuntime};

/// Runtime backed by the real filesystem and an embedded V8 engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SystemRuntime for NativeRuntime {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }

    async fn file_read_async(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        tracing::trace!(path = %path.display(), "Reading file");
        Ok(tokio::fs::read(path).await?)
    }

    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        Ok(match kind {
            None => true,
            Some(PathKind::File) => metadata.is_file(),
            Some(PathKind::Directory) => metadata.is_dir(),
        })
    }

    fn cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(std::env::current_dir()?)
    }

    fn js_available(&self) -> bool {
        true
    }

    async fn evaluate_config_module(
        &self,
        source: &str,
        filename: &Path,
    ) -> RuntimeResult<serde_json::Value> {
        tracing::debug!(path = %filename.display(), "Evaluating config module");
        let mut engine = JsEngine::new()?;
        engine.evaluate_config_module(source, filename)
    }
}
