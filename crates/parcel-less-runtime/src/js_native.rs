/*
 * js_native.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * JavaScript execution for native targets using deno_core.
 *
 * This module provides a V8-based JavaScript runtime for evaluating
 * executable config files (`.lessrc.js`) in native (non-WASM) environments.
 *
 * IMPORTANT: This module is internal implementation detail.
 * deno_core/V8 types MUST NOT leak into the public API.
 *
 * A fresh JsEngine (V8 JsRuntime) is created for each evaluation because
 * JsRuntime is not Send+Sync and cannot be stored in NativeRuntime.
 */

// This module is only compiled for non-WASM targets
#![cfg(not(target_arch = "wasm32"))]

use std::path::Path;

use deno_core::v8;
use deno_core::{JsRuntime, RuntimeOptions};

use crate::traits::{RuntimeError, RuntimeResult};

/// JavaScript engine wrapper for native runtime.
///
/// This struct manages a deno_core JsRuntime instance with no extensions:
/// config modules get plain ECMAScript plus a CommonJS-style `module` object.
pub struct JsEngine {
    runtime: JsRuntime,
}

impl JsEngine {
    /// Create a new minimal JavaScript engine.
    pub fn new() -> RuntimeResult<Self> {
        let runtime = JsRuntime::new(RuntimeOptions::default());
        Ok(Self { runtime })
    }

    /// Evaluate a CommonJS config module and return `module.exports` as JSON.
    ///
    /// `require` is not available inside the module; calling it throws.
    /// A transpiled ES module default export (`__esModule` + `default`) is unwrapped.
    pub fn evaluate_config_module(
        &mut self,
        source: &str,
        filename: &Path,
    ) -> RuntimeResult<serde_json::Value> {
        let dirname = filename.parent().unwrap_or(filename);
        let escaped_filename = serde_json::to_string(&filename.to_string_lossy())
            .map_err(|e| RuntimeError::ScriptError(e.to_string()))?;
        let escaped_dirname = serde_json::to_string(&dirname.to_string_lossy())
            .map_err(|e| RuntimeError::ScriptError(e.to_string()))?;

        let script = format!(
            r#"
            (function() {{
                try {{
                    const module = {{ exports: {{}} }};
                    const require = function(id) {{
                        throw new Error("require('" + id + "') is not available in config modules");
                    }};
                    (function(module, exports, require, __filename, __dirname) {{
{source}
                    }})(module, module.exports, require, {escaped_filename}, {escaped_dirname});
                    let value = module.exports;
                    if (value && typeof value === "object" && value.__esModule && "default" in value) {{
                        value = value.default;
                    }}
                    const output = value === undefined ? null : JSON.parse(JSON.stringify(value));
                    return {{ success: true, output: output }};
                }} catch (e) {{
                    return {{ success: false, error: e.toString() }};
                }}
            }})()
            "#,
        );

        self.eval_and_extract_result(&script)
    }

    /// Execute JavaScript and extract the result from the standardized
    /// { success: bool, output?: any, error?: string } format.
    fn eval_and_extract_result(&mut self, script: &str) -> RuntimeResult<serde_json::Value> {
        let global = self
            .runtime
            .execute_script("<config-module>", script.to_string())
            .map_err(|e| RuntimeError::ScriptError(format!("Script execution failed: {}", e)))?;

        // Get a scope to work with the V8 value
        deno_core::scope!(scope, self.runtime);
        let local = v8::Local::new(scope, global);

        let mut result: serde_json::Value = serde_v8::from_v8(scope, local).map_err(|e| {
            RuntimeError::ScriptError(format!("Failed to deserialize result: {}", e))
        })?;

        if result["success"].as_bool() == Some(true) {
            Ok(result["output"].take())
        } else {
            let error = result["error"].as_str().unwrap_or("Unknown error");
            Err(RuntimeError::ScriptError(error.to_string()))
        }
    }
}
