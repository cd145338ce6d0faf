//! Shared test support: a line-oriented stand-in for the LESS compiler.
//!
//! It understands just enough to exercise the transform:
//! - `@import "x";` lines are loaded through the installed file manager and
//!   inlined (recursively)
//! - every `url(...)` is handed to the installed visitors and replaced with
//!   the visited value
//! - `!error <message>` fails the compile with a positioned diagnostic
//!
//! Everything else is copied to the output as-is.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parcel_less::{
    CompilerOptions, FixedCompilerProvider, LessAsset, LessCompiler, LessError, RenderOutput,
    SystemRuntime, TransformOptions, UrlNode,
};
use serde_json::json;

#[derive(Default)]
pub struct ScriptedCompiler {
    seen: Mutex<Option<CompilerOptions>>,
}

impl ScriptedCompiler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Options passed to the most recent render.
    pub fn last_options(&self) -> Option<CompilerOptions> {
        self.seen.lock().unwrap().clone()
    }
}

struct Frame {
    filename: PathBuf,
    lines: std::vec::IntoIter<String>,
    line_number: usize,
}

impl Frame {
    fn new(filename: PathBuf, contents: &str) -> Self {
        Self {
            filename,
            lines: contents
                .lines()
                .map(str::to_string)
                .collect::<Vec<_>>()
                .into_iter(),
            line_number: 0,
        }
    }
}

#[async_trait]
impl LessCompiler for ScriptedCompiler {
    async fn render(
        &self,
        source: &str,
        options: &CompilerOptions,
    ) -> Result<RenderOutput, LessError> {
        *self.seen.lock().unwrap() = Some(options.clone());
        let manager = options.plugin_manager();

        let mut css = String::new();
        let mut imports = Vec::new();
        let mut sources = vec![(options.filename.clone(), source.to_string())];
        let mut stack = vec![Frame::new(options.filename.clone(), source)];

        while let Some(frame) = stack.last_mut() {
            let Some(line) = frame.lines.next() else {
                stack.pop();
                continue;
            };
            frame.line_number += 1;
            let trimmed = line.trim();

            if let Some(message) = trimmed.strip_prefix("!error ") {
                return Err(LessError::Compile {
                    message: message.to_string(),
                    filename: Some(frame.filename.clone()),
                    line: Some(frame.line_number),
                    column: Some(1),
                });
            }

            if let Some(target) = trimmed.strip_prefix("@import") {
                let target = target.trim().trim_end_matches(';').trim();
                let directory = frame
                    .filename
                    .parent()
                    .unwrap_or(Path::new("/"))
                    .to_path_buf();
                let file_manager = manager
                    .file_manager_for(target, &directory)
                    .ok_or_else(|| LessError::compile(format!("No file manager for {target}")))?;
                let loaded = file_manager.load_file(target, &directory).await?;
                imports.push(loaded.filename.clone());
                sources.push((loaded.filename.clone(), loaded.contents.clone()));
                stack.push(Frame::new(loaded.filename, &loaded.contents));
                continue;
            }

            let filename = frame.filename.clone();
            css.push_str(&rewrite_urls(&line, &filename, &manager)?);
            css.push('\n');
        }

        let map = options.source_map.map(|map_options| {
            let names: Vec<String> = sources
                .iter()
                .map(|(path, _)| path.to_string_lossy().into_owned())
                .collect();
            let mut map = json!({ "version": 3, "sources": names, "mappings": "" });
            if map_options.output_source_files {
                let contents: Vec<&str> = sources.iter().map(|(_, c)| c.as_str()).collect();
                map["sourcesContent"] = json!(contents);
            }
            map.to_string()
        });

        Ok(RenderOutput { css, map, imports })
    }
}

fn rewrite_urls(
    line: &str,
    filename: &Path,
    manager: &parcel_less::PluginManager,
) -> Result<String, LessError> {
    let mut out = String::new();
    let mut rest = line;
    while let Some(start) = rest.find("url(") {
        let after = &rest[start + 4..];
        let Some(end) = after.find(')') else {
            break;
        };
        let raw = after[..end].trim();
        let value = raw.trim_matches(|c| c == '"' || c == '\'');
        let mut node = UrlNode::new(value, filename);
        manager.visit_url(&mut node)?;
        out.push_str(&rest[..start]);
        out.push_str(&format!("url(\"{}\")", node.value));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// An asset at `path` compiled by `compiler`, rooted at `/project`.
pub fn asset(
    path: &str,
    runtime: Arc<dyn SystemRuntime>,
    compiler: Arc<ScriptedCompiler>,
) -> LessAsset {
    asset_with_options(path, TransformOptions::new("/project"), runtime, compiler)
}

pub fn asset_with_options(
    path: &str,
    options: TransformOptions,
    runtime: Arc<dyn SystemRuntime>,
    compiler: Arc<ScriptedCompiler>,
) -> LessAsset {
    LessAsset::new(
        path,
        options,
        runtime,
        Arc::new(FixedCompilerProvider::new(compiler)),
    )
    .expect("valid asset")
}

/// Install a subscriber once so `RUST_LOG=parcel_less=trace` shows events.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
