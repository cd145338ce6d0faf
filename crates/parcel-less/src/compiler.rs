//! Stylesheet compiler interface.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! The transform does not implement LESS itself. It drives a compiler
//! supplied by the host through [`LessCompiler`], and extends it with
//! [`LessPlugin`]s that install [`Visitor`]s (AST passes) and
//! [`FileManager`]s (import loaders).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::LessError;

/// Source location of a node, as the compiler tracks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Absolute path of the file the node was parsed from.
    pub filename: PathBuf,
}

/// A `url(...)` node in the compiler's AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlNode {
    /// The unquoted reference, e.g. `./icon.png`.
    pub value: String,
    pub current_file: FileInfo,
    rewritten: bool,
}

impl UrlNode {
    pub fn new(value: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self {
            value: value.into(),
            current_file: FileInfo {
                filename: filename.into(),
            },
            rewritten: false,
        }
    }

    /// Whether a visitor already replaced the value. Rewritten nodes are
    /// never rewritten again.
    pub fn is_rewritten(&self) -> bool {
        self.rewritten
    }

    pub fn mark_rewritten(&mut self) {
        self.rewritten = true;
    }
}

/// An AST pass run by the compiler after parsing.
pub trait Visitor: Send + Sync {
    /// Called once per `url()` node, in document order.
    fn visit_url(&self, node: &mut UrlNode) -> Result<(), LessError>;
}

/// A file handed back to the compiler for an `@import`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub contents: String,
    /// Absolute resolved path; the compiler uses it for nested imports and
    /// source map sources.
    pub filename: PathBuf,
}

/// Loads `@import`ed files for the compiler.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait FileManager: Send + Sync {
    /// Whether this manager handles the import. Managers are consulted in
    /// installation order.
    fn supports(&self, filename: &str, current_directory: &Path) -> bool;

    /// Whether synchronous loading is available. The compiler must use
    /// [`load_file`](FileManager::load_file) when this is false.
    fn supports_sync(&self, filename: &str, current_directory: &Path) -> bool;

    async fn load_file(
        &self,
        filename: &str,
        current_directory: &Path,
    ) -> Result<LoadedFile, LessError>;
}

/// Collects what plugins install.
#[derive(Default, Clone)]
pub struct PluginManager {
    visitors: Vec<Arc<dyn Visitor>>,
    file_managers: Vec<Arc<dyn FileManager>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_visitor(&mut self, visitor: Arc<dyn Visitor>) {
        self.visitors.push(visitor);
    }

    pub fn add_file_manager(&mut self, manager: Arc<dyn FileManager>) {
        self.file_managers.push(manager);
    }

    pub fn visitors(&self) -> &[Arc<dyn Visitor>] {
        &self.visitors
    }

    pub fn file_managers(&self) -> &[Arc<dyn FileManager>] {
        &self.file_managers
    }

    /// Run every visitor over one node.
    pub fn visit_url(&self, node: &mut UrlNode) -> Result<(), LessError> {
        for visitor in &self.visitors {
            visitor.visit_url(node)?;
        }
        Ok(())
    }

    /// First file manager that supports the import.
    pub fn file_manager_for(
        &self,
        filename: &str,
        current_directory: &Path,
    ) -> Option<&Arc<dyn FileManager>> {
        self.file_managers
            .iter()
            .find(|manager| manager.supports(filename, current_directory))
    }
}

/// A compiler extension.
pub trait LessPlugin: Send + Sync {
    /// Identifies the plugin; used to keep host plugins from duplicating
    /// built-in ones.
    fn name(&self) -> &str;

    fn install(&self, manager: &mut PluginManager);
}

/// Source map generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapOptions {
    /// Embed file contents in `sourcesContent`.
    pub output_source_files: bool,
}

/// Options passed to [`LessCompiler::render`].
#[derive(Clone, Default)]
pub struct CompilerOptions {
    /// Allow inline JavaScript in stylesheets. Always on.
    pub javascript_enabled: bool,

    /// Absolute path of the entry stylesheet.
    pub filename: PathBuf,

    /// Plugins in installation order.
    pub plugins: Vec<Arc<dyn LessPlugin>>,

    /// `None` when source maps are disabled.
    pub source_map: Option<SourceMapOptions>,

    /// Plugin names listed by the user config. The host compiler is
    /// responsible for loading them.
    pub config_plugins: Vec<String>,

    /// Remaining user config keys, passed through untouched.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CompilerOptions {
    /// Build a [`PluginManager`] with every plugin installed.
    pub fn plugin_manager(&self) -> PluginManager {
        let mut manager = PluginManager::new();
        for plugin in &self.plugins {
            plugin.install(&mut manager);
        }
        manager
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }
}

impl std::fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerOptions")
            .field("javascript_enabled", &self.javascript_enabled)
            .field("filename", &self.filename)
            .field("plugins", &self.plugin_names())
            .field("source_map", &self.source_map)
            .field("config_plugins", &self.config_plugins)
            .field("extra", &self.extra)
            .finish()
    }
}

/// What the compiler returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    pub css: String,
    /// Raw source map JSON.
    pub map: Option<String>,
    /// Absolute paths of every file imported while compiling.
    pub imports: Vec<PathBuf>,
}

/// A LESS compiler.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait LessCompiler: Send + Sync {
    async fn render(
        &self,
        source: &str,
        options: &CompilerOptions,
    ) -> Result<RenderOutput, LessError>;
}

/// Supplies the compiler for an asset.
///
/// Hosts that install the compiler per project (resolving it from the
/// asset's location) implement this; others use [`FixedCompilerProvider`].
pub trait CompilerProvider: Send + Sync {
    fn compiler_for(&self, asset_path: &Path) -> Result<Arc<dyn LessCompiler>, LessError>;
}

/// Always hands out the same compiler.
#[derive(Clone)]
pub struct FixedCompilerProvider {
    compiler: Arc<dyn LessCompiler>,
}

impl FixedCompilerProvider {
    pub fn new(compiler: Arc<dyn LessCompiler>) -> Self {
        Self { compiler }
    }
}

impl CompilerProvider for FixedCompilerProvider {
    fn compiler_for(&self, _asset_path: &Path) -> Result<Arc<dyn LessCompiler>, LessError> {
        Ok(Arc::clone(&self.compiler))
    }
}
