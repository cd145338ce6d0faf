//! The LESS asset transform.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A [`LessAsset`] is one `.less` file moving through the bundler:
//!
//! 1. [`load_options`](LessAsset::load_options): find the compiler and the
//!    user's config (`package.json` `"less"` key, `.lessrc`, `.lessrc.js`)
//! 2. [`compile`](LessAsset::compile): render with the URL plugin installed,
//!    so imports resolve through the bundler and `url()` references become
//!    dependencies
//! 3. [`collect_dependencies`](LessAsset::collect_dependencies): record every
//!    imported file as an edge
//! 4. [`generate`](LessAsset::generate): hand CSS and a root-relative source
//!    map back to the host
//!
//! [`process`](LessAsset::process) runs all four. Any error leaves the asset
//! in [`AssetStage::Failed`] and produces no output. Running a finished
//! (`Generated` or `Failed`) asset again starts over: options are reloaded
//! and the previous compilation's edges are dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parcel_less::{FixedCompilerProvider, LessAsset, TransformOptions};
//!
//! let mut asset = LessAsset::new(
//!     "/project/src/main.less",
//!     TransformOptions::new("/project"),
//!     Arc::new(parcel_less_runtime::default_runtime()),
//!     Arc::new(FixedCompilerProvider::new(compiler)),
//! )?;
//! let generated = asset.process(&source).await?;
//! for dep in asset.dependencies() {
//!     watcher.watch(&dep.name);
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parcel_less_runtime::SystemRuntime;
use serde::Serialize;
use serde_json::Value;

use crate::compiler::{
    CompilerOptions, CompilerProvider, LessCompiler, LessPlugin, RenderOutput, SourceMapOptions,
};
use crate::config::{ConfigLookup, ConfigOptions, ConfigResolver, FsConfigResolver};
use crate::dependency::{BundleNamer, Dependency, DependencySet, HashedBundleNamer};
use crate::error::LessError;
use crate::options::TransformOptions;
use crate::resolver::{ModuleResolver, NodeResolver};
use crate::source_map::relativize_sources;
use crate::url_plugin::{URL_PLUGIN_NAME, UrlDependencies, UrlRewritePlugin};

/// Config files searched for, nearest directory first.
pub const CONFIG_FILENAMES: &[&str] = &[".lessrc", ".lessrc.js"];

/// `package.json` key holding inline LESS config.
pub const PACKAGE_KEY: &str = "less";

/// Config keys the transform sets itself.
const RESERVED_KEYS: &[&str] = &["javascriptEnabled", "filename", "plugins"];

/// Where an asset is in the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStage {
    Created,
    ConfigLoaded,
    Compiled,
    Generated,
    Failed,
}

/// Result handed back to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAsset {
    /// Always `"css"`.
    #[serde(rename = "type")]
    pub asset_type: String,

    pub value: String,

    /// Always false: dependencies were registered while compiling and the
    /// CSS contains no further references for the host to parse.
    pub has_dependencies: bool,

    pub map: Option<Value>,
}

/// One LESS file being transformed.
pub struct LessAsset {
    name: PathBuf,
    options: TransformOptions,
    pub(crate) runtime: Arc<dyn SystemRuntime>,
    pub(crate) config_resolver: Arc<dyn ConfigResolver>,
    resolver: Arc<dyn ModuleResolver>,
    namer: Arc<dyn BundleNamer>,
    compilers: Arc<dyn CompilerProvider>,
    plugins: Vec<Arc<dyn LessPlugin>>,
    dependencies: Arc<DependencySet>,
    stage: AssetStage,
    loaded: Option<(Arc<dyn LessCompiler>, CompilerOptions)>,
}

impl LessAsset {
    /// Create an asset for the absolute path `name`.
    ///
    /// Config is read through an [`FsConfigResolver`], imports resolve with
    /// a [`NodeResolver`] rooted at `options.root_dir`, and `url()` targets
    /// are named by a [`HashedBundleNamer`]. Each can be replaced with the
    /// `with_*` builders.
    pub fn new(
        name: impl Into<PathBuf>,
        options: TransformOptions,
        runtime: Arc<dyn SystemRuntime>,
        compilers: Arc<dyn CompilerProvider>,
    ) -> Result<Self, LessError> {
        let name = name.into();
        options.validate()?;
        if !name.is_absolute() {
            return Err(LessError::InvalidOptions(format!(
                "asset path must be absolute, got {}",
                name.display()
            )));
        }

        Ok(Self {
            config_resolver: Arc::new(FsConfigResolver::new(Arc::clone(&runtime))),
            resolver: Arc::new(NodeResolver::new(
                Arc::clone(&runtime),
                options.root_dir.clone(),
            )),
            namer: Arc::new(HashedBundleNamer::new(options.root_dir.clone())),
            name,
            options,
            runtime,
            compilers,
            plugins: Vec::new(),
            dependencies: Arc::new(DependencySet::new()),
            stage: AssetStage::Created,
            loaded: None,
        })
    }

    pub fn with_config_resolver(mut self, resolver: Arc<dyn ConfigResolver>) -> Self {
        self.config_resolver = resolver;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_bundle_namer(mut self, namer: Arc<dyn BundleNamer>) -> Self {
        self.namer = namer;
        self
    }

    /// Add a host plugin. A plugin named like the built-in URL plugin is
    /// ignored when options are built.
    pub fn with_plugin(mut self, plugin: Arc<dyn LessPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn name(&self) -> &Path {
        &self.name
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub fn stage(&self) -> AssetStage {
        self.stage
    }

    /// Registered edges in registration order.
    pub fn dependencies(&self) -> Vec<Dependency> {
        self.dependencies.to_vec()
    }

    /// Register an edge. Re-registering a name replaces the previous edge.
    pub fn add_dependency(&self, dependency: Dependency) {
        tracing::trace!(
            asset = %self.name.display(),
            dependency = %dependency.name,
            "Adding dependency"
        );
        self.dependencies.add(dependency);
    }

    /// Register a `url()` reference found in `from` and return the URL it
    /// should be replaced with.
    pub fn add_url_dependency(&self, url: &str, from: &Path) -> Result<String, LessError> {
        self.url_dependencies().register(url, from)
    }

    fn url_dependencies(&self) -> UrlDependencies {
        UrlDependencies::new(
            &self.name,
            self.options.public_url.clone(),
            Arc::clone(&self.resolver),
            Arc::clone(&self.namer),
            Arc::clone(&self.dependencies),
        )
    }

    /// Forget loaded options and every registered edge, returning the asset
    /// to [`AssetStage::Created`]. Called by the host when a watched
    /// dependency changes; [`process`](Self::process) also does this itself
    /// when run on a finished asset.
    pub fn invalidate(&mut self) {
        tracing::debug!(asset = %self.name.display(), "Invalidated");
        self.loaded = None;
        self.dependencies.clear();
        self.stage = AssetStage::Created;
    }

    /// Resolve the compiler and build its options. Within one compilation
    /// later calls return the options from the first successful call.
    pub async fn load_options(&mut self) -> Result<CompilerOptions, LessError> {
        let (_, options) = self.loaded().await?;
        Ok(options)
    }

    /// Compile `code`, loading options first if needed.
    ///
    /// Files imported during compilation are registered before this returns.
    pub async fn compile(&mut self, code: &str) -> Result<RenderOutput, LessError> {
        let (compiler, options) = self.loaded().await?;

        tracing::debug!(asset = %self.name.display(), "Compiling");
        let result = compiler.render(code, &options).await;
        let output = self.track(result)?;

        self.collect_dependencies(&output);
        self.stage = AssetStage::Compiled;
        tracing::debug!(
            asset = %self.name.display(),
            imports = output.imports.len(),
            "Compiled"
        );
        Ok(output)
    }

    /// Register each imported file as an `included_in_parent` edge.
    pub fn collect_dependencies(&self, output: &RenderOutput) {
        for import in &output.imports {
            self.add_dependency(Dependency::import(import.to_string_lossy()));
        }
    }

    /// Register the compile result's imports and produce the host-facing
    /// result. Without a compile result the CSS is empty and there is no map.
    pub fn generate(&mut self, output: Option<&RenderOutput>) -> Result<GeneratedAsset, LessError> {
        if let Some(output) = output {
            self.collect_dependencies(output);
        }
        let map = output
            .and_then(|output| output.map.as_deref())
            .map(|raw| relativize_sources(raw, &self.options.root_dir))
            .transpose();
        let map = self.track(map)?;

        self.stage = AssetStage::Generated;
        tracing::debug!(asset = %self.name.display(), "Generated");
        Ok(GeneratedAsset {
            asset_type: "css".to_string(),
            value: output.map(|output| output.css.clone()).unwrap_or_default(),
            has_dependencies: false,
            map,
        })
    }

    /// Run every stage on `code`.
    pub async fn process(&mut self, code: &str) -> Result<GeneratedAsset, LessError> {
        self.load_options().await?;
        let output = self.compile(code).await?;
        self.generate(Some(&output))
    }

    async fn loaded(&mut self) -> Result<(Arc<dyn LessCompiler>, CompilerOptions), LessError> {
        // A finished asset starts a fresh compilation
        if matches!(self.stage, AssetStage::Generated | AssetStage::Failed) {
            self.invalidate();
        }
        if let Some(loaded) = &self.loaded {
            return Ok(loaded.clone());
        }
        let result = self.build_options().await;
        let loaded = self.track(result)?;
        self.loaded = Some(loaded.clone());
        self.stage = AssetStage::ConfigLoaded;
        tracing::debug!(
            asset = %self.name.display(),
            plugins = ?loaded.1.plugin_names(),
            "Options loaded"
        );
        Ok(loaded)
    }

    async fn build_options(&self) -> Result<(Arc<dyn LessCompiler>, CompilerOptions), LessError> {
        let compiler = self.compilers.compiler_for(&self.name)?;
        let config = self
            .get_config(CONFIG_FILENAMES, ConfigOptions::package_key(PACKAGE_KEY))
            .await?
            .and_then(ConfigLookup::into_value)
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        Ok((compiler, self.compiler_options(config)?))
    }

    fn compiler_options(&self, config: Value) -> Result<CompilerOptions, LessError> {
        let Value::Object(mut config) = config else {
            return Err(LessError::InvalidOptions(format!(
                "LESS config for {} must be an object",
                self.name.display()
            )));
        };

        let config_plugins = match config.remove("plugins") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(name) => Ok(name),
                    other => Err(LessError::InvalidOptions(format!(
                        "LESS config plugins must be names, got {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(LessError::InvalidOptions(format!(
                    "LESS config plugins must be an array, got {other}"
                )));
            }
        };

        let source_map = self.options.source_maps.then_some(SourceMapOptions {
            output_source_files: true,
        });
        if source_map.is_some() {
            config.remove("sourceMap");
        }

        let extra: BTreeMap<String, Value> = config
            .into_iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .collect();

        let mut plugins: Vec<Arc<dyn LessPlugin>> = self
            .plugins
            .iter()
            .filter(|plugin| plugin.name() != URL_PLUGIN_NAME)
            .cloned()
            .collect();
        plugins.push(Arc::new(UrlRewritePlugin::new(
            Arc::new(self.url_dependencies()),
            Arc::clone(&self.resolver),
            Arc::clone(&self.runtime),
        )));

        Ok(CompilerOptions {
            javascript_enabled: true,
            filename: self.name.clone(),
            plugins,
            source_map,
            config_plugins,
            extra,
        })
    }

    /// Move to `Failed` on error.
    fn track<T>(&mut self, result: Result<T, LessError>) -> Result<T, LessError> {
        if let Err(e) = &result {
            tracing::debug!(asset = %self.name.display(), error = %e, "Transform failed");
            self.stage = AssetStage::Failed;
        }
        result
    }
}
