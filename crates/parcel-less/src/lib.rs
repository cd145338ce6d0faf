//! LESS asset transform for the Parcel bundler.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! This crate provides:
//! - The asset orchestrator ([`LessAsset`]) driving config, compile and generate
//! - Config discovery (`package.json`, `.lessrc`, `.lessrc.js`) with vendored-package rebasing
//! - Node-style import resolution and an `@import` file manager
//! - `url()` rewriting that registers referenced files as dependencies
//!
//! The LESS compiler itself is supplied by the host through [`LessCompiler`].

mod asset;
mod compiler;
mod config;
mod dependency;
mod error;
mod file_manager;
mod options;
mod package;
mod paths;
mod resolver;
mod source_map;
mod url_plugin;
mod vendor;

pub use asset::{AssetStage, CONFIG_FILENAMES, GeneratedAsset, LessAsset, PACKAGE_KEY};
pub use compiler::{
    CompilerOptions, CompilerProvider, FileInfo, FileManager, FixedCompilerProvider,
    LessCompiler, LessPlugin, LoadedFile, PluginManager, RenderOutput, SourceMapOptions, UrlNode,
    Visitor,
};
pub use config::{ConfigFormat, ConfigLookup, ConfigOptions, ConfigResolver, FsConfigResolver};
pub use dependency::{BundleNamer, Dependency, DependencyKind, DependencySet, HashedBundleNamer};
pub use error::LessError;
pub use file_manager::{LessFileManager, normalize_import_specifier};
pub use options::{DEFAULT_CONFIG_ROOT_PACKAGES, TransformOptions};
pub use package::{MANIFEST_FILENAME, PackageManifest, find_package, read_package};
pub use paths::{relative_path, to_slash};
pub use resolver::{ModuleResolver, NodeResolver, Resolved, STYLE_EXTENSIONS};
pub use source_map::relativize_sources;
pub use url_plugin::{URL_PLUGIN_NAME, UrlDependencies, UrlRewritePlugin, UrlRewriteVisitor};
pub use vendor::{
    MODULES_DIR, config_search_bases, is_modules_dir, package_root, package_root_within,
    rewrite_base,
};

// Runtime types needed to construct an asset
pub use parcel_less_runtime::{MemoryRuntime, SystemRuntime};
