//! `url()` rewriting.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Every local `url()` reference in the compiled stylesheet becomes a
//! dependency of the asset and is replaced by the URL of the file it will
//! be bundled to:
//!
//! ```css
//! /* src/button.less */
//! .icon { background: url(./icon.png?v=2#frag); }
//! /* output, public URL "/static" */
//! .icon { background: url(/static/icon.3f2a91c0.png?v=2#frag); }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parcel_less_runtime::SystemRuntime;
use regex::Regex;

use crate::compiler::{LessPlugin, PluginManager, UrlNode, Visitor};
use crate::dependency::{BundleNamer, Dependency, DependencySet};
use crate::error::LessError;
use crate::file_manager::LessFileManager;
use crate::paths::{normalize_path, relative_path, to_slash};
use crate::resolver::ModuleResolver;

/// Name the built-in plugin installs under.
pub const URL_PLUGIN_NAME: &str = "parcel-less-url";

/// `scheme:` (including `data:`) or protocol-relative `//`.
static ABSOLUTE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9+.\-]*:|//)").unwrap());

/// Registers `url()` references as dependencies of one asset and computes
/// their bundled URLs.
pub struct UrlDependencies {
    asset_dir: PathBuf,
    public_url: String,
    resolver: Arc<dyn ModuleResolver>,
    namer: Arc<dyn BundleNamer>,
    dependencies: Arc<DependencySet>,
}

impl UrlDependencies {
    pub fn new(
        asset_path: &Path,
        public_url: impl Into<String>,
        resolver: Arc<dyn ModuleResolver>,
        namer: Arc<dyn BundleNamer>,
        dependencies: Arc<DependencySet>,
    ) -> Self {
        Self {
            asset_dir: asset_path.parent().unwrap_or(asset_path).to_path_buf(),
            public_url: public_url.into(),
            resolver,
            namer,
            dependencies,
        }
    }

    /// Register `url` as referenced from `from` and return its replacement.
    ///
    /// Empty values, absolute URLs and fragment-only references come back
    /// unchanged and register nothing. The path part of a local reference is
    /// percent-decoded before it is resolved; its query and fragment are
    /// carried over to the replacement.
    pub fn register(&self, url: &str, from: &Path) -> Result<String, LessError> {
        let trimmed = url.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || ABSOLUTE_URL.is_match(trimmed) {
            return Ok(url.to_string());
        }

        let (path, suffix) = match trimmed.find(['?', '#']) {
            Some(index) => trimmed.split_at(index),
            None => (trimmed, ""),
        };
        if path.is_empty() {
            return Ok(url.to_string());
        }

        let path = urlencoding::decode(path).map_err(|_| LessError::Resolution {
            specifier: url.to_string(),
            importer: from.to_path_buf(),
        })?;
        let path: &str = &path;

        let from_dir = from.parent().unwrap_or(self.asset_dir.as_path());
        let (name, resolved) = if path.starts_with('~') || path.starts_with('/') {
            let resolved = self.resolver.resolve_filename(path, from_dir);
            (to_slash(&resolved), resolved)
        } else {
            let resolved = normalize_path(&from_dir.join(path));
            let name = format!("./{}", to_slash(&relative_path(&self.asset_dir, &resolved)));
            (name, resolved)
        };

        let bundled = join_public_url(&self.public_url, &self.namer.bundle_name(&resolved));
        tracing::debug!(
            url,
            from = %from.display(),
            resolved = %resolved.display(),
            bundled = %bundled,
            "Registered url dependency"
        );
        self.dependencies
            .add(Dependency::url(name, resolved, url, from.to_path_buf()));

        Ok(format!("{bundled}{suffix}"))
    }
}

fn join_public_url(public_url: &str, bundle_name: &str) -> String {
    format!("{}/{}", public_url.trim_end_matches('/'), bundle_name)
}

/// Replaces each `url()` value with its bundled URL. A node is rewritten at
/// most once, however many times the compiler visits it.
pub struct UrlRewriteVisitor {
    urls: Arc<UrlDependencies>,
}

impl UrlRewriteVisitor {
    pub fn new(urls: Arc<UrlDependencies>) -> Self {
        Self { urls }
    }
}

impl Visitor for UrlRewriteVisitor {
    fn visit_url(&self, node: &mut UrlNode) -> Result<(), LessError> {
        if node.is_rewritten() {
            return Ok(());
        }
        node.value = self.urls.register(&node.value, &node.current_file.filename)?;
        node.mark_rewritten();
        Ok(())
    }
}

/// Installs the [`UrlRewriteVisitor`] and a [`LessFileManager`] so that
/// imports go through the bundler's resolver.
pub struct UrlRewritePlugin {
    urls: Arc<UrlDependencies>,
    resolver: Arc<dyn ModuleResolver>,
    runtime: Arc<dyn SystemRuntime>,
}

impl UrlRewritePlugin {
    pub fn new(
        urls: Arc<UrlDependencies>,
        resolver: Arc<dyn ModuleResolver>,
        runtime: Arc<dyn SystemRuntime>,
    ) -> Self {
        Self {
            urls,
            resolver,
            runtime,
        }
    }
}

impl LessPlugin for UrlRewritePlugin {
    fn name(&self) -> &str {
        URL_PLUGIN_NAME
    }

    fn install(&self, manager: &mut PluginManager) {
        manager.add_visitor(Arc::new(UrlRewriteVisitor::new(Arc::clone(&self.urls))));
        manager.add_file_manager(Arc::new(LessFileManager::new(
            Arc::clone(&self.resolver),
            Arc::clone(&self.runtime),
        )));
    }
}
