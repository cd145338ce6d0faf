//! Module resolution for stylesheet imports.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Maps an import specifier plus the importing file to an absolute path,
//! following node-module conventions:
//!
//! | specifier       | resolved against                                  |
//! |-----------------|---------------------------------------------------|
//! | `/x`            | project root                                      |
//! | `~/x`           | root of the package containing the importer       |
//! | `./x`, `../x`   | importer's directory                              |
//! | `pkg/x`, `@s/p` | `node_modules` of the importer's ancestors        |
//!
//! A candidate path is tried as-is, then with each configured extension
//! appended. A directory loads its manifest entry (`style`, then `main`) or
//! `index` plus an extension.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parcel_less_runtime::SystemRuntime;

use crate::error::LessError;
use crate::package::read_package;
use crate::paths::normalize_path;
use crate::vendor::{MODULES_DIR, is_modules_dir, package_root_within};

/// Extensions tried for stylesheet imports, in order.
pub const STYLE_EXTENSIONS: &[&str] = &[".css", ".less"];

/// A successfully resolved specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: PathBuf,
}

/// The host's specifier-resolution algorithm.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ModuleResolver: Send + Sync {
    /// Resolve `specifier` as imported from `from_file`.
    ///
    /// `from_file` only contributes its directory; callers that have a
    /// directory pass a placeholder file inside it.
    async fn resolve(&self, specifier: &str, from_file: &Path) -> Result<Resolved, LessError>;

    /// Map a root-relative, package-relative or relative specifier to a path
    /// without touching the filesystem. Module specifiers are returned as-is.
    fn resolve_filename(&self, specifier: &str, dir: &Path) -> PathBuf;
}

/// Node-style resolver over a [`SystemRuntime`].
pub struct NodeResolver {
    runtime: Arc<dyn SystemRuntime>,
    extensions: Vec<String>,
    root_dir: PathBuf,
}

impl NodeResolver {
    /// Resolver probing [`STYLE_EXTENSIONS`].
    pub fn new(runtime: Arc<dyn SystemRuntime>, root_dir: impl Into<PathBuf>) -> Self {
        Self::with_extensions(runtime, root_dir, STYLE_EXTENSIONS)
    }

    pub fn with_extensions<S: AsRef<str>>(
        runtime: Arc<dyn SystemRuntime>,
        root_dir: impl Into<PathBuf>,
        extensions: &[S],
    ) -> Self {
        Self {
            runtime,
            extensions: extensions.iter().map(|e| e.as_ref().to_string()).collect(),
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn is_file(&self, path: &Path) -> Result<bool, LessError> {
        tracing::trace!(path = %path.display(), "Probing import candidate");
        Ok(self.runtime.is_file(path)?)
    }

    /// The path itself, then the path with each extension appended.
    fn load_as_file(&self, path: &Path) -> Result<Option<PathBuf>, LessError> {
        if self.is_file(path)? {
            return Ok(Some(path.to_path_buf()));
        }
        for ext in &self.extensions {
            let mut candidate = OsString::from(path.as_os_str());
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            if self.is_file(&candidate)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    async fn load_directory(&self, dir: &Path) -> Result<Option<PathBuf>, LessError> {
        if !self.runtime.is_dir(dir)? {
            return Ok(None);
        }
        if let Some(manifest) = read_package(self.runtime.as_ref(), dir).await? {
            for entry in manifest.entries() {
                let entry = normalize_path(&dir.join(entry));
                if let Some(found) = self.load_as_file(&entry)? {
                    return Ok(Some(found));
                }
                if let Some(found) = self.load_as_file(&entry.join("index"))? {
                    return Ok(Some(found));
                }
            }
        }
        self.load_as_file(&dir.join("index"))
    }

    async fn load_relative(&self, path: &Path) -> Result<Option<PathBuf>, LessError> {
        if let Some(found) = self.load_as_file(path)? {
            return Ok(Some(found));
        }
        self.load_directory(path).await
    }

    async fn load_node_module(
        &self,
        specifier: &str,
        dir: &Path,
    ) -> Result<Option<PathBuf>, LessError> {
        let (name, subpath) = split_module_specifier(specifier);
        for ancestor in dir.ancestors() {
            if is_modules_dir(ancestor) {
                continue;
            }
            let module_dir = ancestor.join(MODULES_DIR).join(name);
            if !self.runtime.is_dir(&module_dir)? {
                continue;
            }
            let target = match subpath {
                Some(subpath) => normalize_path(&module_dir.join(subpath)),
                None => module_dir,
            };
            return self.load_relative(&target).await;
        }
        Ok(None)
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ModuleResolver for NodeResolver {
    async fn resolve(&self, specifier: &str, from_file: &Path) -> Result<Resolved, LessError> {
        let dir = from_file.parent().unwrap_or(self.root_dir.as_path());
        let filename = self.resolve_filename(specifier, dir);

        let found = if filename.is_absolute() {
            self.load_relative(&filename).await?
        } else {
            self.load_node_module(specifier, dir).await?
        };

        match found {
            Some(path) => {
                tracing::debug!(specifier, resolved = %path.display(), "Resolved import");
                Ok(Resolved { path })
            }
            None => Err(LessError::Resolution {
                specifier: specifier.to_string(),
                importer: from_file.to_path_buf(),
            }),
        }
    }

    fn resolve_filename(&self, specifier: &str, dir: &Path) -> PathBuf {
        if let Some(rest) = specifier.strip_prefix('/') {
            return normalize_path(&self.root_dir.join(rest));
        }
        if let Some(rest) = specifier.strip_prefix('~') {
            let rest = rest.trim_start_matches('/');
            let base = package_root_within(dir, &self.root_dir);
            return normalize_path(&base.join(rest));
        }
        if specifier.starts_with('.') {
            return normalize_path(&dir.join(specifier));
        }
        PathBuf::from(specifier)
    }
}

/// Split `pkg/sub/path` or `@scope/pkg/sub/path` into the package name and
/// the optional subpath.
fn split_module_specifier(specifier: &str) -> (&str, Option<&str>) {
    let name_segments = if specifier.starts_with('@') { 2 } else { 1 };
    let mut split_at = None;
    let mut seen = 0;
    for (index, ch) in specifier.char_indices() {
        if ch == '/' {
            seen += 1;
            if seen == name_segments {
                split_at = Some(index);
                break;
            }
        }
    }
    match split_at {
        Some(index) => (&specifier[..index], Some(&specifier[index + 1..])),
        None => (specifier, None),
    }
}
