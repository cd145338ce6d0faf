//! Dependency edges recorded on an asset.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! The host bundler reads these after the transform to wire up its graph
//! and file watcher. Edges are kept in registration order and keyed by
//! name; registering the same name again replaces the edge in place.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hashlink::LinkedHashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::paths::{relative_path, to_slash};

/// Why an edge exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DependencyKind {
    /// A stylesheet pulled in by `@import`
    Import,
    /// A config file that shaped compiler options
    Config,
    /// A `url()` reference, bundled as its own asset
    Url { original: String, from: PathBuf },
}

/// One dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub name: String,

    /// Content is consumed by the parent during compilation; the host watches
    /// it for invalidation but does not bundle it separately.
    pub included_in_parent: bool,

    /// Bundled as a separate output (url references).
    pub dynamic: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<PathBuf>,

    pub kind: DependencyKind,
}

impl Dependency {
    /// A stylesheet the compiler imported.
    pub fn import(path: impl Into<String>) -> Self {
        Self {
            name: path.into(),
            included_in_parent: true,
            dynamic: false,
            resolved: None,
            kind: DependencyKind::Import,
        }
    }

    /// A config file found during option loading.
    pub fn config(path: &Path) -> Self {
        Self {
            name: path.to_string_lossy().into_owned(),
            included_in_parent: true,
            dynamic: false,
            resolved: Some(path.to_path_buf()),
            kind: DependencyKind::Config,
        }
    }

    /// A `url()` reference resolved to `resolved`.
    pub fn url(
        name: impl Into<String>,
        resolved: PathBuf,
        original: impl Into<String>,
        from: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            included_in_parent: false,
            dynamic: true,
            resolved: Some(resolved),
            kind: DependencyKind::Url {
                original: original.into(),
                from,
            },
        }
    }
}

/// Insertion-ordered dependency edges, safe to update from concurrent
/// compiler callbacks.
#[derive(Debug, Default)]
pub struct DependencySet {
    edges: Mutex<LinkedHashMap<String, Dependency>>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge, replacing an existing edge with the same name in place.
    pub fn add(&self, dependency: Dependency) {
        let mut edges = self.edges.lock().unwrap();
        if let Some(existing) = edges.get_mut(&dependency.name) {
            *existing = dependency;
        } else {
            edges.insert(dependency.name.clone(), dependency);
        }
    }

    pub fn get(&self, name: &str) -> Option<Dependency> {
        self.edges.lock().unwrap().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.edges.lock().unwrap().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.edges.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all edges in registration order.
    pub fn to_vec(&self) -> Vec<Dependency> {
        self.edges.lock().unwrap().values().cloned().collect()
    }

    /// Drop all edges (before a recompilation).
    pub fn clear(&self) {
        self.edges.lock().unwrap().clear();
    }
}

/// Names the output file a `url()` reference will be bundled to.
pub trait BundleNamer: Send + Sync {
    fn bundle_name(&self, resolved: &Path) -> String;
}

/// `<stem>.<hash>.<ext>`, where the hash is the first 8 hex digits of the
/// SHA-256 of the path relative to the project root. Stable across machines
/// for the same project layout.
#[derive(Debug, Clone)]
pub struct HashedBundleNamer {
    root_dir: PathBuf,
}

impl HashedBundleNamer {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }
}

impl BundleNamer for HashedBundleNamer {
    fn bundle_name(&self, resolved: &Path) -> String {
        let relative = to_slash(&relative_path(&self.root_dir, resolved));
        let digest = format!("{:x}", Sha256::digest(relative.as_bytes()));
        let hash = &digest[..8];

        let stem = resolved
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match resolved.extension() {
            Some(ext) => format!("{}.{}.{}", stem, hash, ext.to_string_lossy()),
            None => format!("{}.{}", stem, hash),
        }
    }
}
