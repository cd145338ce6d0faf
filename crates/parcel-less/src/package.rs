//! Package manifest (`package.json`) lookup.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::{Path, PathBuf};

use parcel_less_runtime::SystemRuntime;
use serde::Deserialize;

use crate::error::LessError;
use crate::vendor::is_modules_dir;

pub const MANIFEST_FILENAME: &str = "package.json";

/// The parts of a package manifest the transform reads.
///
/// Every other field is kept in `fields` so config can be read from an
/// arbitrary key (e.g. `"less": { ... }`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,

    /// Stylesheet entry point, preferred over `main` when resolving a package import.
    #[serde(default)]
    pub style: Option<String>,

    #[serde(default)]
    pub main: Option<String>,

    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,

    /// Directory containing the manifest.
    #[serde(skip)]
    pub dir: PathBuf,
}

impl PackageManifest {
    /// Look up an arbitrary top-level key.
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    /// Entry points to try when the package directory itself is imported.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.style.as_deref().into_iter().chain(self.main.as_deref())
    }
}

/// Read and parse the manifest in `dir`, if there is one.
pub async fn read_package(
    runtime: &dyn SystemRuntime,
    dir: &Path,
) -> Result<Option<PackageManifest>, LessError> {
    let path = dir.join(MANIFEST_FILENAME);
    if !runtime.is_file(&path)? {
        return Ok(None);
    }
    let contents = runtime
        .file_read_string_async(&path)
        .await
        .map_err(|source| LessError::Read {
            path: path.clone(),
            source,
        })?;
    let mut manifest: PackageManifest =
        serde_json::from_str(&contents).map_err(|e| LessError::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;
    manifest.dir = dir.to_path_buf();
    Ok(Some(manifest))
}

/// Find the nearest manifest at or above `dir`.
///
/// The search does not leave the package that contains `dir`: it stops at
/// the first `node_modules` directory.
pub async fn find_package(
    runtime: &dyn SystemRuntime,
    dir: &Path,
) -> Result<Option<PackageManifest>, LessError> {
    for candidate in dir.ancestors() {
        if is_modules_dir(candidate) {
            return Ok(None);
        }
        if let Some(manifest) = read_package(runtime, candidate).await? {
            tracing::trace!(path = %candidate.display(), "Found package manifest");
            return Ok(Some(manifest));
        }
    }
    Ok(None)
}
