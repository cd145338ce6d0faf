//! Transform options supplied by the host bundler.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Options come either from code (`TransformOptions::new`) or from the
//! host's JSON options blob (`TransformOptions::from_json`):
//!
//! ```json
//! {
//!   "rootDir": "/project",
//!   "sourceMaps": true,
//!   "publicUrl": "/static",
//!   "configRootPackages": ["antd", "@acme/design"]
//! }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::LessError;

/// Packages that ship a config file at their root but keep the stylesheets
/// deep inside the package tree.
pub const DEFAULT_CONFIG_ROOT_PACKAGES: &[&str] = &["antd"];

/// Bundler-level options for one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformOptions {
    /// Project root. Absolute `/` imports and source map paths are relative to it.
    pub root_dir: PathBuf,

    /// Whether the compiler should produce a source map.
    pub source_maps: bool,

    /// Prefix for rewritten `url()` references.
    pub public_url: String,

    /// Vendored packages whose config lookup starts at the package root.
    pub config_root_packages: Vec<String>,
}

impl TransformOptions {
    /// Options for a project rooted at `root_dir`, everything else default.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Parse options from the host's JSON representation.
    pub fn from_json(json: &str) -> Result<Self, LessError> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| LessError::InvalidOptions(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Enable or disable source maps.
    pub fn with_source_maps(mut self, enabled: bool) -> Self {
        self.source_maps = enabled;
        self
    }

    /// Set the public URL prefix.
    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = public_url.into();
        self
    }

    /// Replace the list of config-root packages.
    pub fn with_config_root_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config_root_packages = packages.into_iter().map(Into::into).collect();
        self
    }

    /// Check invariants the transform relies on.
    pub fn validate(&self) -> Result<(), LessError> {
        if !self.root_dir.is_absolute() {
            return Err(LessError::InvalidOptions(format!(
                "rootDir must be absolute, got {}",
                self.root_dir.display()
            )));
        }
        Ok(())
    }
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("/"),
            source_maps: true,
            public_url: "/".to_string(),
            config_root_packages: DEFAULT_CONFIG_ROOT_PACKAGES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
