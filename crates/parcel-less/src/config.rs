//! Config file discovery and loading.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! The LESS transform reads compiler options from, in order of preference:
//!
//! 1. A key in the nearest `package.json` (`"less": { ... }`)
//! 2. The first `.lessrc` / `.lessrc.js` found walking up from the asset
//!
//! ```json
//! // .lessrc
//! { "modifyVars": { "@primary-color": "#1DA57A" }, "math": "always" }
//! ```
//!
//! ```js
//! // .lessrc.js
//! const primary = "#1DA57A";
//! module.exports = { modifyVars: { "@primary-color": primary } };
//! ```
//!
//! Discovery and parsing sit behind [`ConfigResolver`] so hosts with their
//! own config layer can plug it in. [`FsConfigResolver`] is the default,
//! backed by a [`SystemRuntime`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parcel_less_runtime::{RuntimeError, SystemRuntime};

use crate::asset::LessAsset;
use crate::dependency::Dependency;
use crate::error::LessError;
use crate::package::find_package;
use crate::vendor::{config_search_bases, is_modules_dir};

/// Config-file discovery and parsing.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ConfigResolver: Send + Sync {
    /// Search `start_dir` and its ancestors for the first file named in
    /// `candidates`. Within one directory, earlier candidates win.
    async fn resolve_config_path(
        &self,
        start_dir: &Path,
        candidates: &[&str],
    ) -> Result<Option<PathBuf>, LessError>;

    /// Resolve like [`resolve_config_path`](ConfigResolver::resolve_config_path)
    /// and parse the file. `None` when nothing is found or the file is empty.
    async fn load_config(
        &self,
        start_dir: &Path,
        candidates: &[&str],
    ) -> Result<Option<serde_json::Value>, LessError>;
}

/// Config file format, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON; also used for extensionless rc files like `.lessrc`
    Json,
    Toml,
    /// CommonJS module evaluated by the runtime's JS engine
    Script,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("js") | Some("cjs") => ConfigFormat::Script,
            Some("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Default [`ConfigResolver`] over a [`SystemRuntime`].
///
/// The search never climbs above a `node_modules` directory: config that
/// belongs to the installing project does not leak into installed packages.
pub struct FsConfigResolver {
    runtime: Arc<dyn SystemRuntime>,
}

impl FsConfigResolver {
    pub fn new(runtime: Arc<dyn SystemRuntime>) -> Self {
        Self { runtime }
    }

    async fn parse(&self, path: &Path) -> Result<Option<serde_json::Value>, LessError> {
        let contents = match self.runtime.file_read_string_async(path).await {
            Ok(contents) => contents,
            // Removed between discovery and load
            Err(e) if e.is_not_found() => return Ok(None),
            Err(source) => {
                return Err(LessError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let parse_error = |message: String| LessError::ConfigParse {
            path: path.to_path_buf(),
            message,
        };

        match ConfigFormat::from_path(path) {
            ConfigFormat::Script => {
                match self.runtime.evaluate_config_module(&contents, path).await {
                    Ok(serde_json::Value::Null) => Ok(None),
                    Ok(value) => Ok(Some(value)),
                    Err(RuntimeError::ScriptError(message)) => Err(parse_error(message)),
                    Err(e) => Err(e.into()),
                }
            }
            _ if contents.trim().is_empty() => Ok(None),
            ConfigFormat::Toml => {
                let value: toml::Value =
                    toml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?;
                serde_json::to_value(value)
                    .map(Some)
                    .map_err(|e| parse_error(e.to_string()))
            }
            ConfigFormat::Json => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|e| parse_error(e.to_string())),
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ConfigResolver for FsConfigResolver {
    async fn resolve_config_path(
        &self,
        start_dir: &Path,
        candidates: &[&str],
    ) -> Result<Option<PathBuf>, LessError> {
        for dir in start_dir.ancestors() {
            if is_modules_dir(dir) {
                break;
            }
            for name in candidates {
                let path = dir.join(name);
                tracing::trace!(path = %path.display(), "Probing config file");
                if self.runtime.is_file(&path)? {
                    return Ok(Some(path));
                }
            }
        }
        Ok(None)
    }

    async fn load_config(
        &self,
        start_dir: &Path,
        candidates: &[&str],
    ) -> Result<Option<serde_json::Value>, LessError> {
        match self.resolve_config_path(start_dir, candidates).await? {
            Some(path) => self.parse(&path).await,
            None => Ok(None),
        }
    }
}

/// Options for [`LessAsset::get_config`].
#[derive(Debug, Clone)]
pub struct ConfigOptions {
    /// `package.json` key to read config from before searching for files.
    pub package_key: Option<String>,
    /// Path to search from instead of the asset path.
    pub path: Option<PathBuf>,
    /// When false, return the config file path without parsing it.
    pub load: bool,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            package_key: None,
            path: None,
            load: true,
        }
    }
}

impl ConfigOptions {
    pub fn package_key(key: impl Into<String>) -> Self {
        Self {
            package_key: Some(key.into()),
            ..Self::default()
        }
    }
}

/// Result of a successful config lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigLookup {
    /// The config file path (`load: false`)
    Path(PathBuf),
    /// Parsed config, or a copy of the `package.json` value
    Value(serde_json::Value),
}

impl ConfigLookup {
    /// The parsed value, if this lookup loaded one.
    pub fn into_value(self) -> Option<serde_json::Value> {
        match self {
            ConfigLookup::Value(value) => Some(value),
            ConfigLookup::Path(_) => None,
        }
    }
}

impl LessAsset {
    /// Find and load this asset's config.
    ///
    /// A found config file is registered as an `included_in_parent`
    /// dependency so editing it invalidates the asset. Values taken from
    /// `package.json` register nothing. A missing config is `Ok(None)`.
    pub async fn get_config(
        &self,
        candidates: &[&str],
        options: ConfigOptions,
    ) -> Result<Option<ConfigLookup>, LessError> {
        if let Some(key) = options.package_key.as_deref() {
            let dir = self.name().parent().unwrap_or(self.name());
            if let Some(manifest) = find_package(self.runtime.as_ref(), dir).await? {
                if let Some(value) = manifest.field(key) {
                    tracing::debug!(
                        asset = %self.name().display(),
                        manifest = %manifest.dir.display(),
                        key,
                        "Using config from package manifest"
                    );
                    return Ok(Some(ConfigLookup::Value(value.clone())));
                }
            }
        }

        let load_path = options.path.as_deref().unwrap_or(self.name());
        let bases = config_search_bases(load_path, &self.options().config_root_packages[..]);

        let mut found = None;
        for base in &bases {
            if let Some(path) = self
                .config_resolver
                .resolve_config_path(base, candidates)
                .await?
            {
                found = Some((base, path));
                break;
            }
        }
        let Some((base, config_path)) = found else {
            tracing::debug!(asset = %self.name().display(), "No config file found");
            return Ok(None);
        };

        tracing::debug!(
            asset = %self.name().display(),
            config = %config_path.display(),
            "Found config file"
        );
        self.add_dependency(Dependency::config(&config_path));

        if !options.load {
            return Ok(Some(ConfigLookup::Path(config_path)));
        }

        Ok(self
            .config_resolver
            .load_config(base, candidates)
            .await?
            .map(ConfigLookup::Value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_less_runtime::MemoryRuntime;
    use pollster::block_on;
    use serde_json::json;

    fn resolver(rt: MemoryRuntime) -> FsConfigResolver {
        FsConfigResolver::new(Arc::new(rt))
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("/p/.lessrc")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("/p/.lessrc.js")), ConfigFormat::Script);
        assert_eq!(ConfigFormat::from_path(Path::new("/p/.lessrc.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("/p/.lessrc.json")), ConfigFormat::Json);
    }

    #[test]
    fn test_nearest_directory_wins() {
        let r = resolver(
            MemoryRuntime::new()
                .with_file("/project/.lessrc", "{}")
                .with_file("/project/src/.lessrc.js", "module.exports = {}"),
        );
        let found = block_on(r.resolve_config_path(
            Path::new("/project/src/styles"),
            &[".lessrc", ".lessrc.js"],
        ))
        .unwrap();
        assert_eq!(found, Some(PathBuf::from("/project/src/.lessrc.js")));
    }

    #[test]
    fn test_candidate_order_within_directory() {
        let r = resolver(
            MemoryRuntime::new()
                .with_file("/project/.lessrc", "{}")
                .with_file("/project/.lessrc.js", "module.exports = {}"),
        );
        let found =
            block_on(r.resolve_config_path(Path::new("/project"), &[".lessrc", ".lessrc.js"]))
                .unwrap();
        assert_eq!(found, Some(PathBuf::from("/project/.lessrc")));
    }

    #[test]
    fn test_search_stops_at_node_modules() {
        let r = resolver(
            MemoryRuntime::new()
                .with_file("/project/.lessrc", "{}")
                .with_file("/project/node_modules/lib/a.less", ""),
        );
        let found =
            block_on(r.resolve_config_path(Path::new("/project/node_modules/lib"), &[".lessrc"]))
                .unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_load_json() {
        let r = resolver(
            MemoryRuntime::new().with_file("/project/.lessrc", r#"{"math": "always"}"#),
        );
        let value = block_on(r.load_config(Path::new("/project/src"), &[".lessrc"])).unwrap();
        assert_eq!(value, Some(json!({"math": "always"})));
    }

    #[test]
    fn test_load_toml() {
        let r = resolver(
            MemoryRuntime::new().with_file("/project/.lessrc.toml", "math = \"always\"\n"),
        );
        let value = block_on(r.load_config(Path::new("/project"), &[".lessrc.toml"])).unwrap();
        assert_eq!(value, Some(json!({"math": "always"})));
    }

    #[test]
    fn test_empty_file_is_no_config() {
        let r = resolver(MemoryRuntime::new().with_file("/project/.lessrc", "  \n"));
        let value = block_on(r.load_config(Path::new("/project"), &[".lessrc"])).unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let r = resolver(MemoryRuntime::new().with_file("/project/.lessrc", "{ math: "));
        let err = block_on(r.load_config(Path::new("/project"), &[".lessrc"])).unwrap_err();
        match err {
            LessError::ConfigParse { path, .. } => {
                assert_eq!(path, PathBuf::from("/project/.lessrc"))
            }
            other => panic!("expected ConfigParse, got {other:?}"),
        }
    }

    #[test]
    fn test_script_config_without_js_engine() {
        let r = resolver(
            MemoryRuntime::new().with_file("/project/.lessrc.js", "module.exports = {};"),
        );
        let err = block_on(r.load_config(Path::new("/project"), &[".lessrc.js"])).unwrap_err();
        assert!(matches!(err, LessError::Runtime(RuntimeError::NotSupported(_))));
    }

    #[test]
    fn test_lookup_into_value() {
        assert_eq!(
            ConfigLookup::Value(json!({"a": "b"})).into_value(),
            Some(json!({"a": "b"}))
        );
        assert_eq!(ConfigLookup::Path(PathBuf::from("/p/.lessrc")).into_value(), None);
    }
}
