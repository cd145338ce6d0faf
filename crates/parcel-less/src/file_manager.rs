//! `@import` loading through the host resolver.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parcel_less_runtime::SystemRuntime;

use crate::compiler::{FileManager, LoadedFile};
use crate::error::LessError;
use crate::resolver::ModuleResolver;

/// Loads every import the compiler encounters, so imports follow the same
/// resolution rules as the rest of the bundle (package `~` references,
/// `node_modules`, root-relative paths).
pub struct LessFileManager {
    resolver: Arc<dyn ModuleResolver>,
    runtime: Arc<dyn SystemRuntime>,
}

impl LessFileManager {
    pub fn new(resolver: Arc<dyn ModuleResolver>, runtime: Arc<dyn SystemRuntime>) -> Self {
        Self { resolver, runtime }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl FileManager for LessFileManager {
    fn supports(&self, _filename: &str, _current_directory: &Path) -> bool {
        true
    }

    fn supports_sync(&self, _filename: &str, _current_directory: &Path) -> bool {
        false
    }

    async fn load_file(
        &self,
        filename: &str,
        current_directory: &Path,
    ) -> Result<LoadedFile, LessError> {
        let specifier = normalize_import_specifier(filename);
        // The resolver takes an importing file and only uses its directory
        let importer = current_directory.join("index");
        let resolved = self.resolver.resolve(&specifier, &importer).await?;

        let contents = self
            .runtime
            .file_read_string_async(&resolved.path)
            .await
            .map_err(|source| LessError::Read {
                path: resolved.path.clone(),
                source,
            })?;

        tracing::debug!(
            import = filename,
            path = %resolved.path.display(),
            bytes = contents.len(),
            "Loaded import"
        );

        Ok(LoadedFile {
            contents,
            filename: resolved.path,
        })
    }
}

/// Turn a raw `@import` target into a resolver specifier.
///
/// CSS treats bare imports as relative, so `foo.less` becomes `./foo.less`.
/// `~pkg/x` names a module and becomes `pkg/x`. `~/x`, `./x` and `/x` pass
/// through unchanged.
pub fn normalize_import_specifier(raw: &str) -> String {
    let unwrapped = strip_url_wrapper(raw.trim());
    let specifier = strip_quotes(unwrapped);

    if !(specifier.starts_with('~') || specifier.starts_with("./") || specifier.starts_with('/'))
    {
        return format!("./{specifier}");
    }
    if specifier.starts_with('~') && !specifier.starts_with("~/") {
        return specifier[1..].to_string();
    }
    specifier.to_string()
}

/// CSS function names are ASCII case-insensitive: `URL(...)` is `url(...)`.
fn strip_url_wrapper(value: &str) -> &str {
    let Some(prefix) = value.get(..4) else {
        return value;
    };
    if !prefix.eq_ignore_ascii_case("url(") {
        return value;
    }
    value[4..].strip_suffix(')').map(str::trim).unwrap_or(value)
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|inner| inner.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
