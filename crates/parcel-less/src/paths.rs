//! Lexical path helpers.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::{Component, Path, PathBuf};

pub use parcel_less_runtime::normalize_path;

/// Path from directory `base` to `target`, both absolute and normalized
/// lexically first. Returns `.`-free output; an empty path when equal.
pub fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base = normalize_path(base);
    let target = normalize_path(target);

    let base_parts: Vec<Component<'_>> = base.components().collect();
    let target_parts: Vec<Component<'_>> = target.components().collect();
    let common = base_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &target_parts[common..] {
        relative.push(part);
    }
    relative
}

/// Render a path with `/` separators, as used in URLs and source maps.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
        .replacen("//", "/", 1)
}
