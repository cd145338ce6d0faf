//! Source map post-processing.
//!
//! Copyright (c) 2025 Posit, PBC

use std::path::Path;

use serde_json::Value;

use crate::error::LessError;
use crate::paths::{relative_path, to_slash};

/// Parse the compiler's raw source map and make every absolute entry in
/// `sources` relative to `root_dir`. Relative and non-path entries are left
/// as they are. All other fields pass through untouched.
pub fn relativize_sources(raw: &str, root_dir: &Path) -> Result<Value, LessError> {
    let mut map: Value = serde_json::from_str(raw)
        .map_err(|e| LessError::compile(format!("Compiler produced an invalid source map: {e}")))?;

    if let Some(sources) = map.get_mut("sources").and_then(Value::as_array_mut) {
        for source in sources.iter_mut() {
            let Some(path) = source.as_str().map(Path::new) else {
                continue;
            };
            if path.is_absolute() {
                *source = Value::String(to_slash(&relative_path(root_dir, path)));
            }
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absolute_sources_become_root_relative() {
        let raw = json!({
            "version": 3,
            "sources": ["/project/src/a.less", "/project/node_modules/x/y.less", "/elsewhere/z.less"],
            "mappings": "AAAA",
        })
        .to_string();
        let map = relativize_sources(&raw, Path::new("/project")).unwrap();
        assert_eq!(
            map["sources"],
            json!(["src/a.less", "node_modules/x/y.less", "../elsewhere/z.less"])
        );
        assert_eq!(map["mappings"], "AAAA");
    }

    #[test]
    fn test_relative_sources_kept() {
        let raw = r#"{"version":3,"sources":["input","src/b.less"],"mappings":""}"#;
        let map = relativize_sources(raw, Path::new("/project")).unwrap();
        assert_eq!(map["sources"], json!(["input", "src/b.less"]));
    }

    #[test]
    fn test_missing_sources_ok() {
        let map = relativize_sources(r#"{"version":3}"#, Path::new("/project")).unwrap();
        assert!(map.get("sources").is_none());
    }

    #[test]
    fn test_invalid_map_is_compile_error() {
        let err = relativize_sources("not json", Path::new("/project")).unwrap_err();
        assert!(matches!(err, LessError::Compile { .. }));
    }
}
