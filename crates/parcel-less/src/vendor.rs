//! Config lookup base for stylesheets nested inside vendored packages.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Some packages (antd being the usual example) ship a `.lessrc` at the
//! package root but keep the compiled stylesheets several directories deep.
//! A nearest-ancestor config search that starts at the stylesheet's own
//! directory stops at the package's `node_modules` boundary before it ever
//! reaches the root config, so for those packages the search starts at the
//! package root instead.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Name of the directory packages are installed into.
pub const MODULES_DIR: &str = "node_modules";

/// Directory to start the config search from for `asset_path`.
///
/// Returns the package root when the asset lives under
/// `node_modules/<package>` for one of `packages`, otherwise the asset's own
/// directory. The upward walk is bounded by the filesystem root.
pub fn rewrite_base<S: AsRef<str>>(asset_path: &Path, packages: &[S]) -> PathBuf {
    let asset_dir = asset_path.parent().unwrap_or(asset_path).to_path_buf();

    if !packages
        .iter()
        .any(|package| is_inside_package(asset_path, package.as_ref()))
    {
        return asset_dir;
    }

    match package_root(&asset_dir) {
        Some(root) => {
            tracing::debug!(
                asset = %asset_path.display(),
                base = %root.display(),
                "Config lookup rebased to vendored package root"
            );
            root.to_path_buf()
        }
        None => asset_dir,
    }
}

/// Nearest ancestor of `dir` (inclusive) whose parent is a `node_modules`
/// directory. Scoped packages (`node_modules/@scope/name`) resolve to the
/// `name` directory.
pub fn package_root(dir: &Path) -> Option<&Path> {
    dir.ancestors().find(|candidate| is_package_dir(candidate))
}

/// Like [`package_root`], but the walk stops at `root_dir`: a directory at or
/// above the project root is never treated as a package. Falls back to
/// `root_dir` when no package directory lies in between.
pub fn package_root_within<'a>(dir: &'a Path, root_dir: &'a Path) -> &'a Path {
    for candidate in dir.ancestors() {
        if candidate == root_dir {
            return root_dir;
        }
        if is_package_dir(candidate) {
            return candidate;
        }
    }
    root_dir
}

/// Directories to start the config search from, in order.
///
/// A vendored asset (see [`rewrite_base`]) searches its package root first
/// and then the project that installed the package, so the project's own
/// config also themes vendored stylesheets. Any other asset searches from
/// its own directory only.
pub fn config_search_bases<S: AsRef<str>>(asset_path: &Path, packages: &[S]) -> Vec<PathBuf> {
    let base = rewrite_base(asset_path, packages);
    let vendored = is_package_dir(&base)
        && packages
            .iter()
            .any(|package| is_inside_package(asset_path, package.as_ref()));

    let mut bases = vec![base.clone()];
    if vendored {
        if let Some(project) = base
            .ancestors()
            .find(|candidate| is_modules_dir(candidate))
            .and_then(Path::parent)
        {
            bases.push(project.to_path_buf());
        }
    }
    bases
}

fn is_package_dir(candidate: &Path) -> bool {
    let Some(parent) = candidate.parent() else {
        return false;
    };
    if is_modules_dir(parent) {
        return !is_scope_dir(candidate);
    }
    is_scope_dir(parent) && parent.parent().is_some_and(is_modules_dir)
}

/// Whether the path's last component is `node_modules`.
pub fn is_modules_dir(path: &Path) -> bool {
    path.file_name() == Some(OsStr::new(MODULES_DIR))
}

fn is_scope_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.starts_with('@'))
}

/// Whether `path` traverses `node_modules/<package>`.
///
/// `package` may be scoped (`@scope/name`).
fn is_inside_package(path: &Path, package: &str) -> bool {
    let components: Vec<&OsStr> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .collect();
    let package_parts: Vec<&OsStr> = package.split('/').map(OsStr::new).collect();
    if package_parts.is_empty() {
        return false;
    }

    components.windows(package_parts.len() + 1).any(|window| {
        window[0] == OsStr::new(MODULES_DIR) && window[1..] == package_parts[..]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANTD: &[&str] = &["antd"];

    #[test]
    fn test_plain_asset_uses_own_directory() {
        assert_eq!(
            rewrite_base(Path::new("/project/src/styles/app.less"), ANTD),
            PathBuf::from("/project/src/styles")
        );
    }

    #[test]
    fn test_other_vendor_package_not_rewritten() {
        assert_eq!(
            rewrite_base(
                Path::new("/project/node_modules/bootstrap/less/buttons.less"),
                ANTD
            ),
            PathBuf::from("/project/node_modules/bootstrap/less")
        );
    }

    #[test]
    fn test_nested_vendor_asset_rebased_to_package_root() {
        assert_eq!(
            rewrite_base(
                Path::new("/project/node_modules/antd/lib/button/style/index.less"),
                ANTD
            ),
            PathBuf::from("/project/node_modules/antd")
        );
    }

    #[test]
    fn test_asset_at_package_root() {
        assert_eq!(
            rewrite_base(Path::new("/project/node_modules/antd/index.less"), ANTD),
            PathBuf::from("/project/node_modules/antd")
        );
    }

    #[test]
    fn test_prefix_of_package_name_does_not_match() {
        assert_eq!(
            rewrite_base(
                Path::new("/project/node_modules/antd-mobile/lib/style/index.less"),
                ANTD
            ),
            PathBuf::from("/project/node_modules/antd-mobile/lib/style")
        );
    }

    #[test]
    fn test_nested_install_stops_at_nearest_package() {
        assert_eq!(
            rewrite_base(
                Path::new("/project/node_modules/antd/node_modules/rc-util/style/a.less"),
                ANTD
            ),
            PathBuf::from("/project/node_modules/antd/node_modules/rc-util")
        );
    }

    #[test]
    fn test_scoped_package() {
        let packages = ["@acme/ui".to_string()];
        assert_eq!(
            rewrite_base(
                Path::new("/project/node_modules/@acme/ui/dist/theme/base.less"),
                &packages
            ),
            PathBuf::from("/project/node_modules/@acme/ui")
        );
    }

    #[test]
    fn test_empty_package_list() {
        let packages: [&str; 0] = [];
        assert_eq!(
            rewrite_base(
                Path::new("/project/node_modules/antd/lib/style/index.less"),
                &packages
            ),
            PathBuf::from("/project/node_modules/antd/lib/style")
        );
    }

    #[test]
    fn test_vendored_search_continues_in_installing_project() {
        assert_eq!(
            config_search_bases(
                Path::new("/project/node_modules/antd/lib/button/style/index.less"),
                ANTD
            ),
            vec![
                PathBuf::from("/project/node_modules/antd"),
                PathBuf::from("/project")
            ]
        );
        let packages = ["@acme/ui".to_string()];
        assert_eq!(
            config_search_bases(
                Path::new("/project/node_modules/@acme/ui/dist/base.less"),
                &packages
            ),
            vec![
                PathBuf::from("/project/node_modules/@acme/ui"),
                PathBuf::from("/project")
            ]
        );
    }

    #[test]
    fn test_plain_asset_single_search_base() {
        assert_eq!(
            config_search_bases(Path::new("/project/src/app.less"), ANTD),
            vec![PathBuf::from("/project/src")]
        );
        assert_eq!(
            config_search_bases(
                Path::new("/project/node_modules/bootstrap/less/buttons.less"),
                ANTD
            ),
            vec![PathBuf::from("/project/node_modules/bootstrap/less")]
        );
    }

    #[test]
    fn test_package_root_within_project() {
        let root = Path::new("/srv/node_modules/app/web");
        assert_eq!(
            package_root_within(Path::new("/srv/node_modules/app/web/src/styles"), root),
            root
        );
        assert_eq!(
            package_root_within(
                Path::new("/srv/node_modules/app/web/node_modules/antd/lib"),
                root
            ),
            Path::new("/srv/node_modules/app/web/node_modules/antd")
        );
        assert_eq!(package_root_within(Path::new("/elsewhere"), root), root);
    }

    #[test]
    fn test_package_root_none_outside_modules() {
        assert_eq!(package_root(Path::new("/project/src")), None);
        assert_eq!(package_root(Path::new("/")), None);
    }
}
