/*
 * memory.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * MemoryRuntime: an in-memory file system.
 *
 * Used by tests and by hosts that keep sources in memory (editors,
 * browser builds). No JavaScript engine is available, so executable
 * config modules report NotSupported.
 */

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use crate::traits::{PathKind, RuntimeError, RuntimeResult, SystemRuntime, normalize_path};

/// Helper function to create a "not found" error.
fn not_found_error(path: &Path) -> RuntimeError {
    RuntimeError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("Path not found: {}", path.display()),
    ))
}

/// In-memory file tree.
///
/// Directories are created implicitly for every parent of an added file.
#[derive(Debug)]
pub struct VirtualFileSystem {
    /// File contents, keyed by normalized absolute path
    files: HashMap<PathBuf, Vec<u8>>,
    /// Directory entries (automatically includes parents of all files)
    directories: HashSet<PathBuf>,
    /// Working directory; relative paths resolve against it
    project_root: PathBuf,
}

impl VirtualFileSystem {
    /// Create a new empty virtual filesystem rooted at `/project`.
    pub fn new() -> Self {
        Self::with_project_root(PathBuf::from("/project"))
    }

    /// Create VFS with a custom project root.
    pub fn with_project_root(project_root: PathBuf) -> Self {
        let mut vfs = Self {
            files: HashMap::new(),
            directories: HashSet::new(),
            project_root: normalize_path(&project_root),
        };
        let root = vfs.project_root.clone();
        vfs.add_directory_and_parents(&root);
        vfs
    }

    /// Add a file to the virtual filesystem.
    ///
    /// This will automatically create all parent directories.
    pub fn add_file(&mut self, path: &Path, contents: Vec<u8>) {
        let normalized = self.normalize_path(path);
        if let Some(parent) = normalized.parent() {
            self.add_directory_and_parents(parent);
        }
        self.files.insert(normalized, contents);
    }

    /// Remove a file from the virtual filesystem.
    ///
    /// Returns true if the file existed and was removed.
    pub fn remove_file(&mut self, path: &Path) -> bool {
        let normalized = self.normalize_path(path);
        self.files.remove(&normalized).is_some()
    }

    /// Check if a path is a file.
    pub fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&self.normalize_path(path))
    }

    /// Check if a path is a directory.
    pub fn is_directory(&self, path: &Path) -> bool {
        self.directories.contains(&self.normalize_path(path))
    }

    /// Read file contents.
    pub fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let normalized = self.normalize_path(path);
        self.files
            .get(&normalized)
            .cloned()
            .ok_or_else(|| not_found_error(&normalized))
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Normalize a path to an absolute path.
    pub fn normalize_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return normalize_path(path);
        }
        normalize_path(&self.project_root.join(path))
    }

    /// Add a directory and all its parent directories.
    fn add_directory_and_parents(&mut self, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            self.directories.insert(current.clone());
        }
    }
}

impl Default for VirtualFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Runtime over a [`VirtualFileSystem`].
///
/// Every successful read is recorded, which lets callers check that each
/// file consumed during a compilation was also registered as a dependency.
pub struct MemoryRuntime {
    /// Uses RwLock to satisfy Send + Sync trait bounds.
    vfs: RwLock<VirtualFileSystem>,
    reads: Mutex<Vec<PathBuf>>,
}

impl MemoryRuntime {
    /// Create a MemoryRuntime with an empty file system rooted at `/project`.
    pub fn new() -> Self {
        Self::with_vfs(VirtualFileSystem::new())
    }

    /// Create a MemoryRuntime with a pre-populated virtual filesystem.
    pub fn with_vfs(vfs: VirtualFileSystem) -> Self {
        Self {
            vfs: RwLock::new(vfs),
            reads: Mutex::new(Vec::new()),
        }
    }

    /// Add a UTF-8 file. Builder-style for test setup.
    pub fn with_file(self, path: impl AsRef<Path>, contents: &str) -> Self {
        self.add_file(path.as_ref(), contents.as_bytes().to_vec());
        self
    }

    /// Add a file to the virtual filesystem.
    pub fn add_file(&self, path: &Path, contents: Vec<u8>) {
        self.vfs.write().unwrap().add_file(path, contents);
    }

    /// Remove a file from the virtual filesystem.
    pub fn remove_file(&self, path: &Path) -> bool {
        self.vfs.write().unwrap().remove_file(path)
    }

    /// Paths read so far, in read order.
    pub fn files_read(&self) -> Vec<PathBuf> {
        self.reads.lock().unwrap().clone()
    }
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl SystemRuntime for MemoryRuntime {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let vfs = self.vfs.read().unwrap();
        let contents = vfs.read_file(path)?;
        self.reads.lock().unwrap().push(vfs.normalize_path(path));
        Ok(contents)
    }

    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool> {
        let vfs = self.vfs.read().unwrap();
        Ok(match kind {
            None => vfs.is_file(path) || vfs.is_directory(path),
            Some(PathKind::File) => vfs.is_file(path),
            Some(PathKind::Directory) => vfs.is_directory(path),
        })
    }

    fn cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.vfs.read().unwrap().project_root().to_path_buf())
    }
}
