//! Test utilities for building temporary directory trees.
//!
//! This module is only compiled for tests and benchmarks.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory tree for testing.
///
/// Paths passed to the builder methods are relative to the root. The tree is
/// removed when dropped.
pub struct TestTree {
    dir: TempDir,
}

impl TestTree {
    /// Create a new empty temporary directory.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        Self { dir }
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Add a file with text content.
    ///
    /// Creates parent directories as needed.
    pub fn add_file(&self, path: &str, content: &str) -> PathBuf {
        self.write_bytes(path, content.as_bytes())
    }

    /// Add a file with raw content.
    pub fn write_bytes(&self, path: &str, content: &[u8]) -> PathBuf {
        let full_path = self.dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    /// Add a file of `size` zero bytes.
    pub fn add_sized(&self, path: &str, size: usize) -> PathBuf {
        self.write_bytes(path, &vec![0u8; size])
    }

    /// Add an empty directory (and its parents).
    pub fn add_dir(&self, path: &str) -> PathBuf {
        let full_path = self.dir.path().join(path);
        fs::create_dir_all(&full_path).expect("Failed to create dir");
        full_path
    }

    /// Add a symlink at `path` pointing to `target` (taken verbatim).
    #[cfg(unix)]
    pub fn add_symlink(&self, path: &str, target: &str) -> PathBuf {
        let full_path = self.dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::os::unix::fs::symlink(target, &full_path).expect("Failed to create symlink");
        full_path
    }

    /// A small mixed tree used across tests:
    ///
    /// ```text
    /// README.md          "# demo\n"
    /// src/main.rs        3 lines
    /// src/lib.rs         1 line
    /// src/util/mod.rs    empty
    /// data/blob.bin      4096 bytes
    /// .config            hidden file
    /// ```
    pub fn sample() -> Self {
        let tree = Self::new();
        tree.add_file("README.md", "# demo\n");
        tree.add_file("src/main.rs", "fn main() {\n    run();\n}\n");
        tree.add_file("src/lib.rs", "pub fn run() {}\n");
        tree.add_file("src/util/mod.rs", "");
        tree.add_sized("data/blob.bin", 4096);
        tree.add_file(".config", "key = value\n");
        tree
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}
