#![allow(dead_code)]

use periscope_core::engine::{self, ScanOptions};
use periscope_core::{Database, DuplicateSet, SilentReporter};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch tree rooted at a canonicalized (symlink-free) temp directory,
/// so the path guard never trips over a symlinked /tmp.
pub struct TestTree {
    _tmp: TempDir,
    pub root: PathBuf,
}

impl TestTree {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        TestTree { _tmp: tmp, root }
    }

    /// Create a file under the root, making parent directories as needed.
    pub fn write(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }
}

/// Deterministic content: `len` bytes derived from a seed. Distinct seeds
/// give distinct content even for the first byte.
pub fn pattern(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| seed.wrapping_mul(31).wrapping_add((i % 251) as u8))
        .collect()
}

/// Extra diagnostics when PERISCOPE_TEST_DEBUG is set.
pub fn test_log(message: impl AsRef<str>) {
    if periscope_core::config::test_debug() {
        eprintln!("{}", message.as_ref());
    }
}

pub fn scan(db: &mut Database, roots: &[PathBuf]) {
    test_log(format!("scanning {roots:?}"));
    engine::scan(db, roots, &ScanOptions::default(), &SilentReporter).unwrap();
}

pub fn scan_sized(db: &mut Database, roots: &[PathBuf], minimum: i64, maximum: i64) {
    engine::scan(db, roots, &ScanOptions { minimum, maximum }, &SilentReporter).unwrap();
}

/// Duplicate sets as sorted lists of path strings, for order-insensitive
/// comparison across scans.
pub fn set_paths(sets: &[DuplicateSet]) -> Vec<Vec<String>> {
    let mut out: Vec<Vec<String>> = sets
        .iter()
        .map(|set| {
            let mut paths: Vec<String> = set
                .iter()
                .map(|info| info.path.display().to_string())
                .collect();
            paths.sort();
            paths
        })
        .collect();
    out.sort();
    out
}

pub fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
