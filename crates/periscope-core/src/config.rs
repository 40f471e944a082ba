use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::thread;

const CACHE_SUBDIR: &str = "periscope";
const DB_FILENAME: &str = "periscope.sqlite";

/// Worker count for the walk/refresh pool.
pub fn scan_threads() -> usize {
    env_int("PERISCOPE_SCAN_THREADS", 32)
}

/// Worker count for content hashing.
pub fn hash_threads() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Verbose diagnostics in tests.
pub fn test_debug() -> bool {
    env_bool("PERISCOPE_TEST_DEBUG", false)
}

/// Location of the catalog file, creating the cache directory if needed.
///
/// `dirs::cache_dir` honors `XDG_CACHE_HOME` and falls back to
/// `$HOME/.cache` on Linux.
pub fn db_path() -> Result<PathBuf> {
    let root = dirs::cache_dir().ok_or_else(|| {
        Error::unlikely(
            "unable to determine cache directory",
            "Ensure that $HOME or $XDG_CACHE_HOME is set.",
        )
    })?;
    let cache_dir = root.join(CACHE_SUBDIR);
    fs::create_dir_all(&cache_dir).map_err(|err| {
        Error::unlikely(
            format!(
                "unable to create cache directory '{}' ({})",
                cache_dir.display(),
                err
            ),
            format!(
                "Ensure that the user cache directory '{}' exists and is writable.",
                root.display()
            ),
        )
    })?;
    Ok(cache_dir.join(DB_FILENAME))
}

fn env_int(key: &str, fallback: usize) -> usize {
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_bool(key: &str, fallback: bool) -> bool {
    match env::var(key) {
        Ok(value) => match value.to_lowercase().as_str() {
            "1" | "t" | "true" | "y" | "yes" => true,
            "0" | "f" | "false" | "n" | "no" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}
