use crate::error::{Error, Result};
use std::fs::{self, Metadata};
use std::path::{Component, Path, PathBuf};

/// A validated user-supplied path: absolute, lexically clean, symlink-free.
#[derive(Debug)]
pub struct CheckedPath {
    pub abs: PathBuf,
    pub meta: Metadata,
}

/// Validate a path for an operation named by `action`.
///
/// Checks, in order: the path exists and is statable, it contains no
/// symbolic links anywhere (the resolved path is named in the error so the
/// user can retry with it), and it is of the required kind. The symlink
/// refusal is deliberately strict: duplicate-set reasoning must never be
/// confused by aliased paths.
pub fn check_file(
    path: &Path,
    must_be_file: bool,
    must_be_dir: bool,
    action: &str,
) -> Result<CheckedPath> {
    let shown = path.display();
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            return Err(match err.kind() {
                std::io::ErrorKind::NotFound => Error::user(format!(
                    "cannot {action} '{shown}': no such file or directory"
                )),
                std::io::ErrorKind::PermissionDenied => {
                    Error::user(format!("cannot {action} '{shown}': permission denied"))
                }
                _ => Error::user(format!("cannot {action} '{shown}': {err}")),
            });
        }
    };
    let abs = clean_abs(path)?;
    // stat succeeded, so any canonicalization failure is unexpected
    let resolved = fs::canonicalize(&abs)
        .map_err(|err| Error::internal(format!("cannot resolve '{shown}': {err}")))?;
    if resolved != abs {
        return Err(Error::user(format!(
            "cannot {action} '{shown}': path has symbolic links (use '{}' instead)",
            resolved.display()
        )));
    }
    if !meta.is_file() && !meta.is_dir() {
        return Err(Error::user(format!(
            "cannot {action} '{shown}': not a regular file or directory"
        )));
    }
    if must_be_file && !meta.is_file() {
        return Err(Error::user(format!(
            "cannot {action} '{shown}': not a regular file"
        )));
    }
    if must_be_dir && !meta.is_dir() {
        return Err(Error::user(format!(
            "cannot {action} '{shown}': not a directory"
        )));
    }
    Ok(CheckedPath {
        abs: resolved,
        meta,
    })
}

/// Absolute form of `path` with `.` and `..` removed lexically.
pub fn clean_abs(path: &Path) -> Result<PathBuf> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| {
                Error::internal(format!("cannot determine working directory: {err}"))
            })?
            .join(path)
    };
    let mut clean = PathBuf::new();
    for component in abs.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                clean.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                clean.pop();
            }
        }
    }
    Ok(clean)
}

/// Whether `path` lies under any of the given directories.
pub fn contained_in_any(path: &Path, dirs: &[PathBuf]) -> bool {
    dirs.iter().any(|dir| path.starts_with(dir))
}

/// Render `abs_path` relative to `abs_dir` when that form is shorter.
pub fn rel_path(abs_dir: &Path, abs_path: &Path) -> PathBuf {
    match abs_path.strip_prefix(abs_dir) {
        Ok(rel) if rel.as_os_str().len() < abs_path.as_os_str().len() => rel.to_path_buf(),
        _ => abs_path.to_path_buf(),
    }
}

/// Render `abs_path` the way the user spelled the enclosing directory:
/// `display_dir` joined with the path's position below `abs_dir`. Falls
/// back to the absolute path when that form is not shorter.
pub fn rel_from(display_dir: &Path, abs_dir: &Path, abs_path: &Path) -> PathBuf {
    match abs_path.strip_prefix(abs_dir) {
        Ok(rel) => {
            let joined = display_dir.join(rel);
            if joined.as_os_str().len() <= abs_path.as_os_str().len() {
                joined
            } else {
                abs_path.to_path_buf()
            }
        }
        Err(_) => abs_path.to_path_buf(),
    }
}

/// Whether two metadata handles name the same underlying file.
#[cfg(unix)]
pub fn same_file(a: &Metadata, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
pub fn same_file(_a: &Metadata, _b: &Metadata) -> bool {
    false
}
