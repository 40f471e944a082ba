use crate::config;
use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Delete the catalog file. Returns the deleted path, or `None` if there
/// was no catalog to delete.
pub fn finish() -> Result<Option<PathBuf>> {
    let path = config::db_path()?;
    let meta = match fs::symlink_metadata(&path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            return Err(Error::unlikely(
                format!("cannot access '{}': permission denied", path.display()),
                "Ensure that the cache directory is accessible.",
            ));
        }
        Err(err) => {
            return Err(Error::unlikely(
                format!("could not stat '{}' ({})", path.display(), err),
                "Ensure that the cache directory is readable.",
            ));
        }
    };
    if !meta.is_file() {
        return Err(Error::unlikely(
            format!("database is not a regular file: '{}'", path.display()),
            "This should not happen under regular circumstances. If you are done \
             using the database, you can safely delete it manually with 'rm -f'.",
        ));
    }
    fs::remove_file(&path).map_err(|err| {
        Error::unlikely(
            format!("cannot delete database file: '{}' ({})", path.display(), err),
            "Ensure that the cache directory is writable or manually delete the \
             database file.",
        )
    })?;
    Ok(Some(path))
}
