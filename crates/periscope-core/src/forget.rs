use crate::error::{Error, Result};
use crate::paths;
use crate::storage::Database;
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct ForgetReport {
    /// Directories whose subtrees were removed from the catalog, as the
    /// user spelled them.
    pub forgotten: Vec<PathBuf>,
    pub errors: Vec<Error>,
}

/// Remove directory subtrees from the catalog without touching the
/// filesystem. The paths need not exist; they only need absolute forms.
pub fn forget(db: &mut Database, paths: &[PathBuf]) -> Result<ForgetReport> {
    let mut report = ForgetReport::default();
    db.with_transaction(|tx| {
        for path in paths {
            match paths::clean_abs(path) {
                Ok(abs) => {
                    tx.remove_dir(&abs, 0, 0)?;
                    report.forgotten.push(path.clone());
                }
                Err(_) => report.errors.push(Error::user(format!(
                    "cannot forget '{}': cannot determine absolute path",
                    path.display()
                ))),
            }
        }
        Ok(())
    })?;
    Ok(report)
}
