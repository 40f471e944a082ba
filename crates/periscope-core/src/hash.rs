use crate::error::{Error, Result};
use crate::hasher;
use crate::paths;
use crate::storage::models::FileInfo;
use crate::storage::Database;
use std::path::PathBuf;

#[derive(Debug)]
pub struct HashedFile {
    /// The path as the user spelled it.
    pub path: PathBuf,
    pub full_hash: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct HashReport {
    pub hashed: Vec<HashedFile>,
    pub errors: Vec<Error>,
}

/// Force-compute both hashes for the given files and store them, whether or
/// not any collision would have required it.
pub fn hash(db: &mut Database, paths: &[PathBuf]) -> Result<HashReport> {
    let mut report = HashReport::default();
    db.with_transaction(|tx| {
        for path in paths {
            let checked = match paths::check_file(path, true, false, "hash") {
                Ok(checked) => checked,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    report.errors.push(err);
                    continue;
                }
            };
            let size = checked.meta.len() as i64;
            let short_hash = hasher::short_hash(&checked.abs, size as u64)?;
            let full_hash = hasher::full_hash(&checked.abs)?;
            tx.add(&FileInfo {
                path: checked.abs,
                size,
                short_hash: Some(short_hash),
                full_hash: Some(full_hash.clone()),
            })?;
            report.hashed.push(HashedFile {
                path: path.clone(),
                full_hash,
            });
        }
        Ok(())
    })?;
    Ok(report)
}
