use crate::config;
use crate::error::{Error, Result};
use crate::par;
use crate::paths;
use crate::progress::ProgressReporter;
use crate::storage::models::FileInfo;
use crate::storage::Database;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tracing::debug;

/// Sweep the catalog, dropping entries whose backing file has disappeared
/// or is no longer a regular file.
///
/// The stat sweep streams the catalog under a read while pool workers do
/// the checking; deletions are buffered and applied in one transaction
/// afterward, because the catalog does not support writes while a read
/// cursor is open. Returns the number of entries removed.
pub fn refresh(db: &mut Database, reporter: &dyn ProgressReporter) -> Result<usize> {
    let total = db.catalog().summary()?.files;
    reporter.on_refresh_start(total as usize);

    let (info_tx, info_rx) = crossbeam_channel::bounded::<FileInfo>(1024);
    let done = AtomicUsize::new(0);
    let gone = thread::scope(|scope| -> Result<Vec<PathBuf>> {
        let done = &done;
        let checker = scope.spawn(move || -> Result<Vec<PathBuf>> {
            let mut gone = Vec::new();
            par::map_n(
                info_rx,
                config::scan_threads(),
                |info: FileInfo, emit| {
                    if paths::check_file(&info.path, true, false, "refresh").is_err() {
                        emit.emit(info.path);
                    }
                    let checked = done.fetch_add(1, Ordering::Relaxed) + 1;
                    reporter.on_refresh_progress(checked);
                },
                |path| {
                    gone.push(path);
                    Ok::<(), Error>(())
                },
            )?;
            Ok(gone)
        });
        let feed_result = db.catalog().for_each_info(|info| {
            let _ = info_tx.send(info);
            Ok(())
        });
        drop(info_tx);
        let gone = checker
            .join()
            .map_err(|_| Error::internal("refresh worker panicked"))??;
        feed_result?;
        Ok(gone)
    })?;

    db.with_transaction(|tx| {
        for path in &gone {
            debug!("removing '{}' from the catalog", path.display());
            tx.remove(path)?;
        }
        Ok(())
    })?;
    reporter.on_refresh_complete();
    Ok(gone.len())
}
