use crate::config;
use crate::error::Result;
use crate::hasher;
use crate::par::{self, Emit};
use crate::paths;
use crate::progress::ProgressReporter;
use crate::scanner::{self, SearchResult};
use crate::storage::models::FileInfo;
use crate::storage::Database;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Exclusive lower bound on file size.
    pub minimum: i64,
    /// Inclusive upper bound on file size; 0 means no bound.
    pub maximum: i64,
}

#[derive(Debug)]
pub struct ScanReport {
    pub files_found: usize,
    pub records_written: usize,
    pub search_duration: Duration,
    pub analyze_duration: Duration,
}

/// Run the full scan pipeline over the given roots:
///
/// 1. walk and bucket by size, merging in prior catalog work (incremental);
/// 2. open one transaction and clear each root's rows for the size window,
///    so a re-scan is authoritative for the region it covers;
/// 3. run the per-size funnel in parallel, upserting every record with
///    newly computed information in the same transaction;
/// 4. create indexes and commit.
///
/// Per-file errors are logged and the file is skipped; an invalid scan root
/// is fatal before any work starts.
pub fn scan(
    db: &mut Database,
    paths: &[PathBuf],
    options: &ScanOptions,
    reporter: &dyn ProgressReporter,
) -> Result<ScanReport> {
    let mut roots = Vec::with_capacity(paths.len());
    for path in paths {
        roots.push(paths::check_file(path, false, true, "scan")?.abs);
    }

    let search_start = Instant::now();
    let (buckets, files_found) =
        scanner::find_files_by_size(&db.catalog(), &roots, options, reporter)?;
    let search_duration = search_start.elapsed();
    debug!(
        "search found {} files in {} size buckets",
        files_found,
        buckets.len()
    );

    reporter.on_analyze_start(files_found);
    let analyze_start = Instant::now();
    let workers = config::hash_threads();
    let done = AtomicUsize::new(0);
    let mut records_written = 0usize;
    db.with_transaction(|tx| {
        for root in &roots {
            tx.remove_dir(root, options.minimum, options.maximum)?;
        }
        par::map_n(
            buckets,
            workers,
            |(size, results): (i64, Vec<SearchResult>), emit| {
                let count = results.len();
                funnel(size, results, emit);
                let total = done.fetch_add(count, Ordering::Relaxed) + count;
                reporter.on_analyze_progress(total);
            },
            |info: FileInfo| -> Result<()> {
                tx.add(&info)?;
                records_written += 1;
                Ok(())
            },
        )?;
        tx.create_indexes()?;
        Ok(())
    })?;
    reporter.on_analyze_complete();
    debug!("wrote {} records", records_written);

    Ok(ScanReport {
        files_found,
        records_written,
        search_duration,
        analyze_duration: analyze_start.elapsed(),
    })
}

/// The per-size funnel: read as little of each file as possible. A bucket
/// with a single member needs no hashing at all; short hashes split the
/// bucket further; only short-hash collisions force full reads. Keying the
/// short hash by size means dropping size from the grouping key here is
/// safe. Only records with newly computed information are emitted.
fn funnel(size: i64, results: Vec<SearchResult>, emit: &Emit<'_, FileInfo>) {
    // the same file appears twice when scan roots overlap
    let mut seen = HashSet::new();
    let mut infos: Vec<FileInfo> = Vec::new();
    let mut updated: Vec<bool> = Vec::new();
    for result in results {
        if !seen.insert(result.info.path.clone()) {
            continue;
        }
        updated.push(!result.old);
        infos.push(result.info);
    }

    if infos.len() == 1 {
        if let (Some(info), true) = (infos.pop(), updated[0]) {
            emit.emit(info);
        }
        return;
    }

    let mut by_short_hash: HashMap<Vec<u8>, Vec<usize>> = HashMap::new();
    for index in 0..infos.len() {
        if infos[index].short_hash.is_none() {
            match hasher::short_hash(&infos[index].path, size as u64) {
                Ok(hash) => {
                    infos[index].short_hash = Some(hash);
                    updated[index] = true;
                }
                Err(err) => {
                    debug!("skipping '{}': {}", infos[index].path.display(), err);
                    continue;
                }
            }
        }
        let Some(key) = infos[index].short_hash.clone() else {
            continue;
        };
        by_short_hash.entry(key).or_default().push(index);
    }

    for indices in by_short_hash.values() {
        if indices.len() <= 1 {
            continue;
        }
        for &index in indices {
            if infos[index].full_hash.is_none() {
                match hasher::full_hash(&infos[index].path) {
                    Ok(hash) => {
                        infos[index].full_hash = Some(hash);
                        updated[index] = true;
                    }
                    Err(err) => {
                        debug!("skipping '{}': {}", infos[index].path.display(), err);
                    }
                }
            }
        }
    }

    for (index, info) in infos.into_iter().enumerate() {
        if updated[index] {
            emit.emit(info);
        }
    }
}
