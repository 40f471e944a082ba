use crate::engine::ScanOptions;
use crate::error::Result;
use crate::paths;
use crate::progress::ProgressReporter;
use crate::storage::models::FileInfo;
use crate::storage::Catalog;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;
use walkdir::WalkDir;

/// A file participating in the funnel: either freshly sighted under a scan
/// root, or pulled from the catalog so prior work joins the comparison.
/// Old entries only earn a catalog write if a hash gets computed for them.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub info: FileInfo,
    pub old: bool,
}

/// Walk the scan roots (without following symlinks) and bucket regular
/// files in the size window by exact size.
///
/// The first sighting of each size also pulls every catalog row of that
/// size whose path lies outside all roots into the bucket, marked old.
/// This is what makes scanning incremental: hashes recorded by earlier
/// scans participate in the comparison without those files being re-read.
/// All catalog reads happen here, before the write transaction opens.
pub fn find_files_by_size(
    catalog: &Catalog<'_>,
    roots: &[PathBuf],
    options: &ScanOptions,
    reporter: &dyn ProgressReporter,
) -> Result<(HashMap<i64, Vec<SearchResult>>, usize)> {
    let mut buckets: HashMap<i64, Vec<SearchResult>> = HashMap::new();
    let mut files = 0usize;
    reporter.on_search_start();
    for root in roots {
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("walk: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(err) => {
                    debug!("stat '{}': {}", entry.path().display(), err);
                    continue;
                }
            };
            let size = meta.len() as i64;
            if size <= options.minimum || (options.maximum != 0 && size > options.maximum) {
                continue;
            }
            let bucket = buckets.entry(size).or_default();
            if bucket.is_empty() {
                // once per size: pick up relevant prior work from the catalog
                for info in catalog.infos_by_size(size)? {
                    if !paths::contained_in_any(&info.path, roots) {
                        bucket.push(SearchResult { info, old: true });
                        files += 1;
                    }
                }
            }
            bucket.push(SearchResult {
                info: FileInfo::new(entry.into_path(), size),
                old: false,
            });
            files += 1;
            reporter.on_search_progress(files);
        }
    }
    reporter.on_search_complete(files);
    Ok((buckets, files))
}
