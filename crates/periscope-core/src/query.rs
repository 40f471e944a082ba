use crate::error::{Error, Result};
use crate::paths;
use crate::storage::models::{DuplicateSet, InfoSummary};
use crate::storage::Database;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

// ── info ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct InfoOptions {
    pub relative: bool,
}

#[derive(Debug)]
pub struct FileReport {
    /// The path as the user spelled it.
    pub path: PathBuf,
    pub short_hash: Option<Vec<u8>>,
    pub full_hash: Option<Vec<u8>>,
    /// Display paths of the other copies, in canonical order.
    pub duplicates: Vec<PathBuf>,
}

pub fn info(
    db: &Database,
    query_paths: &[PathBuf],
    options: &InfoOptions,
) -> Result<(Vec<FileReport>, Vec<Error>)> {
    let mut reports = Vec::new();
    let mut errors = Vec::new();
    for path in query_paths {
        let checked = match paths::check_file(path, true, false, "show") {
            Ok(checked) => checked,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                errors.push(err);
                continue;
            }
        };
        let set = db.catalog().lookup(&checked.abs)?;
        let dir = checked
            .abs
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let mut report = FileReport {
            path: path.clone(),
            short_hash: None,
            full_hash: None,
            duplicates: Vec::new(),
        };
        if let Some(target) = set.first() {
            report.short_hash = target.short_hash.clone();
            report.full_hash = target.full_hash.clone();
        }
        for other in set.iter().skip(1) {
            report.duplicates.push(if options.relative {
                paths::rel_path(&dir, &other.path)
            } else {
                other.path.clone()
            });
        }
        reports.push(report);
    }
    Ok((reports, errors))
}

// ── ls ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct LsOptions {
    pub all: bool,
    pub verbose: bool,
    pub duplicate: bool,
    pub unique: bool,
    pub relative: bool,
    pub recursive: bool,
    pub files_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    Symlink,
    Fifo,
    Socket,
    BlockDevice,
    CharDevice,
    Regular,
    Other,
}

impl EntryKind {
    /// One-character annotation used in listings; regular files are
    /// annotated with their duplicate count instead.
    pub fn tag(self) -> Option<char> {
        match self {
            EntryKind::Directory => Some('d'),
            EntryKind::Symlink => Some('L'),
            EntryKind::Fifo => Some('p'),
            EntryKind::Socket => Some('S'),
            EntryKind::BlockDevice => Some('D'),
            EntryKind::CharDevice => Some('c'),
            EntryKind::Other => Some('?'),
            EntryKind::Regular => None,
        }
    }
}

#[derive(Debug)]
pub struct LsEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Copies minus one; zero for non-regular files and files without
    /// known duplicates.
    pub dup_count: usize,
    /// Duplicate display paths; populated only in verbose mode.
    pub duplicates: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct Listing {
    /// The directory as the user would spell it.
    pub dir: PathBuf,
    pub entries: Vec<LsEntry>,
}

pub fn ls(
    db: &Database,
    query_paths: &[PathBuf],
    options: &LsOptions,
) -> Result<(Vec<Listing>, Vec<Error>)> {
    let mut listings = Vec::new();
    let mut errors = Vec::new();
    for path in query_paths {
        ls_dir(db, path, options, &mut listings, &mut errors)?;
    }
    Ok((listings, errors))
}

fn ls_dir(
    db: &Database,
    path: &Path,
    options: &LsOptions,
    listings: &mut Vec<Listing>,
    errors: &mut Vec<Error>,
) -> Result<()> {
    let checked = match paths::check_file(path, false, true, "list") {
        Ok(checked) => checked,
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            errors.push(err);
            return Ok(());
        }
    };
    let mut names = Vec::new();
    match fs::read_dir(&checked.abs) {
        Ok(entries) => {
            for entry in entries {
                match entry {
                    Ok(entry) => names.push(entry.file_name().to_string_lossy().into_owned()),
                    Err(err) => debug!("reading '{}': {}", path.display(), err),
                }
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            errors.push(Error::user(format!(
                "cannot access '{}': permission denied",
                path.display()
            )));
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }
    names.sort();

    let mut entries = Vec::new();
    let mut recurse_dirs = Vec::new();
    for name in names {
        if name.starts_with('.') && !options.all {
            continue;
        }
        let full = checked.abs.join(&name);
        let meta = match fs::symlink_metadata(&full) {
            Ok(meta) => meta,
            Err(err) => {
                debug!("stat '{}': {}", full.display(), err);
                continue;
            }
        };
        let kind = entry_kind(&meta);
        if kind == EntryKind::Directory && options.recursive {
            recurse_dirs.push(name.clone());
        }
        let mut copies = 0;
        let mut duplicates = Vec::new();
        if kind == EntryKind::Regular {
            let set = db.catalog().lookup(&full)?;
            copies = set.len();
            if options.verbose && copies > 1 {
                for other in set.iter().skip(1) {
                    duplicates.push(if options.relative {
                        paths::rel_path(&checked.abs, &other.path)
                    } else {
                        other.path.clone()
                    });
                }
            }
        }
        if options.unique && copies > 1 {
            continue;
        }
        if options.duplicate && copies < 2 {
            continue;
        }
        if options.files_only && kind != EntryKind::Regular {
            continue;
        }
        entries.push(LsEntry {
            name,
            kind,
            dup_count: copies.saturating_sub(1),
            duplicates,
        });
    }
    listings.push(Listing {
        dir: path.to_path_buf(),
        entries,
    });
    for dir in recurse_dirs {
        ls_dir(db, &path.join(dir), options, listings, errors)?;
    }
    Ok(())
}

fn entry_kind(meta: &fs::Metadata) -> EntryKind {
    let file_type = meta.file_type();
    if file_type.is_dir() {
        return EntryKind::Directory;
    }
    if file_type.is_symlink() {
        return EntryKind::Symlink;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if file_type.is_fifo() {
            return EntryKind::Fifo;
        }
        if file_type.is_socket() {
            return EntryKind::Socket;
        }
        if file_type.is_block_device() {
            return EntryKind::BlockDevice;
        }
        if file_type.is_char_device() {
            return EntryKind::CharDevice;
        }
    }
    if file_type.is_file() {
        EntryKind::Regular
    } else {
        EntryKind::Other
    }
}

// ── tree ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct TreeOptions {
    pub all: bool,
}

#[derive(Debug)]
pub struct TreeEntry {
    /// Copies minus one.
    pub dup_count: i64,
    /// Path rendered relative to the queried root.
    pub path: PathBuf,
}

pub fn tree(db: &Database, root: &Path, options: &TreeOptions) -> Result<Vec<TreeEntry>> {
    let checked = paths::check_file(root, false, true, "show")?;
    let mut entries = Vec::new();
    for dupe in db.catalog().lookup_all(&checked.abs, options.all)? {
        // something may have changed since the last scan
        if paths::check_file(&dupe.path, true, false, "show").is_err() {
            continue;
        }
        entries.push(TreeEntry {
            dup_count: dupe.count - 1,
            path: paths::rel_path(&checked.abs, &dupe.path),
        });
    }
    Ok(entries)
}

// ── report / export / summary ────────────────────────────────────

/// All duplicate sets, optionally restricted to those with a member under
/// `dir`. Buffered rather than streamed so that no read cursor stays open
/// while the caller pages through output, which would block a concurrent
/// writer.
pub fn report(db: &Database, dir: Option<&Path>) -> Result<Vec<DuplicateSet>> {
    let abs = match dir {
        Some(dir) => Some(paths::check_file(dir, false, true, "filter for")?.abs),
        None => None,
    };
    db.catalog().all_duplicates(abs.as_deref())
}

#[derive(Debug, Serialize)]
pub struct ExportEntry {
    pub paths: Vec<String>,
    pub size: i64,
}

#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub duplicates: Vec<ExportEntry>,
}

/// The full duplicate listing as a structured document, ordered by size
/// descending; paths within an entry are sorted.
pub fn export(db: &Database) -> Result<ExportDocument> {
    let mut duplicates = Vec::new();
    db.catalog().for_each_duplicate_set(None, |set| {
        duplicates.push(ExportEntry {
            size: set[0].size,
            paths: set
                .iter()
                .map(|info| info.path.display().to_string())
                .collect(),
        });
        Ok(())
    })?;
    Ok(ExportDocument { duplicates })
}

pub fn summary(db: &Database) -> Result<InfoSummary> {
    db.catalog().summary()
}
