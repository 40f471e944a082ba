use crate::error::{Error, Result};
use crate::hasher;
use crate::paths;
use crate::storage::{Catalog, Database};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::slice;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct RmOptions {
    pub recursive: bool,
    pub dry_run: bool,
    /// Witnesses must live under one of these directories; a candidate
    /// whose only duplicates lie elsewhere is never deleted.
    pub contained: Vec<PathBuf>,
    /// With no external witness and no `contained` restriction, keep one
    /// candidate as its own preserved copy and delete the rest.
    pub arbitrary: bool,
}

#[derive(Debug, Default)]
pub struct RmReport {
    /// Files unlinked, as display paths. Under dry run, the files that
    /// would have been unlinked.
    pub removed: Vec<PathBuf>,
    /// Per-item failures; the command continues past them.
    pub errors: Vec<Error>,
}

/// Remove duplicates named by `paths`, a file or directory per entry.
///
/// This is the most critical code in the program: a file is unlinked only
/// when, at that moment, a duplicate with identical on-disk content exists
/// elsewhere. The catalog is consulted for candidate sets, but the bytes on
/// disk always get the last word.
pub fn rm(db: &mut Database, paths: &[PathBuf], options: &RmOptions) -> Result<RmReport> {
    let mut contained_abs = Vec::new();
    for dir in &options.contained {
        contained_abs.push(paths::check_file(dir, false, true, "access")?.abs);
    }
    let mut report = RmReport::default();
    db.with_transaction(|tx| {
        for path in paths {
            let checked = match paths::check_file(path, false, false, "remove") {
                Ok(checked) => checked,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    report.errors.push(err);
                    continue;
                }
            };
            if checked.meta.is_file() {
                remove_group(
                    tx,
                    slice::from_ref(path),
                    Mode::Single,
                    path,
                    options,
                    &contained_abs,
                    &mut report,
                )?;
            } else if !options.recursive {
                report.errors.push(Error::user(format!(
                    "cannot remove '{}': must specify -r, --recursive to delete directories",
                    path.display()
                )));
            } else {
                let dupes = tx.lookup_all(&checked.abs, true)?;
                let mut groups: BTreeMap<Vec<u8>, Vec<PathBuf>> = BTreeMap::new();
                for dupe in dupes {
                    groups.entry(dupe.full_hash).or_default().push(dupe.path);
                }
                for candidates in groups.values() {
                    remove_group(
                        tx,
                        candidates,
                        Mode::Recursive {
                            abs_dir: &checked.abs,
                        },
                        path,
                        options,
                        &contained_abs,
                        &mut report,
                    )?;
                }
            }
        }
        tx.prune_orphan_directories()?;
        Ok(())
    })?;
    Ok(report)
}

#[derive(Clone, Copy)]
enum Mode<'a> {
    /// One user-named file; failures are reported.
    Single,
    /// A same-hash group from a recursive removal; failures skip silently.
    Recursive { abs_dir: &'a Path },
}

/// The pre-delete protocol, run per candidate group:
///
/// 1. every candidate must still exist, be regular, and be symlink-free;
/// 2. every candidate's content is hashed now and all must agree; a group
///    that has diverged from the catalog is left untouched;
/// 3. every candidate must appear in the catalog's duplicate set;
/// 4. a safety witness is searched for: a file in the set, outside the
///    group, under the `contained` directories if given, whose current
///    content matches, on a distinct inode;
/// 5. survivors are unlinked and their catalog rows removed.
fn remove_group(
    tx: &Catalog<'_>,
    candidates: &[PathBuf],
    mode: Mode<'_>,
    display: &Path,
    options: &RmOptions,
    contained_abs: &[PathBuf],
    report: &mut RmReport,
) -> Result<()> {
    let single = matches!(mode, Mode::Single);

    let mut members: BTreeMap<PathBuf, Metadata> = BTreeMap::new();
    for path in candidates {
        match paths::check_file(path, true, false, "remove") {
            Ok(checked) => {
                members.insert(checked.abs, checked.meta);
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                if single {
                    report.errors.push(err);
                    return Ok(());
                }
                debug!("dropping candidate '{}': {}", path.display(), err);
            }
        }
    }
    if members.is_empty() {
        return Ok(());
    }

    let mut group_hash: Option<Vec<u8>> = None;
    let mut unreadable = Vec::new();
    for path in members.keys() {
        match hasher::full_hash(path) {
            Ok(hash) => match &group_hash {
                Some(prev) if *prev != hash => {
                    // the group has diverged on disk; leave all of it alone
                    return Ok(());
                }
                _ => group_hash = Some(hash),
            },
            Err(err) => {
                if single {
                    report.errors.push(read_failure(display, &err));
                    return Ok(());
                }
                debug!("cannot hash '{}': {}", path.display(), err);
                unreadable.push(path.clone());
            }
        }
    }
    for path in &unreadable {
        members.remove(path);
    }
    if members.is_empty() {
        return Ok(());
    }
    let group_hash = group_hash.expect("non-empty group was hashed");

    let first = members.keys().next().expect("non-empty group");
    let set = tx.lookup(first)?;
    let set_paths: HashSet<&Path> = set.iter().map(|info| info.path.as_path()).collect();
    if !members.keys().all(|path| set_paths.contains(path.as_path())) {
        if single {
            report.errors.push(Error::user(format!(
                "cannot remove '{}': no duplicates",
                display.display()
            )));
        }
        return Ok(());
    }

    let mut witness_found = false;
    for info in &set {
        let path = info.path.as_path();
        if members.contains_key(path) {
            continue;
        }
        if !contained_abs.is_empty() && !paths::contained_in_any(path, contained_abs) {
            continue;
        }
        // the hash recorded in the catalog is not trusted here: the file
        // must match the candidates' content right now
        match hasher::full_hash(path) {
            Ok(hash) if hash == group_hash => {}
            Ok(_) => continue,
            Err(err) => {
                debug!("cannot hash witness candidate '{}': {}", path.display(), err);
                continue;
            }
        }
        let checked = match paths::check_file(path, true, false, "verify") {
            Ok(checked) => checked,
            Err(_) => continue,
        };
        // be extra sure the witness is not a candidate under another name
        if members
            .values()
            .any(|meta| paths::same_file(meta, &checked.meta))
        {
            continue;
        }
        witness_found = true;
        break;
    }

    if !witness_found {
        if options.arbitrary && contained_abs.is_empty() {
            // promote one candidate to the witness role; it survives
            let keep = members.keys().next().expect("non-empty group").clone();
            members.remove(&keep);
            if members.is_empty() {
                return Ok(());
            }
        } else if single {
            let message = if contained_abs.is_empty() {
                format!("cannot remove '{}': no duplicates", display.display())
            } else {
                format!(
                    "cannot remove '{}': no duplicates in '{}'",
                    display.display(),
                    join_displays(&options.contained)
                )
            };
            report.errors.push(Error::user(message));
            return Ok(());
        } else {
            return Ok(());
        }
    }

    for path in members.keys() {
        let shown = match mode {
            Mode::Single => display.to_path_buf(),
            Mode::Recursive { abs_dir } => paths::rel_from(display, abs_dir, path),
        };
        if options.dry_run {
            report.removed.push(shown);
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                // not atomic with the unlink, but consistent within this
                // process; refresh reconciles after a crash
                tx.remove(path)?;
                report.removed.push(shown);
            }
            Err(err) => {
                if single {
                    report.errors.push(unlink_failure(display, &err));
                    return Ok(());
                }
                debug!("remove('{}') failed: {}", path.display(), err);
            }
        }
    }
    Ok(())
}

fn read_failure(display: &Path, err: &io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::PermissionDenied => Error::user(format!(
            "cannot remove '{}': permission denied",
            display.display()
        )),
        _ => Error::user(format!("cannot remove '{}': {}", display.display(), err)),
    }
}

fn unlink_failure(display: &Path, err: &io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::NotFound => {
            Error::user(format!("cannot remove '{}': no such file", display.display()))
        }
        io::ErrorKind::PermissionDenied => Error::user(format!(
            "cannot remove '{}': permission denied",
            display.display()
        )),
        _ => Error::user(format!("cannot remove '{}': {}", display.display(), err)),
    }
}

fn join_displays(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("', '")
}
