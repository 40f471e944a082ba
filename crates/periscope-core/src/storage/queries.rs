use super::models::{info_ordering, DuplicateInfo, DuplicateSet, FileInfo, InfoSummary};
use super::sqlite::Catalog;
use crate::error::{Error, Result};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

const SELECT_INFO_COLUMNS: &str = "directory, filename, size, short_hash, full_hash";

impl<'c> Catalog<'c> {
    // ── Directory tree ───────────────────────────────────────────

    /// Resolve a directory path to its node id, optionally creating
    /// missing nodes along the way. The root directory is a node named
    /// "/" with a null parent; two files are siblings iff their directory
    /// ids match.
    fn path_to_directory_id(&self, path: &Path, create: bool) -> Result<Option<i64>> {
        let elems = path_elems(path);
        if elems.is_empty() {
            return Err(Error::internal(format!(
                "cannot resolve directory for '{}'",
                path.display()
            )));
        }
        let mut id: Option<i64> = None;
        for name in &elems {
            let found: Option<i64> = match id {
                None => self
                    .conn
                    .query_row(
                        "SELECT id FROM directory WHERE name = ?1 AND parent IS NULL",
                        params![name],
                        |row| row.get(0),
                    )
                    .optional()?,
                Some(parent) => self
                    .conn
                    .query_row(
                        "SELECT id FROM directory WHERE name = ?1 AND parent = ?2",
                        params![name, parent],
                        |row| row.get(0),
                    )
                    .optional()?,
            };
            match found {
                Some(found) => id = Some(found),
                None if create => {
                    self.conn.execute(
                        "INSERT INTO directory (name, parent) VALUES (?1, ?2)",
                        params![name, id],
                    )?;
                    id = Some(self.conn.last_insert_rowid());
                }
                None => return Ok(None),
            }
        }
        Ok(id)
    }

    fn directory_path(&self, id: i64) -> Result<PathBuf> {
        let mut stmt = self.conn.prepare_cached(
            "WITH RECURSIVE sup_directory (id, name, parent, level) AS (
                 SELECT id, name, parent, 1 FROM directory WHERE id = ?1
                 UNION ALL
                 SELECT d.id, d.name, d.parent, level + 1
                 FROM directory d, sup_directory sd
                 WHERE d.id = sd.parent
             )
             SELECT name, (SELECT max(level) FROM sup_directory) - level AS distance
             FROM sup_directory
             ORDER BY distance",
        )?;
        let mut rows = stmt.query(params![id])?;
        let mut path = PathBuf::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            path.push(name);
        }
        Ok(path)
    }

    fn info_from_row(&self, cache: &mut HashMap<i64, PathBuf>, row: &Row<'_>) -> Result<FileInfo> {
        let dirid: i64 = row.get(0)?;
        let filename: String = row.get(1)?;
        let dir = match cache.get(&dirid) {
            Some(dir) => dir.clone(),
            None => {
                let dir = self.directory_path(dirid)?;
                cache.insert(dirid, dir.clone());
                dir
            }
        };
        Ok(FileInfo {
            path: dir.join(filename),
            size: row.get(2)?,
            short_hash: row.get(3)?,
            full_hash: row.get(4)?,
        })
    }

    // ── Mutation ─────────────────────────────────────────────────

    /// Upsert by (directory, filename), creating directory nodes on demand.
    pub fn add(&self, info: &FileInfo) -> Result<()> {
        let (dirname, filename) = split_path(&info.path)?;
        let dirid = self
            .path_to_directory_id(dirname, true)?
            .ok_or_else(|| Error::internal(format!("no directory node for '{}'", dirname.display())))?;
        self.conn.execute(
            "REPLACE INTO file_info (directory, filename, size, short_hash, full_hash)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![dirid, filename, info.size, info.short_hash, info.full_hash],
        )?;
        Ok(())
    }

    /// Delete the row for `path`, leaving directory nodes in place.
    pub fn remove(&self, path: &Path) -> Result<()> {
        let (dirname, filename) = split_path(path)?;
        let Some(dirid) = self.path_to_directory_id(dirname, false)? else {
            return Ok(());
        };
        self.conn.execute(
            "DELETE FROM file_info WHERE directory = ?1 AND filename = ?2",
            params![dirid, filename],
        )?;
        Ok(())
    }

    /// Delete every row under the directory `dir` (the prefix is matched as
    /// a whole directory, never as a string prefix, so `/a` cannot match
    /// `/aa/...`) with sizes in `(min, max]`, then garbage-collect
    /// unreachable directory nodes. A max of 0 means infinity.
    pub fn remove_dir(&self, dir: &Path, min: i64, max: i64) -> Result<()> {
        let max = if max <= 0 { i64::MAX } else { max };
        let Some(dirid) = self.path_to_directory_id(dir, false)? else {
            return Ok(());
        };
        if min == 0 && max == i64::MAX {
            self.conn.execute(
                "WITH dirs AS
                 (
                     WITH RECURSIVE sub_directory (id, parent) AS (
                         SELECT id, parent FROM directory WHERE id = ?1
                         UNION ALL
                         SELECT d.id, d.parent
                         FROM directory d, sub_directory sd
                         WHERE d.parent = sd.id
                     )
                     SELECT id FROM sub_directory
                 )
                 DELETE FROM file_info
                 WHERE directory IN dirs",
                params![dirid],
            )?;
        } else {
            self.conn.execute(
                "WITH dirs AS
                 (
                     WITH RECURSIVE sub_directory (id, parent) AS (
                         SELECT id, parent FROM directory WHERE id = ?1
                         UNION ALL
                         SELECT d.id, d.parent
                         FROM directory d, sub_directory sd
                         WHERE d.parent = sd.id
                     )
                     SELECT id FROM sub_directory
                 )
                 DELETE FROM file_info
                 WHERE directory IN dirs
                     AND size > ?2
                     AND size <= ?3",
                params![dirid, min, max],
            )?;
        }
        self.gc_directories()
    }

    /// Delete directory nodes no longer reachable from any file row.
    pub fn prune_orphan_directories(&self) -> Result<()> {
        self.gc_directories()
    }

    fn gc_directories(&self) -> Result<()> {
        self.conn.execute(
            "WITH reachable AS
             (
                 WITH RECURSIVE sub_directory (id, parent) AS (
                     SELECT id, parent FROM directory
                     WHERE id IN (SELECT DISTINCT directory FROM file_info)
                     UNION ALL
                     SELECT d.id, d.parent
                     FROM directory d, sub_directory sd
                     WHERE d.id = sd.parent
                 )
                 SELECT DISTINCT id
                 FROM sub_directory
             )
             DELETE FROM directory
             WHERE id NOT IN reachable",
            [],
        )?;
        Ok(())
    }

    /// Created lazily because bulk-insert performance degrades with the
    /// indexes present.
    pub fn create_indexes(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_hash ON file_info (full_hash);
             CREATE INDEX IF NOT EXISTS idx_size ON file_info (size);
             CREATE INDEX IF NOT EXISTS idx_directory_filename ON file_info (directory, filename);
             CREATE INDEX IF NOT EXISTS idx_name_parent ON directory (name, parent);
             CREATE INDEX IF NOT EXISTS idx_directory ON file_info (directory);
             CREATE INDEX IF NOT EXISTS idx_parent ON directory (parent);",
        )?;
        Ok(())
    }

    // ── Lookup ───────────────────────────────────────────────────

    /// The set containing `path` plus every other file sharing its full
    /// hash. Empty if the file is unknown; a singleton if the file has no
    /// full hash. The queried file is always first, the rest are in
    /// canonical order.
    pub fn lookup(&self, path: &Path) -> Result<DuplicateSet> {
        let (dirname, filename) = split_path(path)?;
        let Some(dirid) = self.path_to_directory_id(dirname, false)? else {
            return Ok(Vec::new());
        };
        let found: Option<(i64, i64, Option<Vec<u8>>, Option<Vec<u8>>)> = self
            .conn
            .query_row(
                "SELECT id, size, short_hash, full_hash
                 FROM file_info
                 WHERE directory = ?1 AND filename = ?2",
                params![dirid, filename],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        let Some((id, size, short_hash, full_hash)) = found else {
            return Ok(Vec::new());
        };
        let target = FileInfo {
            path: path.to_path_buf(),
            size,
            short_hash,
            full_hash: full_hash.clone(),
        };
        let Some(full_hash) = full_hash else {
            return Ok(vec![target]);
        };
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {SELECT_INFO_COLUMNS} FROM file_info WHERE full_hash = ?1 AND id != ?2"
        ))?;
        let mut rows = stmt.query(params![full_hash, id])?;
        let mut cache = HashMap::new();
        let mut others = Vec::new();
        while let Some(row) = rows.next()? {
            others.push(self.info_from_row(&mut cache, row)?);
        }
        others.sort_by(info_ordering);
        let mut set = vec![target];
        set.extend(others);
        Ok(set)
    }

    /// Every known info of the given size, in any hash state.
    pub fn infos_by_size(&self, size: i64) -> Result<Vec<FileInfo>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {SELECT_INFO_COLUMNS} FROM file_info WHERE size = ?1"
        ))?;
        let mut rows = stmt.query(params![size])?;
        let mut cache = HashMap::new();
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(self.info_from_row(&mut cache, row)?);
        }
        Ok(results)
    }

    /// Stream every info in the catalog, regardless of hash state. The
    /// cursor is closed when the call returns; the callback must not issue
    /// catalog writes.
    pub fn for_each_info(&self, mut f: impl FnMut(FileInfo) -> Result<()>) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SELECT_INFO_COLUMNS} FROM file_info"))?;
        let mut rows = stmt.query([])?;
        let mut cache = HashMap::new();
        while let Some(row) = rows.next()? {
            f(self.info_from_row(&mut cache, row)?)?;
        }
        Ok(())
    }

    pub fn all_infos(&self) -> Result<Vec<FileInfo>> {
        let mut results = Vec::new();
        self.for_each_info(|info| {
            results.push(info);
            Ok(())
        })?;
        results.sort_by(info_ordering);
        Ok(results)
    }

    // ── Duplicate sets ───────────────────────────────────────────

    /// Stream all known duplicate sets, ordered by size descending then
    /// full hash. Each set has at least two members with a non-null full
    /// hash; singleton rows that happen to know their full hash are not
    /// reported. With a prefix, only sets with at least one member under
    /// that directory are streamed.
    pub fn for_each_duplicate_set(
        &self,
        prefix: Option<&Path>,
        mut f: impl FnMut(DuplicateSet) -> Result<()>,
    ) -> Result<()> {
        let dirid = match prefix {
            None => None,
            Some(prefix) => match self.path_to_directory_id(prefix, false)? {
                Some(dirid) => Some(dirid),
                None => return Ok(()), // unknown directory, no sets
            },
        };
        let mut stmt;
        let mut rows = match dirid {
            None => {
                stmt = self.conn.prepare(&format!(
                    "SELECT {SELECT_INFO_COLUMNS}
                     FROM file_info
                     WHERE full_hash IS NOT NULL
                     ORDER BY size DESC, full_hash"
                ))?;
                stmt.query([])?
            }
            Some(dirid) => {
                stmt = self.conn.prepare(&format!(
                    "WITH dirs AS
                     (
                         WITH RECURSIVE sub_directory (id, parent) AS (
                             SELECT id, parent FROM directory WHERE id = ?1
                             UNION ALL
                             SELECT d.id, d.parent
                             FROM directory d, sub_directory sd
                             WHERE d.parent = sd.id
                         )
                         SELECT id FROM sub_directory
                     ),
                     matching_hashes AS
                     (
                         SELECT full_hash FROM file_info
                         WHERE directory IN dirs AND full_hash IS NOT NULL
                     )
                     SELECT {SELECT_INFO_COLUMNS}
                     FROM file_info
                     WHERE full_hash IN matching_hashes
                     ORDER BY size DESC, full_hash"
                ))?;
                stmt.query(params![dirid])?
            }
        };
        let mut cache = HashMap::new();
        let mut set: DuplicateSet = Vec::new();
        let mut prev_hash: Option<Vec<u8>> = None;
        while let Some(row) = rows.next()? {
            let info = self.info_from_row(&mut cache, row)?;
            if info.full_hash != prev_hash {
                if set.len() > 1 {
                    set.sort_by(info_ordering);
                    f(std::mem::take(&mut set))?;
                } else {
                    set.clear();
                }
            }
            prev_hash = info.full_hash.clone();
            set.push(info);
        }
        if set.len() > 1 {
            set.sort_by(info_ordering);
            f(set)?;
        }
        Ok(())
    }

    pub fn all_duplicates(&self, prefix: Option<&Path>) -> Result<Vec<DuplicateSet>> {
        let mut results = Vec::new();
        self.for_each_duplicate_set(prefix, |set| {
            results.push(set);
            Ok(())
        })?;
        Ok(results)
    }

    /// Stream one entry for every file under `prefix` that has at least one
    /// other file with the same full hash anywhere in the catalog. With
    /// `include_hidden` unset, files named with a leading dot and files
    /// below dot-directories are skipped.
    pub fn for_each_duplicate_under(
        &self,
        prefix: &Path,
        include_hidden: bool,
        mut f: impl FnMut(DuplicateInfo) -> Result<()>,
    ) -> Result<()> {
        let Some(dirid) = self.path_to_directory_id(prefix, false)? else {
            return Ok(());
        };
        let mut stmt = if include_hidden {
            self.conn.prepare(
                "WITH dirs AS
                 (
                     WITH RECURSIVE sub_directory (id, parent) AS (
                         SELECT id, parent FROM directory WHERE id = ?1
                         UNION ALL
                         SELECT d.id, d.parent
                         FROM directory d, sub_directory sd
                         WHERE d.parent = sd.id
                     )
                     SELECT id FROM sub_directory
                 )
                 SELECT a.directory, a.filename, a.full_hash, COUNT(b.id)
                 FROM file_info a, file_info b
                 WHERE a.full_hash IS NOT NULL
                     AND a.full_hash = b.full_hash
                     AND a.directory IN dirs
                 GROUP BY a.directory, a.filename",
            )?
        } else {
            self.conn.prepare(
                "WITH dirs AS
                 (
                     WITH RECURSIVE sub_directory (id, parent) AS (
                         SELECT id, parent FROM directory WHERE id = ?1
                         UNION ALL
                         SELECT d.id, d.parent
                         FROM directory d, sub_directory sd
                         WHERE d.parent = sd.id
                             AND SUBSTR(d.name, 1, 1) != '.'
                     )
                     SELECT id FROM sub_directory
                 )
                 SELECT a.directory, a.filename, a.full_hash, COUNT(b.id)
                 FROM file_info a, file_info b
                 WHERE a.full_hash IS NOT NULL
                     AND a.full_hash = b.full_hash
                     AND a.directory IN dirs
                     AND SUBSTR(a.filename, 1, 1) != '.'
                 GROUP BY a.directory, a.filename",
            )?
        };
        let mut rows = stmt.query(params![dirid])?;
        let mut cache: HashMap<i64, PathBuf> = HashMap::new();
        while let Some(row) = rows.next()? {
            let dirid: i64 = row.get(0)?;
            let filename: String = row.get(1)?;
            let full_hash: Vec<u8> = row.get(2)?;
            let count: i64 = row.get(3)?;
            if count <= 1 {
                continue;
            }
            let dir = match cache.get(&dirid) {
                Some(dir) => dir.clone(),
                None => {
                    let dir = self.directory_path(dirid)?;
                    cache.insert(dirid, dir.clone());
                    dir
                }
            };
            f(DuplicateInfo {
                path: dir.join(filename),
                full_hash,
                count,
            })?;
        }
        Ok(())
    }

    pub fn lookup_all(&self, prefix: &Path, include_hidden: bool) -> Result<Vec<DuplicateInfo>> {
        let mut results = Vec::new();
        self.for_each_duplicate_under(prefix, include_hidden, |info| {
            results.push(info);
            Ok(())
        })?;
        results.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(results)
    }

    // ── Summary ──────────────────────────────────────────────────

    pub fn summary(&self) -> Result<InfoSummary> {
        let files: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file_info", [], |row| row.get(0))?;
        let (sets, files_with_duplicates, overhead): (i64, Option<i64>, Option<i64>) =
            self.conn.query_row(
                "WITH sets AS
                 (
                     SELECT COUNT(*) AS cnt, size
                     FROM file_info
                     GROUP BY full_hash
                     HAVING COUNT(full_hash) > 1
                 )
                 SELECT COUNT(*), SUM(cnt), SUM((cnt - 1) * size) FROM sets",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
        let duplicate = files_with_duplicates.unwrap_or(0) - sets;
        Ok(InfoSummary {
            files,
            unique: files - duplicate,
            duplicate,
            overhead: overhead.unwrap_or(0),
        })
    }
}

/// Break an absolute file path into its directory and filename.
fn split_path(path: &Path) -> Result<(&Path, String)> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| Error::internal(format!("path has no directory: '{}'", path.display())))?;
    let filename = path
        .file_name()
        .ok_or_else(|| Error::internal(format!("path has no filename: '{}'", path.display())))?
        .to_string_lossy()
        .into_owned();
    Ok((parent, filename))
}

/// Directory path as a sequence of node names, root first. The filesystem
/// root is a node named "/".
fn path_elems(path: &Path) -> Vec<String> {
    let mut elems = Vec::new();
    for component in path.components() {
        match component {
            Component::RootDir => elems.push(String::from("/")),
            Component::Prefix(prefix) => {
                elems.push(prefix.as_os_str().to_string_lossy().into_owned())
            }
            Component::Normal(name) => elems.push(name.to_string_lossy().into_owned()),
            Component::CurDir | Component::ParentDir => {}
        }
    }
    elems
}
