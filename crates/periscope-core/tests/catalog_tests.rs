use periscope_core::{Database, Error, FileInfo};
use std::path::{Path, PathBuf};

fn info(path: &str, size: i64, short: Option<&str>, full: Option<&str>) -> FileInfo {
    FileInfo {
        path: PathBuf::from(path),
        size,
        short_hash: short.map(|s| s.as_bytes().to_vec()),
        full_hash: full.map(|s| s.as_bytes().to_vec()),
    }
}

fn paths(set: &[FileInfo]) -> Vec<String> {
    set.iter().map(|i| i.path.display().to_string()).collect()
}

#[test]
fn test_add_and_lookup() {
    let db = Database::open_in_memory().unwrap();
    let catalog = db.catalog();
    catalog
        .add(&info("/a/x", 100, Some("s1"), Some("f1")))
        .unwrap();
    catalog
        .add(&info("/b/x", 100, Some("s1"), Some("f1")))
        .unwrap();
    catalog
        .add(&info("/c/x", 100, Some("s2"), Some("f2")))
        .unwrap();

    let set = catalog.lookup(Path::new("/b/x")).unwrap();
    // the queried file always comes first
    assert_eq!(paths(&set), vec!["/b/x", "/a/x"]);

    // a full hash with no siblings is still just a singleton
    let set = catalog.lookup(Path::new("/c/x")).unwrap();
    assert_eq!(paths(&set), vec!["/c/x"]);

    // unknown file
    let set = catalog.lookup(Path::new("/a/nope")).unwrap();
    assert!(set.is_empty());

    // unknown directory
    let set = catalog.lookup(Path::new("/nope/x")).unwrap();
    assert!(set.is_empty());
}

#[test]
fn test_lookup_without_full_hash_is_singleton() {
    let db = Database::open_in_memory().unwrap();
    let catalog = db.catalog();
    catalog.add(&info("/a/x", 100, Some("s1"), None)).unwrap();
    catalog.add(&info("/a/y", 100, Some("s1"), None)).unwrap();
    let set = catalog.lookup(Path::new("/a/x")).unwrap();
    assert_eq!(paths(&set), vec!["/a/x"]);
    assert!(set[0].full_hash.is_none());
    assert_eq!(set[0].short_hash.as_deref(), Some("s1".as_bytes()));
}

#[test]
fn test_add_upserts_by_directory_and_filename() {
    let db = Database::open_in_memory().unwrap();
    let catalog = db.catalog();
    catalog.add(&info("/a/x", 100, None, None)).unwrap();
    catalog
        .add(&info("/a/x", 250, Some("s"), Some("f")))
        .unwrap();
    assert!(catalog.infos_by_size(100).unwrap().is_empty());
    let found = catalog.infos_by_size(250).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].full_hash.as_deref(), Some("f".as_bytes()));
}

#[test]
fn test_infos_by_size_returns_any_hash_state() {
    let db = Database::open_in_memory().unwrap();
    let catalog = db.catalog();
    catalog.add(&info("/a/x", 100, None, None)).unwrap();
    catalog.add(&info("/a/y", 100, Some("s"), None)).unwrap();
    catalog
        .add(&info("/a/z", 100, Some("s"), Some("f")))
        .unwrap();
    catalog.add(&info("/a/w", 200, None, None)).unwrap();
    assert_eq!(catalog.infos_by_size(100).unwrap().len(), 3);
    assert_eq!(catalog.infos_by_size(200).unwrap().len(), 1);
    assert!(catalog.infos_by_size(300).unwrap().is_empty());
}

#[test]
fn test_remove_row() {
    let db = Database::open_in_memory().unwrap();
    let catalog = db.catalog();
    catalog
        .add(&info("/a/x", 100, Some("s"), Some("f")))
        .unwrap();
    catalog.remove(Path::new("/a/x")).unwrap();
    assert!(catalog.lookup(Path::new("/a/x")).unwrap().is_empty());
    // removing something unknown is not an error
    catalog.remove(Path::new("/a/x")).unwrap();
    catalog.remove(Path::new("/nope/x")).unwrap();
}

#[test]
fn test_remove_dir_matches_whole_directories_only() {
    let db = Database::open_in_memory().unwrap();
    let catalog = db.catalog();
    catalog.add(&info("/a/x", 100, None, None)).unwrap();
    catalog.add(&info("/a/sub/y", 100, None, None)).unwrap();
    catalog.add(&info("/aa/x", 100, None, None)).unwrap();
    catalog.remove_dir(Path::new("/a"), 0, 0).unwrap();
    let remaining = catalog.infos_by_size(100).unwrap();
    assert_eq!(paths(&remaining), vec!["/aa/x"]);
}

#[test]
fn test_remove_dir_size_window() {
    let db = Database::open_in_memory().unwrap();
    let catalog = db.catalog();
    catalog.add(&info("/d/small", 100, None, None)).unwrap();
    catalog.add(&info("/d/mid", 200, None, None)).unwrap();
    catalog.add(&info("/d/big", 300, None, None)).unwrap();
    // exclusive minimum, inclusive maximum
    catalog.remove_dir(Path::new("/d"), 100, 200).unwrap();
    assert_eq!(catalog.infos_by_size(100).unwrap().len(), 1);
    assert!(catalog.infos_by_size(200).unwrap().is_empty());
    assert_eq!(catalog.infos_by_size(300).unwrap().len(), 1);

    // a maximum of zero means infinity
    catalog.remove_dir(Path::new("/d"), 100, 0).unwrap();
    assert_eq!(catalog.infos_by_size(100).unwrap().len(), 1);
    assert!(catalog.infos_by_size(300).unwrap().is_empty());
}

#[test]
fn test_remove_dir_garbage_collects_directories() {
    let db = Database::open_in_memory().unwrap();
    let catalog = db.catalog();
    catalog.add(&info("/x/y/z/file", 10, None, None)).unwrap();
    catalog.remove_dir(Path::new("/x"), 0, 0).unwrap();
    let dirs: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM directory", [], |row| row.get(0))
        .unwrap();
    assert_eq!(dirs, 0);
}

#[test]
fn test_prune_orphan_directories() {
    let db = Database::open_in_memory().unwrap();
    let catalog = db.catalog();
    catalog.add(&info("/p/q/file", 10, None, None)).unwrap();
    // plain remove leaves the directory chain behind
    catalog.remove(Path::new("/p/q/file")).unwrap();
    let dirs: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM directory", [], |row| row.get(0))
        .unwrap();
    assert!(dirs > 0);
    catalog.prune_orphan_directories().unwrap();
    let dirs: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM directory", [], |row| row.get(0))
        .unwrap();
    assert_eq!(dirs, 0);
}

#[test]
fn test_all_duplicates_ordering_and_membership() {
    let db = Database::open_in_memory().unwrap();
    let catalog = db.catalog();
    catalog
        .add(&info("/small/b", 100, Some("s1"), Some("f1")))
        .unwrap();
    catalog
        .add(&info("/small/a", 100, Some("s1"), Some("f1")))
        .unwrap();
    catalog
        .add(&info("/large/a", 900, Some("s2"), Some("f2")))
        .unwrap();
    catalog
        .add(&info("/large/b", 900, Some("s2"), Some("f2")))
        .unwrap();
    // full hash known, but no partner: not a duplicate set
    catalog
        .add(&info("/alone", 500, Some("s3"), Some("f3")))
        .unwrap();
    // no full hash: never reported
    catalog.add(&info("/nohash", 900, None, None)).unwrap();

    let sets = catalog.all_duplicates(None).unwrap();
    assert_eq!(sets.len(), 2);
    // size descending across sets, path ascending within
    assert_eq!(paths(&sets[0]), vec!["/large/a", "/large/b"]);
    assert_eq!(paths(&sets[1]), vec!["/small/a", "/small/b"]);
}

#[test]
fn test_all_duplicates_prefix_filter() {
    let db = Database::open_in_memory().unwrap();
    let catalog = db.catalog();
    catalog
        .add(&info("/in/a", 100, Some("s1"), Some("f1")))
        .unwrap();
    catalog
        .add(&info("/out/a", 100, Some("s1"), Some("f1")))
        .unwrap();
    catalog
        .add(&info("/out/b", 200, Some("s2"), Some("f2")))
        .unwrap();
    catalog
        .add(&info("/out/c", 200, Some("s2"), Some("f2")))
        .unwrap();

    // a set qualifies if at least one member is under the prefix, and the
    // set is returned whole
    let sets = catalog.all_duplicates(Some(Path::new("/in"))).unwrap();
    assert_eq!(sets.len(), 1);
    assert_eq!(paths(&sets[0]), vec!["/in/a", "/out/a"]);

    let sets = catalog.all_duplicates(Some(Path::new("/nowhere"))).unwrap();
    assert!(sets.is_empty());
}

#[test]
fn test_lookup_all_hidden_filtering() {
    let db = Database::open_in_memory().unwrap();
    let catalog = db.catalog();
    for (inside, outside, hash) in [
        ("/r/ok", "/elsewhere/ok", "f1"),
        ("/r/.hidden", "/elsewhere/h", "f2"),
        ("/r/.d/inner", "/elsewhere/i", "f3"),
    ] {
        catalog
            .add(&info(inside, 100, Some("s"), Some(hash)))
            .unwrap();
        catalog
            .add(&info(outside, 100, Some("s"), Some(hash)))
            .unwrap();
    }

    let visible = catalog.lookup_all(Path::new("/r"), false).unwrap();
    let visible_paths: Vec<String> = visible
        .iter()
        .map(|d| d.path.display().to_string())
        .collect();
    assert_eq!(visible_paths, vec!["/r/ok"]);

    let all = catalog.lookup_all(Path::new("/r"), true).unwrap();
    let all_paths: Vec<String> = all.iter().map(|d| d.path.display().to_string()).collect();
    assert_eq!(all_paths, vec!["/r/.d/inner", "/r/.hidden", "/r/ok"]);
    for dup in &all {
        assert_eq!(dup.count, 2);
    }
}

#[test]
fn test_summary_arithmetic() {
    let db = Database::open_in_memory().unwrap();
    let catalog = db.catalog();
    catalog
        .add(&info("/a", 100, Some("s1"), Some("f1")))
        .unwrap();
    catalog
        .add(&info("/b", 100, Some("s1"), Some("f1")))
        .unwrap();
    catalog
        .add(&info("/c", 200, Some("s2"), Some("f2")))
        .unwrap();
    catalog
        .add(&info("/d", 200, Some("s2"), Some("f2")))
        .unwrap();
    catalog
        .add(&info("/e", 200, Some("s2"), Some("f2")))
        .unwrap();
    catalog.add(&info("/f", 300, None, None)).unwrap();

    let summary = catalog.summary().unwrap();
    assert_eq!(summary.files, 6);
    assert_eq!(summary.duplicate, 3);
    assert_eq!(summary.unique, 3);
    assert_eq!(summary.files, summary.unique + summary.duplicate);
    assert_eq!(summary.overhead, 100 + 2 * 200);
}

#[test]
fn test_summary_empty_catalog() {
    let db = Database::open_in_memory().unwrap();
    let summary = db.catalog().summary().unwrap();
    assert_eq!(summary.files, 0);
    assert_eq!(summary.unique, 0);
    assert_eq!(summary.duplicate, 0);
    assert_eq!(summary.overhead, 0);
}

#[test]
fn test_version_mismatch_fails_open() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("catalog.sqlite");
    {
        let db = Database::open(&path, true).unwrap();
        db.connection()
            .execute("UPDATE meta SET value = '999' WHERE key = 'version'", [])
            .unwrap();
    }
    match Database::open(&path, true) {
        Err(Error::Unlikely { short, .. }) => {
            assert!(short.contains("version mismatch"), "got: {short}");
            assert!(short.contains("999"), "got: {short}");
        }
        other => panic!("expected version mismatch, got {other:?}"),
    }
}

#[test]
fn test_reopen_with_matching_version() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("catalog.sqlite");
    {
        let db = Database::open(&path, true).unwrap();
        db.catalog()
            .add(&info("/a/x", 100, Some("s"), Some("f")))
            .unwrap();
    }
    let db = Database::open(&path, true).unwrap();
    assert_eq!(db.catalog().infos_by_size(100).unwrap().len(), 1);
}

#[test]
fn test_transaction_commit_and_rollback() {
    let mut db = Database::open_in_memory().unwrap();
    db.with_transaction(|tx| tx.add(&info("/a/x", 100, None, None)))
        .unwrap();
    assert_eq!(db.catalog().infos_by_size(100).unwrap().len(), 1);

    let result: Result<(), Error> = db.with_transaction(|tx| {
        tx.add(&info("/a/y", 100, None, None))?;
        Err(Error::internal("forced failure"))
    });
    assert!(result.is_err());
    // the failed transaction's write is gone
    assert_eq!(db.catalog().infos_by_size(100).unwrap().len(), 1);
}

#[test]
fn test_create_indexes_is_idempotent() {
    let db = Database::open_in_memory().unwrap();
    db.catalog().create_indexes().unwrap();
    db.catalog().create_indexes().unwrap();
}
