use crate::error::{Error, Result};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::debug;

const VERSION_KEY: &str = "version";
const VERSION: i64 = 3;

/// Handle to the catalog's backing SQLite database.
///
/// Reads in auto-commit mode go through [`Database::catalog`]; mutations
/// that must be atomic go through [`Database::with_transaction`]. The
/// catalog is single-writer: one handle per interactive operation.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path, debug_checks: bool) -> Result<Self> {
        let conn = Connection::open(path).map_err(|err| {
            Error::unlikely(
                format!("unable to access database at '{}' ({})", path.display(), err),
                "Ensure that the directory is writable, and if the database file \
                 already exists, ensure it is readable and writable.",
            )
        })?;
        Self::init(conn, debug_checks)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, true)
    }

    fn init(conn: Connection, debug_checks: bool) -> Result<Self> {
        // foreign key enforcement is a good sanity check but slows down the
        // directory gc in remove_dir considerably
        if debug_checks {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        } else {
            conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        }
        conn.execute_batch("PRAGMA cache_size = -500000;")?; // 500 MB
        let db = Database { conn };
        db.check_version()?;
        db.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("catalog schema ready (version {})", VERSION);
        Ok(db)
    }

    fn check_version(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS meta
             (
                 key   TEXT UNIQUE NOT NULL,
                 value BLOB NOT NULL
             )",
            [],
        )?;
        let stored: Option<Value> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                [VERSION_KEY],
                |row| row.get(0),
            )
            .optional()?;
        let stored = match stored {
            None => {
                self.conn.execute(
                    "INSERT INTO meta (key, value) VALUES (?1, ?2)",
                    params![VERSION_KEY, VERSION.to_string()],
                )?;
                return Ok(());
            }
            Some(Value::Text(text)) => text,
            Some(Value::Blob(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Some(Value::Integer(n)) => n.to_string(),
            Some(other) => format!("{other:?}"),
        };
        if stored.parse::<i64>() == Ok(VERSION) {
            return Ok(());
        }
        Err(Error::unlikely(
            format!("database version mismatch: expected {VERSION}, got {stored}"),
            "This database was likely produced by an incompatible version of \
             periscope. Either use a compatible version of periscope, or delete \
             the database (by running 'psc finish') and try again.",
        ))
    }

    /// Auto-commit view: each operation is an independent query.
    pub fn catalog(&self) -> Catalog<'_> {
        Catalog { conn: &self.conn }
    }

    /// Raw connection escape hatch, for tests and maintenance tooling.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` against a transaction-scoped catalog view. The transaction
    /// commits when `f` returns `Ok` and rolls back on `Err` or unwind.
    pub fn with_transaction<T>(&mut self, f: impl FnOnce(&Catalog<'_>) -> Result<T>) -> Result<T> {
        let tx = self.conn.transaction()?;
        let out = f(&Catalog { conn: &tx })?;
        tx.commit()?;
        Ok(out)
    }
}

/// A consistent view of the catalog: either the auto-commit view from
/// [`Database::catalog`] or the scoped transaction inside
/// [`Database::with_transaction`]. All query and mutation operations live
/// on this type (see `queries.rs`).
pub struct Catalog<'c> {
    pub(crate) conn: &'c Connection,
}
