//! SQLite-backed key-value files.
//!
//! A group file is an SQLite database with a single `entries` table mapping
//! key bytes to value bytes. Lookups open the file read-only; only the
//! maintenance side ([`GroupDatabase`]) ever writes to it.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use super::{BackendError, KeyEncoding, StoreBackend, StoreHandle};

pub const ENTRIES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    key   BLOB PRIMARY KEY NOT NULL,
    value BLOB NOT NULL
);
"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBackend {
    encoding: KeyEncoding,
}

impl SqliteBackend {
    pub fn new(encoding: KeyEncoding) -> Self {
        Self { encoding }
    }
}

impl StoreBackend for SqliteBackend {
    fn key_encoding(&self) -> KeyEncoding {
        self.encoding
    }

    fn open_read_only(&self, path: &Path) -> Result<Box<dyn StoreHandle>, BackendError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        // SQLite opens lazily, so query the schema to surface a wrong file
        // format at open time instead of on the first fetch.
        ensure_entries_table(&conn)?;
        debug!("Opened group file {} read-only", path.display());
        Ok(Box::new(SqliteHandle { conn }))
    }
}

struct SqliteHandle {
    conn: Connection,
}

impl StoreHandle for SqliteHandle {
    fn fetch(&self, key: &[u8]) -> Result<Option<Vec<u8>>, BackendError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }
}

fn ensure_entries_table(conn: &Connection) -> Result<(), BackendError> {
    let tables: i64 = conn.query_row(
        "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'entries'",
        [],
        |row| row.get(0),
    )?;
    if tables == 0 {
        return Err(BackendError::Format(
            "not a group file: table 'entries' is missing".to_string(),
        ));
    }
    Ok(())
}

/// Read-write access to a group file, used to maintain its entries.
pub struct GroupDatabase {
    conn: Connection,
    path: PathBuf,
    encoding: KeyEncoding,
}

impl GroupDatabase {
    /// Create the file if needed and make sure the schema exists.
    pub fn create(path: &Path, encoding: KeyEncoding) -> Result<Self, BackendError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(ENTRIES_SCHEMA)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            encoding,
        })
    }

    /// Open an existing group file for writing.
    pub fn open(path: &Path, encoding: KeyEncoding) -> Result<Self, BackendError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        ensure_entries_table(&conn)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            encoding,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace the value stored for `user`.
    pub fn set(&self, user: &str, value: &str) -> Result<(), BackendError> {
        self.conn.execute(
            "INSERT INTO entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![self.encoding.encode_key(user), value.as_bytes()],
        )?;
        Ok(())
    }

    pub fn get(&self, user: &str) -> Result<Option<String>, BackendError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM entries WHERE key = ?1",
                params![self.encoding.encode_key(user)],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value.map(|raw| super::value_to_string(&raw)))
    }

    /// Returns false if there was no entry for `user`.
    pub fn remove(&self, user: &str) -> Result<bool, BackendError> {
        let removed = self.conn.execute(
            "DELETE FROM entries WHERE key = ?1",
            params![self.encoding.encode_key(user)],
        )?;
        Ok(removed > 0)
    }

    /// All entries ordered by key.
    pub fn list(&self) -> Result<Vec<(String, String)>, BackendError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM entries ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (key, value) = row?;
            entries.push((
                self.encoding.decode_key(&key),
                super::value_to_string(&value),
            ));
        }
        Ok(entries)
    }
}
