//! SQLite cache backend.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{CacheBackend, CacheError, CacheResult, StoredEntry};

/// Cache table. Namespace and scope live in separate columns so that no
/// two (namespace, scope) pairs can share a row.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    namespace TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    payload TEXT NOT NULL,                        -- JSON
    digest TEXT NOT NULL,                         -- SHA-256 of payload, hex
    last_written TEXT NOT NULL,                   -- RFC 3339
    PRIMARY KEY (namespace, scope_key)
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_scope ON cache_entries(scope_key);
"#;

/// Cache stored in a SQLite database.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let conn = Connection::open(path)?;
        let backend = Self { conn };
        backend.initialize()?;
        Ok(backend)
    }

    /// Create in-memory database.
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        let backend = Self { conn };
        backend.initialize()?;
        Ok(backend)
    }

    fn initialize(&self) -> CacheResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl CacheBackend for SqliteBackend {
    fn read(&self, namespace: &str, scope: &str) -> CacheResult<Option<StoredEntry>> {
        self.conn
            .query_row(
                r#"
                SELECT namespace, scope_key, payload, digest, last_written
                FROM cache_entries
                WHERE namespace = ?1 AND scope_key = ?2
                "#,
                params![namespace, scope],
                |row| {
                    Ok(EntryRow {
                        namespace: row.get(0)?,
                        scope_key: row.get(1)?,
                        payload: row.get(2)?,
                        digest: row.get(3)?,
                        last_written: row.get(4)?,
                    })
                },
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    fn write(&self, entry: &StoredEntry) -> CacheResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO cache_entries (namespace, scope_key, payload, digest, last_written)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(namespace, scope_key) DO UPDATE SET
                payload = excluded.payload,
                digest = excluded.digest,
                last_written = excluded.last_written
            "#,
            params![
                entry.namespace,
                entry.scope,
                entry.payload,
                entry.digest,
                entry.last_written.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete(&self, namespace: &str, scope: &str) -> CacheResult<bool> {
        let rows = self.conn.execute(
            "DELETE FROM cache_entries WHERE namespace = ?1 AND scope_key = ?2",
            params![namespace, scope],
        )?;
        Ok(rows > 0)
    }

    fn delete_scope(&self, scope: &str) -> CacheResult<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM cache_entries WHERE scope_key = ?1", [scope])?;
        Ok(rows)
    }
}

/// Internal row type for reading from SQLite.
struct EntryRow {
    namespace: String,
    scope_key: String,
    payload: String,
    digest: String,
    last_written: String,
}

impl TryFrom<EntryRow> for StoredEntry {
    type Error = CacheError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let last_written = DateTime::parse_from_rfc3339(&row.last_written)
            .map_err(|e| CacheError::Corrupt {
                key: super::cache_key(&row.namespace, &row.scope_key),
                reason: format!("bad last_written: {}", e),
            })?
            .with_timezone(&Utc);

        Ok(StoredEntry {
            namespace: row.namespace,
            scope: row.scope_key,
            payload: row.payload,
            digest: row.digest,
            last_written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_initialized() {
        let backend = SqliteBackend::open_in_memory().unwrap();

        let tables: Vec<String> = backend
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"cache_entries".to_string()));
    }

    #[test]
    fn test_write_overwrites() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let mut entry = StoredEntry::new("cart", "alice", "[]".to_string());
        backend.write(&entry).unwrap();

        entry = StoredEntry::new("cart", "alice", "[1]".to_string());
        backend.write(&entry).unwrap();

        let count: i64 = backend
            .conn()
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(backend.read("cart", "alice").unwrap().unwrap().payload, "[1]");
    }

    #[test]
    fn test_delete_scope() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.write(&StoredEntry::new("cart", "alice", "[]".into())).unwrap();
        backend.write(&StoredEntry::new("chat", "alice", "[]".into())).unwrap();
        backend.write(&StoredEntry::new("chat", "bob", "[]".into())).unwrap();

        assert_eq!(backend.delete_scope("alice").unwrap(), 2);
        assert!(backend.read("chat", "bob").unwrap().is_some());
    }
}
