//! SQLite-based store implementation

use bbtimer_host_api::Response;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{CacheStorage, KeyValueStore, StoreError, StoreResult};

/// SQLite-based store holding both settings and cache generations
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- User settings (string key-value)
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Cache generations, one row per version key
            CREATE TABLE IF NOT EXISTS cache_generations (
                key TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            -- Stored responses
            CREATE TABLE IF NOT EXISTS cache_entries (
                generation TEXT NOT NULL,
                request_key TEXT NOT NULL,
                status INTEGER NOT NULL,
                headers_json TEXT NOT NULL,
                body BLOB NOT NULL,
                PRIMARY KEY (generation, request_key)
            );

            CREATE INDEX IF NOT EXISTS idx_cache_entries_generation ON cache_entries(generation);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;

        let value: Option<String> = conn
            .query_row("SELECT value FROM settings WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO settings (key, value)
            VALUES (?, ?)
            ON CONFLICT(key)
            DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;

        debug!(key, value, "Setting stored");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

impl CacheStorage for SqliteStore {
    fn generation_keys(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare("SELECT key FROM cache_generations ORDER BY created_at, key")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    fn has_generation(&self, generation: &str) -> StoreResult<bool> {
        let conn = self.conn()?;

        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM cache_generations WHERE key = ?",
                [generation],
                |row| row.get(0),
            )
            .optional()?;

        Ok(found.is_some())
    }

    fn write_generation(&self, generation: &str, entries: &[(String, Response)]) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM cache_entries WHERE generation = ?", [generation])?;
        tx.execute(
            r#"
            INSERT INTO cache_generations (key, created_at)
            VALUES (?, ?)
            ON CONFLICT(key)
            DO UPDATE SET created_at = excluded.created_at
            "#,
            params![generation, chrono::Utc::now().to_rfc3339()],
        )?;

        {
            let mut insert = tx.prepare(
                r#"
                INSERT OR REPLACE INTO cache_entries
                    (generation, request_key, status, headers_json, body)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )?;

            for (request_key, response) in entries {
                let headers_json = serde_json::to_string(&response.headers)?;
                insert.execute(params![
                    generation,
                    request_key,
                    response.status,
                    headers_json,
                    response.body
                ])?;
            }
        }

        tx.commit()?;

        debug!(generation, entry_count = entries.len(), "Cache generation written");
        Ok(())
    }

    fn lookup(&self, generation: &str, request_key: &str) -> StoreResult<Option<Response>> {
        let conn = self.conn()?;

        let row: Option<(u16, String, Vec<u8>)> = conn
            .query_row(
                r#"
                SELECT status, headers_json, body FROM cache_entries
                WHERE generation = ? AND request_key = ?
                "#,
                params![generation, request_key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match row {
            Some((status, headers_json, body)) => {
                let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
                Ok(Some(Response {
                    status,
                    headers,
                    body,
                }))
            }
            None => Ok(None),
        }
    }

    fn entry_keys(&self, generation: &str) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT request_key FROM cache_entries WHERE generation = ? ORDER BY rowid",
        )?;
        let rows = stmt.query_map([generation], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    fn delete_generation(&self, generation: &str) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM cache_entries WHERE generation = ?", [generation])?;
        let removed = tx.execute("DELETE FROM cache_generations WHERE key = ?", [generation])?;
        tx.commit()?;

        debug!(generation, existed = removed > 0, "Cache generation deleted");
        Ok(removed > 0)
    }
}
